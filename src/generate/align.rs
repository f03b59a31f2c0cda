//! Column alignment for generated source, measured in display width.

use unicode_width::UnicodeWidthStr;

pub fn text_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Rows of cells padded so that every column starts at the same display
/// column. The last cell of a row is never padded.
pub struct Columns {
    rows: Vec<Vec<String>>,
    gap: usize,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            gap: 1,
        }
    }
}

impl Columns {
    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest cell of each column, ignoring each row's last cell.
    pub fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = Vec::new();
        for row in &self.rows {
            let padded = row.len().saturating_sub(1);
            for (i, cell) in row.iter().take(padded).enumerate() {
                let width = text_width(cell);
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(width),
                    None => widths.push(width),
                }
            }
        }
        widths
    }

    pub fn render(&self) -> Vec<String> {
        let widths = self.widths();
        self.rows
            .iter()
            .map(|row| {
                let mut line = String::new();
                let last = row.len().saturating_sub(1);
                for (i, cell) in row.iter().enumerate() {
                    line.push_str(cell);
                    if i < last {
                        let pad = widths[i] - text_width(cell) + self.gap;
                        line.extend(std::iter::repeat_n(' ', pad));
                    }
                }
                line
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_ascii_width() {
        assert_eq!(text_width("User"), 4);
    }

    #[test]
    fn test_unicode_width() {
        // 全角文字は幅2
        assert_eq!(text_width("ユーザー"), 8);
        assert_eq!(text_width("Userテスト"), 10);
    }

    #[test]
    fn test_render_aligns_columns() {
        let mut columns = Columns::default();
        columns.push(row(&["ID", "int", "`json:\"id\"`"]));
        columns.push(row(&["Name", "*string", "`json:\"name\"`"]));
        assert_eq!(
            columns.render(),
            vec![
                "ID   int     `json:\"id\"`".to_string(),
                "Name *string `json:\"name\"`".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_wide_cells() {
        let mut columns = Columns::default();
        columns.push(row(&["名前", "x"]));
        columns.push(row(&["id", "y"]));
        assert_eq!(columns.render(), vec!["名前 x", "id   y"]);
    }
}
