//! Typed arena handles.

use std::fmt;

macro_rules! handle {
    ($name:ident, $prefix:literal) => {
        /// Arena handle. Handles are allocated from 1 and never reused, so a
        /// handle outlives the node it names without aliasing a newer one.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn get(self) -> u32 {
                self.0
            }

            pub(crate) fn slot(self) -> Option<usize> {
                (self.0 as usize).checked_sub(1)
            }

            pub(crate) fn from_slot(slot: usize) -> Self {
                Self(slot as u32 + 1)
            }

            /// Read back the text form written by `Display`.
            pub fn parse(s: &str) -> Option<Self> {
                s.strip_prefix(concat!($prefix, "-"))?
                    .parse()
                    .ok()
                    .filter(|&n| n > 0)
                    .map(Self)
            }
        }

        // The hyphen keeps handle text disjoint from normalized names.
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

handle!(SchemaId, "sch");
handle!(EntityId, "ent");
handle!(AttrId, "attr");
