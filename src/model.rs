//! In-memory model of a parsed document.

pub mod attribute;
pub mod document;
pub mod flatten;
pub mod handle;
pub mod kind;
mod resolve;

pub use attribute::{AttrError, AttributeRaw, Validation};
pub use document::{Document, EditError, Entity, Schema};
pub use flatten::{Attribute, MAX_DEPTH};
pub use handle::{AttrId, EntityId, SchemaId};
pub use kind::AttrKind;
