//! Output model: raw elements and the parse result that carries them.
//!
//! The model is flat. Every element knows its page and its
//! position, and carries no references into the PDF object graph, so a
//! result can be serialized, sent across threads or compared freely.

mod element;
mod result;

pub use element::{
    BoundingBox, ElementKind, ImageFormat, ImageMetadata, RawElement, TableGrid, TableMetadata,
    TextMetadata,
};
pub use result::{DocumentMetadata, ElementCounts, ParseResult};
