//! The item data model shared by every node.
//!
//! An [`Item`] is one record flowing through a node: a JSON object, optional
//! named binary attachments, and provenance linking it back to the input
//! index (or indices) it came from.

mod binary;
pub mod compare;
pub mod field_path;
#[allow(clippy::module_inception)]
mod item;

pub use binary::BinaryData;
pub use item::{Item, PairedItem};
