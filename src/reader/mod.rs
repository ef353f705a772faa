//! XML Reader Module
//!
//! Pull reader that turns XML text into events. The tree builder in
//! [`crate::dom::builder`] consumes these events; nothing in the query engine
//! depends on the text syntax.
//! - SliceReader: zero-copy reader over a `&str`
//! - Events: XML event types for pull parsing

pub mod events;
pub mod slice;

pub use events::{StartElement, XmlEvent};
pub use slice::SliceReader;
