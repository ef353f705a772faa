//! Core XML text primitives
//!
//! The building blocks the reader and printer share:
//! - Scanner: memchr-accelerated delimiter detection
//! - Entities: entity decoding with Cow (zero-copy when possible) and escaping
//! - Attributes: attribute parsing from raw tag content

pub mod attributes;
pub mod entities;
pub mod scanner;
