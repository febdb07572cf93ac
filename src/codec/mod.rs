//! # codec
//!
//! Encoding and decoding engine: bit layouts, value conversion, the multiplex codec
//! tree of a message and container message framing.

pub mod container;
pub mod conversion;
pub(crate) mod layout;
pub(crate) mod multiplex;
