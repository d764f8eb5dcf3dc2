//! Protocol module for laser-motion.
//!
//! Decodes the host's integer command stream into planner requests and
//! stages bitmap uploads.

mod bitmap;
mod decoder;
mod opcode;

pub use bitmap::{BitmapBuffer, DEFAULT_BITMAP_WORDS};
pub use decoder::{ActionRequest, Decoded, Decoder};
pub use opcode::{Opcode, Parameter};
