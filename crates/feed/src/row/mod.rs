//! Fixed-width rows of equal-height thumbnails.

mod assembler;
pub mod error;
mod layout;

pub use self::assembler::{Row, RowAssembler, RowState};
pub use self::layout::{RowLayout, layout};
