//! Text processing for generated output.
//!
//! - [`extract`] pulls candidate statements out of a block of generated text
//! - [`clean`] normalizes one candidate into a [`Statement`](crate::Statement)

pub mod clean;
pub mod extract;

pub use clean::{clean, clean_single};
pub use extract::{extract, starts_with_number_marker};
