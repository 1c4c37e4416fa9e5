//! Public types for the Munin API.

mod generate;
mod statement;

pub use generate::GenerateOptions;
pub use statement::{
    MAX_STATEMENT_CHARS, PointCount, Statement, contains_corruption_marker, is_well_formed,
};
