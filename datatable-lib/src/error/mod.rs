//! Error types

mod source;
mod validation;

pub use source::*;
pub use validation::*;
