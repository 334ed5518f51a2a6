//! Numeric building blocks: sound intervals and the column-major buffer
//! expressions are evaluated into.

mod interval;
mod matrix;

pub use interval::Interval;
pub use matrix::Matrix;
