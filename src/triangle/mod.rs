//! Loss-triangle data model
//!
//! A loss triangle is a ragged table of cumulative claim amounts by accident
//! period (rows, oldest first) and development period (columns). Row i may
//! hold at most `max_row_len - i` entries, values are finite, non-negative,
//! and non-decreasing within a row (payments accumulate).
//!
//! Triangles are validated at construction and immutable thereafter; derived
//! triangles (e.g. completed triangles) are always new value structures.

mod data;
mod factors;
mod loader;

pub use data::{Triangle, TriangleStatistics};
pub use factors::{FactorMethod, development_factors, complete_triangle};
pub use loader::{load_triangle, load_triangle_from_reader};
