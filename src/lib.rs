#![doc = include_str!("../README.md")]

pub mod allocator;
pub mod distance;
mod error;
mod index;
pub mod indices;
pub mod kdtree;
pub mod linear;
pub mod matrix;
pub mod params;
pub mod result_set;
pub mod threadpool;
mod r#trait;
mod r#type;

pub use distance::{Distance, L1, L2};
pub use error::{Result, TreeIndexError};
pub use index::Index;
pub use kdtree::KDTreeIndex;
pub use linear::LinearIndex;
pub use matrix::{Matrix, MatrixRef};
pub use params::{IndexParams, KDTreeParams, SearchParams};
pub use r#trait::NNIndex;
pub use r#type::IndexableNum;
pub use result_set::{Neighbor, ResultSet};
pub use threadpool::ThreadPool;

#[cfg(test)]
pub(crate) mod test;
