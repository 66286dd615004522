//! A single k-d tree over a borrowed point set, with incremental removal.

#![warn(missing_docs)]

mod builder;
mod index;
mod r#trait;
mod traversal;

pub use index::KDTreeIndex;
pub use traversal::Node;
