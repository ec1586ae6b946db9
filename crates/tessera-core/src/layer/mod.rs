//! Layers built on the transactional store boundary.

pub mod allocator;
pub mod directory;
