//! Store module
//!
//! Implementations of the persistence gateway:
//! - `memory` - Transactional in-process store

pub mod memory;

pub use memory::MemoryGateway;
