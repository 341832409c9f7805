//! Benchmark repositories
//!
//! This crate provides implementations of the `BenchmarkRepository` trait:
//!
//! - [`MemoryRepository`] for tests and one-shot runs
//! - [`JsonFileRepository`] persisting the same store as a JSON snapshot

#![warn(missing_docs)]
#![warn(clippy::all)]

mod file;
mod memory;

#[cfg(test)]
mod test_util;

pub use file::JsonFileRepository;
pub use memory::MemoryRepository;
