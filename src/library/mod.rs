//! Content-addressed image library: scanning, indexing and archiving.

pub mod archiver;
pub mod config;
pub mod digest;
pub mod index;
pub mod metadata;
pub mod progress;
pub mod scanner;
pub mod warn;
