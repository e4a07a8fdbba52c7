// Expose modules for the binary and integration tests
pub mod config;
pub mod error;
pub mod interpreter;
pub mod launcher;
pub mod library_paths;
