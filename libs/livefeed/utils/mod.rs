//! Process-level helpers

pub mod shutdown;

pub use shutdown::ShutdownManager;
