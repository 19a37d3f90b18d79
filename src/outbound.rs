pub mod docker;
pub mod runtime_memory;
