pub mod models;
pub mod probes;
pub mod service;
