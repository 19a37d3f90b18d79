pub mod containers;
pub mod services;
