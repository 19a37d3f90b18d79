pub mod inspector;
pub mod logs;
pub mod models;
pub mod port;
pub mod service;
