pub mod broadcaster;
pub mod server;
