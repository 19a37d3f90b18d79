pub mod descriptor;
pub mod health;
