pub mod models;
pub mod permissions;
pub mod settings;
