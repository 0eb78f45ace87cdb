pub mod config;
pub mod engine;
pub mod models;
pub mod notify;
pub mod presence;
pub mod process;
pub mod store;
pub mod surface;
