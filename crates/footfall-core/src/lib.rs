pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod store;
pub mod visit;
pub mod window;
