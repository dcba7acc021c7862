pub mod app;
pub mod config;
pub mod error;
pub mod ingest;
pub mod routes;
pub mod state;
