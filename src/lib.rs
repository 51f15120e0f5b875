pub mod cli;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod settings;
pub mod state;
pub mod ui;
