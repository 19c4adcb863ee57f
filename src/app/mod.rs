pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod hdc;
pub mod launch;
pub mod logging;
pub mod models;
pub mod state;
