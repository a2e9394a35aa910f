//! Core module
//!
//! # Contents
//!
//! - [`Config`] - runtime configuration from the environment
//! - [`ServerState`] - shared handle to the database and services
//! - [`BackgroundTasks`] - background task registry and shutdown

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::ServerState;
pub use tasks::BackgroundTasks;
