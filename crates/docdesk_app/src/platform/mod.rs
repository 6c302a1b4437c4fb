//! Text-mode shell around the docdesk state machine.
mod app;
mod config;
mod effects;
mod input;
mod logging;
mod persistence;
mod render;

pub use app::run_app;
