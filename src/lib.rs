// Library surface for the binary, headless runs and integration tests.
pub mod app;
pub mod app_dirs;
pub mod backend;
pub mod config;
pub mod history;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod mistakes;
pub mod record;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod timer;
pub mod ui;

/// Redraw / event poll interval of the terminal loop
pub const TICK_RATE_MS: u64 = 100;
