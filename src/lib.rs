pub mod app;
pub mod assistant;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod history;
pub mod logging;
pub mod playback;
pub mod recording;
pub mod setup;
pub mod ui;
