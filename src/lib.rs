pub mod app;
pub mod bot;
pub mod config;
pub mod questions;
pub mod scheduler;
pub mod telegram;
pub mod version;
