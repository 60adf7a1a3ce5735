pub mod commands;
pub mod config;
pub mod display;
pub mod export;
pub mod protocol;
pub mod session;
