pub mod browse;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod export;
pub mod render;
pub mod scanner;
pub mod session;
