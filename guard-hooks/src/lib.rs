pub mod atomic_io;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod runner;
