pub mod alignment;
pub mod cli;
pub mod completion;
pub mod config;
pub mod logging;
