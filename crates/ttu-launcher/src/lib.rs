//! Command-line shell for the Toontown in Unity launcher.

pub mod cli;
pub mod commands;
pub mod console;
pub mod logging;
pub mod summary;
