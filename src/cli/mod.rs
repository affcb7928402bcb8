//! CLI command handling

pub mod config;
pub mod host;
pub mod output;
pub mod run;
pub mod send;

pub use config::*;
pub use output::*;
pub use run::*;
pub use send::*;
