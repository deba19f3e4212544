//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations. This allows:
//! - Single binary with subcommands (`provision run`, `provision plan`)
//! - Shared config loading and secret prompting
//! - Consistent exit codes (0 ok, 1 step failed, 2 bad config, 130 cancelled)

pub mod completions;
pub mod dispatcher;
pub mod load;
pub mod plan;
pub mod run;
pub mod schema;
pub mod validate;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
pub use load::EXIT_CONFIG;
