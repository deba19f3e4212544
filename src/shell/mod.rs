//! External process execution and host inspection.

pub mod command;
pub mod host;

pub use command::{
    execute, execute_check, execute_quiet, CommandOptions, CommandResult, Invocation, OutputLine,
};
pub use host::{current_user, is_ci, is_elevated};
