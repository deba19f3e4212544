//! Step execution orchestration.

pub mod cancel;
pub mod report;
pub mod workflow;

pub use cancel::CancellationToken;
pub use report::{RunOutcome, RunReport};
pub use workflow::{Preview, RunProgress, Runner};
