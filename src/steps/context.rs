//! What a step can see while it runs.

use crate::config::InstallConfig;
use crate::platform::PlatformAdapter;
use crate::runner::CancellationToken;
use crate::secrets::OutputMasker;
use crate::shell::OutputLine;

/// Shared, read-only context handed to every step's `check` and `apply`.
pub struct StepContext<'a> {
    pub config: &'a InstallConfig,
    pub platform: &'a dyn PlatformAdapter,
    pub cancel: CancellationToken,
    pub masker: OutputMasker,
    output: Option<&'a dyn Fn(&OutputLine)>,
}

impl<'a> StepContext<'a> {
    /// Context with a fresh cancellation token and a masker for `config`'s secrets.
    pub fn new(config: &'a InstallConfig, platform: &'a dyn PlatformAdapter) -> Self {
        Self {
            config,
            platform,
            cancel: CancellationToken::new(),
            masker: OutputMasker::from_config(config),
            output: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Forward process output lines to `sink`.
    pub fn with_output(mut self, sink: &'a dyn Fn(&OutputLine)) -> Self {
        self.output = Some(sink);
        self
    }

    /// Emit one line of process output, masked.
    pub fn emit(&self, line: &OutputLine) {
        let masked = match line {
            OutputLine::Stdout(text) => OutputLine::Stdout(self.masker.mask(text)),
            OutputLine::Stderr(text) => OutputLine::Stderr(self.masker.mask(text)),
        };
        tracing::debug!("{}", masked.text());
        if let Some(sink) = self.output {
            sink(&masked);
        }
    }
}

impl std::fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("platform", &self.platform.kind())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
