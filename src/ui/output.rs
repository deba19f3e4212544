//! How much of a provisioning run is shown.

/// Verbosity chosen with `--verbose` / `--quiet`.
///
/// Errors, warnings, step outcomes and the final report appear in every
/// mode. The modes differ in the narration around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Also echo installer and assistant output under the running step.
    Verbose,
    #[default]
    Normal,
    /// Step outcomes and the report only.
    Quiet,
}

impl OutputMode {
    /// `--verbose` wins when both flags are given.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    /// Whether external program output is echoed.
    pub fn echoes_program_output(self) -> bool {
        self == Self::Verbose
    }

    /// Whether the `[n/m]` step counter is shown.
    pub fn counts_steps(self) -> bool {
        self != Self::Quiet
    }

    /// Whether headers and informational messages are shown.
    pub fn narrates(self) -> bool {
        self != Self::Quiet
    }
}
