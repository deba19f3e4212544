//! `provision completions <shell>`: print a completion script to stdout.

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::args::{Cli, CompletionsArgs};
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Name the scripts complete, independent of how the binary was invoked.
const BIN_NAME: &str = "provision";

pub struct CompletionsCommand {
    args: CompletionsArgs,
}

impl CompletionsCommand {
    pub fn new(args: CompletionsArgs) -> Self {
        Self { args }
    }

    /// Write the script for the requested shell to `out`.
    pub fn render(&self, out: &mut dyn Write) -> Result<()> {
        script(self.args.shell, out)
    }
}

impl Command for CompletionsCommand {
    fn execute(&self, _ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.render(&mut lock)?;
        Ok(CommandResult::success())
    }
}

fn script(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, &mut buf);
    out.write_all(&buf)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(shell: Shell) -> String {
        let mut out = Vec::new();
        CompletionsCommand::new(CompletionsArgs { shell })
            .render(&mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn bash_script_offers_run_flags() {
        let script = rendered(Shell::Bash);
        assert!(script.contains("provision"));
        assert!(script.contains("--report"));
        assert!(script.contains("--non-interactive"));
    }

    #[test]
    fn plan_platform_values_are_completed() {
        let script = rendered(Shell::Bash);
        assert!(script.contains("linux"));
        assert!(script.contains("windows"));
    }

    #[test]
    fn every_shell_renders_subcommands() {
        for shell in [Shell::Zsh, Shell::Fish, Shell::PowerShell] {
            let script = rendered(shell);
            assert!(script.contains("validate"), "{shell} script lacks validate");
        }
    }
}
