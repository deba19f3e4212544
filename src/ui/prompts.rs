//! Interactive prompts.

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};

use crate::error::{ProvisionError, Result};

use super::{Prompt, PromptResult, PromptType};

fn map_dialoguer_err(e: dialoguer::Error) -> ProvisionError {
    ProvisionError::IoRaw(e.into())
}

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

/// Prompt the user on `term`.
pub fn prompt_user(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    match &prompt.prompt_type {
        PromptType::Confirm => prompt_confirm(prompt, term),
        PromptType::Input => prompt_input(prompt, term),
        PromptType::Password { confirm } => prompt_password(prompt, *confirm, term),
    }
}

fn prompt_confirm(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    let default = prompt
        .default
        .as_deref()
        .map(parse_yes)
        .unwrap_or(false);

    let result = Confirm::with_theme(&prompt_theme())
        .with_prompt(&prompt.question)
        .default(default)
        .interact_on(term)
        .map_err(map_dialoguer_err)?;

    Ok(PromptResult::Bool(result))
}

fn prompt_input(prompt: &Prompt, term: &Term) -> Result<PromptResult> {
    let theme = prompt_theme();
    let input = Input::<String>::with_theme(&theme).with_prompt(&prompt.question);

    let result = match &prompt.default {
        Some(default) => input.default(default.clone()).interact_on(term),
        None => input.interact_on(term),
    }
    .map_err(map_dialoguer_err)?;

    Ok(PromptResult::String(result))
}

fn prompt_password(prompt: &Prompt, confirm: bool, term: &Term) -> Result<PromptResult> {
    let theme = prompt_theme();
    let mut password = Password::with_theme(&theme).with_prompt(&prompt.question);
    if confirm {
        password = password.with_confirmation("Repeat", "Entries do not match");
    }
    let result = password.interact_on(term).map_err(map_dialoguer_err)?;
    Ok(PromptResult::String(result))
}

/// Interpret a yes/no answer.
pub(crate) fn parse_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "true" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_answers() {
        for answer in ["y", "YES", " true ", "1"] {
            assert!(parse_yes(answer), "{answer}");
        }
        for answer in ["n", "no", "false", ""] {
            assert!(!parse_yes(answer), "{answer}");
        }
    }
}
