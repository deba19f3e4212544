//! Placeholder substitution for generated configuration files.
//!
//! Templates use `${name}` placeholders.
//!
//! # Syntax
//!
//! - `${name}` - replaced with the bound value
//! - `$${escaped}` - produces literal `${escaped}` in output
//! - a lone `$` not followed by `{` is literal
//!
//! Rendering is all-or-nothing: an unterminated or empty placeholder, or a
//! placeholder without a binding, is a template error and nothing is
//! produced.
//!
//! # Example
//!
//! ```
//! use provision::config::render;
//! use std::collections::BTreeMap;
//!
//! let mut bindings = BTreeMap::new();
//! bindings.insert("sid".to_string(), "ORCL".to_string());
//! let text = render("oracle.install.db.SID=${sid}", &bindings).unwrap();
//! assert_eq!(text, "oracle.install.db.SID=ORCL");
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ProvisionError, Result};

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Placeholder reference: ${name}
    Placeholder(String),
}

/// Parse a template into literal and placeholder segments.
///
/// # Errors
///
/// Returns a template error for `${` without a closing brace and for empty
/// placeholders (`${}`).
pub fn parse_template(input: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut chars = input.chars().peekable();
    let mut current_literal = String::new();

    while let Some(c) = chars.next() {
        if c != '$' {
            current_literal.push(c);
            continue;
        }

        match chars.peek() {
            Some('$') => {
                chars.next();
                if chars.peek() == Some(&'{') {
                    // $${...} -> literal ${...}
                    chars.next();
                    current_literal.push_str("${");
                    for c in chars.by_ref() {
                        current_literal.push(c);
                        if c == '}' {
                            break;
                        }
                    }
                } else {
                    current_literal.push('$');
                }
            }
            Some('{') => {
                chars.next();

                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }

                if !closed {
                    return Err(ProvisionError::template(format!(
                        "unterminated placeholder '${{{}'",
                        name
                    )));
                }
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(ProvisionError::template("empty placeholder '${}'"));
                }

                if !current_literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
            _ => current_literal.push(c),
        }
    }

    if !current_literal.is_empty() {
        segments.push(Segment::Literal(current_literal));
    }

    Ok(segments)
}

/// Unique placeholder names referenced by a template.
pub fn placeholders(input: &str) -> Result<BTreeSet<String>> {
    Ok(parse_template(input)?
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Placeholder(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Render a template against a set of bindings.
///
/// # Errors
///
/// Returns a template error listing every placeholder without a binding.
pub fn render(input: &str, bindings: &BTreeMap<String, String>) -> Result<String> {
    let segments = parse_template(input)?;

    let missing: BTreeSet<&str> = segments
        .iter()
        .filter_map(|seg| match seg {
            Segment::Placeholder(name) if !bindings.contains_key(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();
    if !missing.is_empty() {
        let names: Vec<_> = missing.into_iter().collect();
        return Err(ProvisionError::template(format!(
            "unresolved placeholder(s): {}",
            names.join(", ")
        )));
    }

    let mut result = String::with_capacity(input.len());
    for segment in segments {
        match segment {
            Segment::Literal(text) => result.push_str(&text),
            Segment::Placeholder(name) => result.push_str(&bindings[&name]),
        }
    }

    Ok(result)
}
