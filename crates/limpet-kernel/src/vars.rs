//! Variable storage and `$name` substitution.

use std::collections::HashMap;

use crate::parser::ParseError;

/// Session variables: a name → value map with last-write-wins updates.
///
/// Lives for the whole interactive session; entries are never removed.
#[derive(Debug, Default)]
pub struct VarStore {
    vars: HashMap<String, String>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// All variables; iteration order is unspecified.
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expand `$name` tokens, returning a new vector.
    ///
    /// A token substitutes only when it begins with `$` and the whole
    /// remainder names a defined variable; anything else — an undefined
    /// name included — passes through as the literal token. The
    /// substituted value becomes exactly one token and is never
    /// re-expanded.
    pub fn expand(&self, tokens: &[String]) -> Vec<String> {
        tokens.iter().map(|token| self.expand_word(token)).collect()
    }

    pub(crate) fn expand_word(&self, token: &str) -> String {
        match token.strip_prefix('$') {
            Some(name) if !name.is_empty() => match self.get(name) {
                Some(value) => value.to_owned(),
                None => token.to_owned(),
            },
            _ => token.to_owned(),
        }
    }
}

/// Split a `name=value` assignment, validating the name.
///
/// The value is everything after the first `=` and may be empty.
pub fn parse_assignment(assignment: &str) -> Result<(&str, &str), ParseError> {
    let Some((name, value)) = assignment.split_once('=') else {
        return Err(ParseError::InvalidAssignment(assignment.to_owned()));
    };
    if !is_valid_name(name) {
        return Err(ParseError::InvalidAssignment(name.to_owned()));
    }
    Ok((name, value))
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
