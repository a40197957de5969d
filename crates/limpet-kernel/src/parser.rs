//! Parser for limpet command lines.
//!
//! Turns the token stream into a [`Pipeline`]: stages split on `|`, a
//! trailing `&` lifted into the background flag, and redirection
//! operators resolved per stage. One structured pass over the tokens —
//! nothing is re-joined or re-split.

use thiserror::Error;

use crate::ast::{Pipeline, Redirect, Stage};
use crate::lexer::{self, Spanned, Token};

/// Syntax errors. Each one discards the offending line before anything
/// is spawned; the interactive loop carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `cmd |`, `| cmd`, or a stage left empty once its redirections
    /// were removed.
    #[error("empty pipeline stage")]
    EmptyStage,

    /// A redirection operator with no filename after it.
    #[error("missing target after '{0}'")]
    MissingRedirectTarget(&'static str),

    /// `&` anywhere but the very end of the line.
    #[error("'&' is only valid at the end of a command")]
    StrayBackground,

    /// `name=value` with a malformed name.
    #[error("invalid variable name in assignment: '{0}'")]
    InvalidAssignment(String),
}

/// Parse one command line into a [`Pipeline`].
///
/// Returns `Ok(None)` for a blank line. Variable expansion is the
/// caller's business and must already have happened (see
/// [`crate::vars::VarStore::expand`]); this parser only sees structure.
pub fn parse(line: &str) -> Result<Option<Pipeline>, ParseError> {
    parse_tokens(line, lexer::tokenize(line))
}

/// Parse a pre-lexed (and possibly variable-expanded) token stream.
///
/// `line` must be the text the tokens were lexed from; it supplies the
/// job-display text and the span offsets.
pub fn parse_tokens(
    line: &str,
    mut tokens: Vec<Spanned<Token>>,
) -> Result<Option<Pipeline>, ParseError> {
    if tokens.is_empty() {
        return Ok(None);
    }

    // A single trailing `&` marks the pipeline as background; any other
    // placement is rejected.
    let mut background = false;
    let mut text = line.trim();
    if let Some(last) = tokens.last()
        && last.token == Token::Ampersand
    {
        background = true;
        text = line[..last.span.start].trim();
        tokens.pop();
    }
    if tokens.iter().any(|t| t.token == Token::Ampersand) {
        return Err(ParseError::StrayBackground);
    }
    if tokens.is_empty() {
        // The line was just "&".
        return Err(ParseError::EmptyStage);
    }

    let mut stages = Vec::new();
    for group in tokens.split(|t| t.token == Token::Pipe) {
        stages.push(parse_stage(group)?);
    }

    Ok(Some(Pipeline {
        stages,
        background,
        text: text.to_owned(),
    }))
}

/// Build one [`Stage`] from the tokens between pipes.
///
/// `<`, `>` and `>>` each consume the following word as their target and
/// drop both tokens from the argument vector; when an operator repeats,
/// the last occurrence wins.
fn parse_stage(tokens: &[Spanned<Token>]) -> Result<Stage, ParseError> {
    let mut argv = Vec::new();
    let mut input = None;
    let mut output = None;

    let mut iter = tokens.iter();
    while let Some(spanned) = iter.next() {
        match &spanned.token {
            Token::Word(word) => argv.push(word.clone()),
            Token::RedirectIn => {
                input = Some(expect_target(&mut iter, "<")?);
            }
            Token::RedirectOut => {
                output = Some(Redirect {
                    path: expect_target(&mut iter, ">")?,
                    append: false,
                });
            }
            Token::RedirectAppend => {
                output = Some(Redirect {
                    path: expect_target(&mut iter, ">>")?,
                    append: true,
                });
            }
            Token::Pipe | Token::Ampersand => {
                unreachable!("separator token inside a stage")
            }
        }
    }

    if argv.is_empty() {
        return Err(ParseError::EmptyStage);
    }

    Ok(Stage {
        argv,
        input,
        output,
    })
}

fn expect_target(
    iter: &mut std::slice::Iter<'_, Spanned<Token>>,
    op: &'static str,
) -> Result<String, ParseError> {
    match iter.next() {
        Some(Spanned {
            token: Token::Word(word),
            ..
        }) => Ok(word.clone()),
        _ => Err(ParseError::MissingRedirectTarget(op)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_text_strips_ampersand_only() {
        let p = parse("  sleep 10 &  ").unwrap().unwrap();
        assert!(p.background);
        assert_eq!(p.text, "sleep 10");
    }

    #[test]
    fn foreground_text_is_trimmed_line() {
        let p = parse("  echo hi  ").unwrap().unwrap();
        assert!(!p.background);
        assert_eq!(p.text, "echo hi");
    }

    #[test]
    fn stage_keeps_argument_order_around_redirections() {
        let p = parse("sort -r < in -u > out").unwrap().unwrap();
        let stage = &p.stages[0];
        assert_eq!(stage.argv, ["sort", "-r", "-u"]);
        assert_eq!(stage.input.as_deref(), Some("in"));
        assert_eq!(
            stage.output,
            Some(Redirect {
                path: "out".into(),
                append: false
            })
        );
    }
}
