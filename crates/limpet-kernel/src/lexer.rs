//! Lexer for limpet command lines.
//!
//! Converts a raw line into word and operator tokens using the logos
//! lexer generator. A word is a maximal run of non-whitespace,
//! non-operator characters; there is no quoting or escaping, so a literal
//! space cannot be embedded in an argument.

use logos::{Logos, Span};

/// A token with its span in the source line.
///
/// Spans are byte ranges into the original line. The parser uses them to
/// recover the display text of a backgrounded command with its trailing
/// `&` stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

/// Tokens produced by the limpet lexer.
///
/// `>>` is listed before `>` so logos prefers the longer operator.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[token("|")]
    Pipe,

    #[token("&")]
    Ampersand,

    #[token(">>")]
    RedirectAppend,

    #[token(">")]
    RedirectOut,

    #[token("<")]
    RedirectIn,

    #[regex(r"[^ \t\r\n|&<>]+", |lex| lex.slice().to_owned())]
    Word(String),
}

/// Tokenize a command line.
///
/// Total for any input: every character is either whitespace, an
/// operator, or part of a word, so lexing cannot fail.
pub fn tokenize(line: &str) -> Vec<Spanned<Token>> {
    Token::lexer(line)
        .spanned()
        .filter_map(|(token, span)| token.ok().map(|token| Spanned { token, span }))
        .collect()
}
