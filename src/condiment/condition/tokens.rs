//! Token definitions for guard conditions
//!
//! This module defines the tokens of the condition language, produced with the logos
//! derive macro. Keywords are exact literals and take priority over identifiers of the
//! same length, so `and` is a keyword while `android` is an identifier.
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// All possible tokens in a guard condition
#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\f]+")]
pub enum Token {
    // Boolean keywords
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("in")]
    In,

    // Literal keywords
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("None")]
    None,

    // Comparison
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("//")]
    SlashSlash,
    #[token("%")]
    Percent,

    // Grouping
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token(",")]
    Comma,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| unquote(lex.slice()))]
    Str(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::In => write!(f, "in"),
            Token::True => write!(f, "True"),
            Token::False => write!(f, "False"),
            Token::None => write!(f, "None"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::SlashSlash => write!(f, "//"),
            Token::Percent => write!(f, "%"),
            Token::OpenParen => write!(f, "("),
            Token::CloseParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Int(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "{:?}", s),
            Token::Ident(name) => write!(f, "{}", name),
        }
    }
}

/// Strip the quotes from a string literal and resolve its escapes.
fn unquote(literal: &str) -> Option<String> {
    let body = literal.get(1..literal.len().checked_sub(1)?)?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            // unknown escapes are kept verbatim
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Some(out)
}

/// A character the lexer could not turn into a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub span: Range<usize>,
    pub text: String,
}

/// Tokenize a condition, keeping the byte range of every token.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(LexError {
                    span: lexer.span(),
                    text: lexer.slice().to_string(),
                })
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn keywords_beat_identifiers_of_same_length() {
        assert_eq!(
            kinds("not android and WITH_A"),
            vec![
                Token::Not,
                Token::Ident("android".to_string()),
                Token::And,
                Token::Ident("WITH_A".to_string()),
            ]
        );
    }

    #[test]
    fn string_literals_resolve_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\tb""#),
            vec![Token::Str("it's".to_string()), Token::Str("a\tb".to_string())]
        );
    }

    #[test]
    fn two_character_operators_win() {
        assert_eq!(
            kinds("<= < // >= !="),
            vec![
                Token::LtEq,
                Token::Lt,
                Token::SlashSlash,
                Token::GtEq,
                Token::NotEq
            ]
        );
    }

    #[test]
    fn spans_point_into_source() {
        let tokens = tokenize("WITH_A == '1'").unwrap();
        assert_eq!(tokens[0].1, 0..6);
        assert_eq!(tokens[1].1, 7..9);
        assert_eq!(tokens[2].1, 10..13);
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("WITH_A / 2").unwrap_err();
        assert_eq!(err.text, "/");
        assert_eq!(err.span, 7..8);
    }

    #[test]
    fn oversized_integers_are_errors() {
        assert!(tokenize("99999999999999999999999").is_err());
    }
}
