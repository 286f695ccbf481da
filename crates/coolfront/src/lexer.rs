//! The scanner.

use crate::diagnostics::{Diagnostic, ErrorKind, Position};
use logos::Logos;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Class,
    Inherits,
    If,
    Then,
    Else,
    Fi,
    While,
    Loop,
    Pool,
    Let,
    In,
    Case,
    Of,
    Esac,
    New,
    IsVoid,
    Not,
    True,
    False,
    TypeIdent,
    ObjectIdent,
    Integer,
    Str,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Colon,
    Semicolon,
    Comma,
    Dot,
    At,
    Assign,
    DArrow,
    Plus,
    Minus,
    Star,
    Slash,
    Tilde,
    Less,
    LessEqual,
    Equal,
    Eof,
}

impl TokenKind {
    /// All token kinds except the end of input.
    pub const TERMINALS: &'static [TokenKind] = &[
        Self::Class,
        Self::Inherits,
        Self::If,
        Self::Then,
        Self::Else,
        Self::Fi,
        Self::While,
        Self::Loop,
        Self::Pool,
        Self::Let,
        Self::In,
        Self::Case,
        Self::Of,
        Self::Esac,
        Self::New,
        Self::IsVoid,
        Self::Not,
        Self::True,
        Self::False,
        Self::TypeIdent,
        Self::ObjectIdent,
        Self::Integer,
        Self::Str,
        Self::LBrace,
        Self::RBrace,
        Self::LParen,
        Self::RParen,
        Self::Colon,
        Self::Semicolon,
        Self::Comma,
        Self::Dot,
        Self::At,
        Self::Assign,
        Self::DArrow,
        Self::Plus,
        Self::Minus,
        Self::Star,
        Self::Slash,
        Self::Tilde,
        Self::Less,
        Self::LessEqual,
        Self::Equal,
    ];

    /// The name of the corresponding terminal symbol in the COOL grammar.
    pub fn name(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Inherits => "inherits",
            Self::If => "if",
            Self::Then => "then",
            Self::Else => "else",
            Self::Fi => "fi",
            Self::While => "while",
            Self::Loop => "loop",
            Self::Pool => "pool",
            Self::Let => "let",
            Self::In => "in",
            Self::Case => "case",
            Self::Of => "of",
            Self::Esac => "esac",
            Self::New => "new",
            Self::IsVoid => "isvoid",
            Self::Not => "not",
            Self::True => "true",
            Self::False => "false",
            Self::TypeIdent => "TYPE",
            Self::ObjectIdent => "id",
            Self::Integer => "integer",
            Self::Str => "string",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::At => "@",
            Self::Assign => "<-",
            Self::DArrow => "=>",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Tilde => "~",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Equal => "=",
            Self::Eof => "$",
        }
    }

    fn keyword(word: &str) -> Option<Self> {
        let lower = word.to_ascii_lowercase();
        let kind = match &*lower {
            "class" => Self::Class,
            "inherits" => Self::Inherits,
            "if" => Self::If,
            "then" => Self::Then,
            "else" => Self::Else,
            "fi" => Self::Fi,
            "while" => Self::While,
            "loop" => Self::Loop,
            "pool" => Self::Pool,
            "let" => Self::Let,
            "in" => Self::In,
            "case" => Self::Case,
            "of" => Self::Of,
            "esac" => Self::Esac,
            "new" => Self::New,
            "isvoid" => Self::IsVoid,
            "not" => Self::Not,
            // boolean constants must begin with a lower-case letter.
            "true" if word.starts_with('t') => Self::True,
            "false" if word.starts_with('f') => Self::False,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub lexeme: String,
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

#[derive(Debug, Copy, Clone, Logos, PartialEq)]
#[logos(skip r"([ \t\r\n\f\x0B]+|--[^\n]*)")]
enum RawToken {
    #[token("(*", block_comment)]
    Comment,

    #[regex(r"[A-Za-z][A-Za-z0-9_]*")]
    Word,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r#""([^"\\\n]|\\[^\n]|\\\n)*""#)]
    Str,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("@")]
    At,

    #[token("<-")]
    Assign,

    #[token("=>")]
    DArrow,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("~")]
    Tilde,

    #[token("<")]
    Less,

    #[token("<=")]
    LessEqual,

    #[token("=")]
    Equal,
}

// Block comments nest, which a regular expression cannot express.
fn block_comment(lex: &mut logos::Lexer<'_, RawToken>) -> bool {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'(', Some(b'*')) => {
                depth += 1;
                i += 2;
            }
            (b'*', Some(b')')) => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    lex.bump(i);
                    return true;
                }
            }
            _ => i += 1,
        }
    }
    lex.bump(rest.len());
    false
}

impl RawToken {
    fn kind(self, slice: &str) -> Option<TokenKind> {
        let kind = match self {
            Self::Comment => return None,
            Self::Word => match TokenKind::keyword(slice) {
                Some(keyword) => keyword,
                None if slice.starts_with(|c: char| c.is_ascii_uppercase()) => {
                    TokenKind::TypeIdent
                }
                None => TokenKind::ObjectIdent,
            },
            Self::Integer => TokenKind::Integer,
            Self::Str => TokenKind::Str,
            Self::LBrace => TokenKind::LBrace,
            Self::RBrace => TokenKind::RBrace,
            Self::LParen => TokenKind::LParen,
            Self::RParen => TokenKind::RParen,
            Self::Colon => TokenKind::Colon,
            Self::Semicolon => TokenKind::Semicolon,
            Self::Comma => TokenKind::Comma,
            Self::Dot => TokenKind::Dot,
            Self::At => TokenKind::At,
            Self::Assign => TokenKind::Assign,
            Self::DArrow => TokenKind::DArrow,
            Self::Plus => TokenKind::Plus,
            Self::Minus => TokenKind::Minus,
            Self::Star => TokenKind::Star,
            Self::Slash => TokenKind::Slash,
            Self::Tilde => TokenKind::Tilde,
            Self::Less => TokenKind::Less,
            Self::LessEqual => TokenKind::LessEqual,
            Self::Equal => TokenKind::Equal,
        };
        Some(kind)
    }
}

/// Byte offsets of the start of each line, used to compute positions.
struct LineIndex<'s> {
    source: &'s str,
    starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    fn new(source: &'s str) -> Self {
        let starts = Some(0)
            .into_iter()
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, starts }
    }

    fn position(&self, offset: usize) -> Position {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.starts[line];
        let column = self.source[start..offset].chars().count() + 1;
        Position::new(line + 1, column)
    }
}

/// The result of scanning a source text.
#[derive(Debug)]
pub struct Tokens {
    /// The scanned tokens, always terminated by a [`TokenKind::Eof`] token.
    pub tokens: Vec<Token>,
    pub errors: Vec<Diagnostic>,
}

/// Scan `source` into tokens.
///
/// An illegal character is reported and skipped, and scanning resumes at
/// the next character.
pub fn tokenize(source: &str) -> Tokens {
    let lines = LineIndex::new(source);
    let mut tokens = vec![];
    let mut errors = vec![];

    let mut offset = 0;
    'restart: loop {
        let mut lexer = RawToken::lexer(&source[offset..]);
        while let Some(res) = lexer.next() {
            let start = offset + lexer.span().start;
            let slice = lexer.slice();
            let pos = lines.position(start);
            match res {
                Ok(raw) => {
                    if let Some(kind) = raw.kind(slice) {
                        if kind == TokenKind::Integer && slice.parse::<i64>().is_err() {
                            errors.push(Diagnostic::new(
                                pos,
                                ErrorKind::LexError(format!(
                                    "Integer literal {} is out of range.",
                                    slice
                                )),
                            ));
                        }
                        tokens.push(Token {
                            lexeme: slice.to_owned(),
                            kind,
                            line: pos.line,
                            column: pos.column,
                        });
                    }
                }
                Err(()) if slice.starts_with("(*") => {
                    errors.push(Diagnostic::new(
                        pos,
                        ErrorKind::LexError("EOF in comment.".to_owned()),
                    ));
                }
                Err(()) => {
                    let ch = slice.chars().next().unwrap_or_default();
                    tracing::trace!(?pos, ?ch, "illegal character");
                    errors.push(Diagnostic::new(
                        pos,
                        ErrorKind::LexError(format!("Illegal character '{}'.", ch.escape_debug())),
                    ));
                    // resume right after the offending character.
                    if slice.len() > ch.len_utf8() {
                        offset = start + ch.len_utf8();
                        continue 'restart;
                    }
                }
            }
        }
        break;
    }

    let end = lines.position(source.len());
    tokens.push(Token {
        lexeme: "$".to_owned(),
        kind: TokenKind::Eof,
        line: end.line,
        column: end.column,
    });

    Tokens { tokens, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        use TokenKind::*;
        assert_eq!(
            kinds("CLASS Main InHeRiTs IO"),
            [Class, TypeIdent, Inherits, TypeIdent, Eof]
        );
        assert_eq!(kinds("true tRUE True"), [True, True, TypeIdent, Eof]);
        assert_eq!(
            kinds("x <- y <= 3"),
            [ObjectIdent, Assign, ObjectIdent, LessEqual, Integer, Eof]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let Tokens { tokens, errors } = tokenize("class A {\n  x : Int;\n};");
        assert!(errors.is_empty());
        let x = &tokens[3];
        assert_eq!(x.lexeme, "x");
        assert_eq!((x.line, x.column), (2, 3));
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!((eof.line, eof.column), (3, 3));
    }

    #[test]
    fn skips_comments() {
        use TokenKind::*;
        assert_eq!(
            kinds("a -- line comment\n(* block (* nested *) still *) b"),
            [ObjectIdent, ObjectIdent, Eof]
        );
        let res = tokenize("a (* never closed");
        assert_eq!(res.errors.len(), 1);
        assert_eq!(res.errors[0].kind, ErrorKind::LexError("EOF in comment.".into()));
    }

    #[test]
    fn strings_keep_escapes() {
        let res = tokenize(r#"out_string("a \"quoted\" word\n")"#);
        assert!(res.errors.is_empty());
        assert_eq!(res.tokens[2].kind, TokenKind::Str);
        assert_eq!(res.tokens[2].lexeme, r#""a \"quoted\" word\n""#);
    }

    #[test]
    fn illegal_character_is_skipped() {
        use TokenKind::*;
        let res = tokenize("x # y");
        assert_eq!(
            res.tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            [ObjectIdent, ObjectIdent, Eof]
        );
        assert_eq!(res.errors.len(), 1);
        assert_eq!(res.errors[0].pos, Position::new(1, 3));
        assert_eq!(res.errors[0].to_string(), "Line 1, Column 3: Illegal character '#'.");
    }

    #[test]
    fn oversized_integer_is_reported() {
        let res = tokenize("x <- 99999999999999999999999;");
        assert_eq!(res.tokens[2].kind, TokenKind::Integer);
        assert_eq!(res.errors.len(), 1);
        assert_eq!(
            res.errors[0].to_string(),
            "Line 1, Column 6: Integer literal 99999999999999999999999 is out of range."
        );
    }
}
