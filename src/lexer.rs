use std::fmt;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Elif,
    Else,
    Null,
    Loop,
    Times,
    With,
    Func,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::Null => "null",
            Keyword::Loop => "loop",
            Keyword::Times => "times",
            Keyword::With => "with",
            Keyword::Func => "func",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Power,
    Multiply,
    Divide,
    Modulo,
    Add,
    Subtract,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl Operator {
    /// Binding strength used by the shunting-yard pass.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Power => 15,
            Operator::Multiply | Operator::Divide | Operator::Modulo => 14,
            Operator::Add | Operator::Subtract => 13,
            Operator::Less
            | Operator::LessEqual
            | Operator::Greater
            | Operator::GreaterEqual => 11,
            Operator::Equal | Operator::NotEqual => 10,
            Operator::And => 6,
            Operator::Or => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Power => "^",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Newline,
    Operator(Operator),
    Comma,
    Colon,
    Pipe,
    LambdaArrow,
    Assign,
    Ampersand,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Number,
    Keyword(Keyword),
    Identifier,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Operator(op) => write!(f, "operator `{op}`"),
            TokenKind::Comma => f.write_str("comma"),
            TokenKind::Colon => f.write_str("colon"),
            TokenKind::Pipe => f.write_str("pipe"),
            TokenKind::LambdaArrow => f.write_str("lambda arrow"),
            TokenKind::Assign => f.write_str("assignment"),
            TokenKind::Ampersand => f.write_str("&"),
            TokenKind::LParen => f.write_str("open paren"),
            TokenKind::RParen => f.write_str("close paren"),
            TokenKind::LBracket => f.write_str("open bracket"),
            TokenKind::RBracket => f.write_str("close bracket"),
            TokenKind::Number => f.write_str("number"),
            TokenKind::Keyword(kw) => f.write_str(kw.as_str()),
            TokenKind::Identifier => f.write_str("identifier"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub content: String,
    pub line: usize,
    pub character: usize,
    pub length: usize,
}

impl Token {
    pub fn position(&self) -> Position {
        Position::new(self.line, self.character)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<Diagnostic>,
}

pub fn tokenize(source: &str) -> LexResult {
    Lexer::new(source).tokenize()
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current: usize,
    line: usize,
    character: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current: 0,
            line: 1,
            character: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (idx, ch) = self.chars.next()?;
        self.current = idx + ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.character = 1;
        } else {
            self.character += 1;
        }
        Some(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, ch)| ch)
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn bump_while<F>(&mut self, mut predicate: F)
    where
        F: FnMut(char) -> bool,
    {
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.bump();
        }
    }

    pub fn tokenize(mut self) -> LexResult {
        let mut result = LexResult::default();
        loop {
            let start = self.current;
            let (line, character) = (self.line, self.character);
            let Some(ch) = self.bump() else {
                result.tokens.push(Token {
                    kind: TokenKind::Eof,
                    content: String::new(),
                    line,
                    character,
                    length: 0,
                });
                break;
            };

            let kind = match ch {
                ' ' | '\t' | '\r' => {
                    self.bump_while(|c| matches!(c, ' ' | '\t' | '\r'));
                    continue;
                }
                '\n' => {
                    self.bump_while(|c| c == '\n');
                    TokenKind::Newline
                }
                '/' if self.peek() == Some('/') => {
                    self.bump_while(|c| c != '\n');
                    continue;
                }
                '=' if self.match_next('=') => TokenKind::Operator(Operator::Equal),
                '!' if self.match_next('=') => TokenKind::Operator(Operator::NotEqual),
                '>' if self.match_next('=') => TokenKind::Operator(Operator::GreaterEqual),
                '<' if self.match_next('=') => TokenKind::Operator(Operator::LessEqual),
                '&' if self.match_next('&') => TokenKind::Operator(Operator::And),
                '|' if self.match_next('|') => TokenKind::Operator(Operator::Or),
                '<' => TokenKind::Operator(Operator::Less),
                '>' => TokenKind::Operator(Operator::Greater),
                '+' => TokenKind::Operator(Operator::Add),
                '-' => TokenKind::Operator(Operator::Subtract),
                '*' => TokenKind::Operator(Operator::Multiply),
                '/' => TokenKind::Operator(Operator::Divide),
                '%' => TokenKind::Operator(Operator::Modulo),
                '^' => TokenKind::Operator(Operator::Power),
                ',' => TokenKind::Comma,
                ':' => TokenKind::Colon,
                '|' => TokenKind::Pipe,
                '=' if self.match_next('>') => TokenKind::LambdaArrow,
                '=' => TokenKind::Assign,
                '&' => TokenKind::Ampersand,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                '0'..='9' => {
                    self.bump_while(|c| c.is_ascii_digit());
                    let fraction_follows = self.peek() == Some('.')
                        && self.peek_second().is_some_and(|c| c.is_ascii_digit());
                    if fraction_follows {
                        self.bump();
                        self.bump_while(|c| c.is_ascii_digit());
                    }
                    TokenKind::Number
                }
                'a'..='z' | 'A'..='Z' => {
                    self.bump_while(|c| c.is_ascii_alphanumeric());
                    keyword_for(&self.source[start..self.current])
                        .map(TokenKind::Keyword)
                        .unwrap_or(TokenKind::Identifier)
                }
                other => {
                    result.errors.push(
                        Diagnostic::new(
                            DiagnosticKind::Lexical,
                            format!("Unexpected character `{other}`"),
                        )
                        .at(Position::new(line, character), 1),
                    );
                    continue;
                }
            };

            let content = &self.source[start..self.current];
            result.tokens.push(Token {
                kind,
                content: content.to_string(),
                line,
                character,
                length: content.chars().count(),
            });
        }
        result
    }
}

fn keyword_for(ident: &str) -> Option<Keyword> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "if" => Kw::If,
        "elif" => Kw::Elif,
        "else" => Kw::Else,
        "null" => Kw::Null,
        "loop" => Kw::Loop,
        "times" => Kw::Times,
        "with" => Kw::With,
        "func" => Kw::Func,
        _ => return None,
    };
    Some(keyword)
}
