//! An eager tokenizer for model-language source files.
//!
//! The whole source is turned into tokens before the parser sees any of them.
//! Scanning and classification are separate steps: the scanner cuts the text
//! into raw lexemes, then [`PatternTable::classify`] decides what each lexeme
//! is by trying one full-match pattern per [`TokenKind`] in priority order.
//! The priority list is what makes `or` an operator and `begin` a keyword even
//! though both also look like identifiers.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TokenKind {
    RelationOp,
    AddOp,
    MulOp,
    UnaryOp,
    BoolConst,
    Identifier,
    IntNumber,
    FloatNumber,
    Dim,
    Type,
    If,
    Then,
    Else,
    For,
    To,
    Do,
    While,
    Read,
    Write,
    As,
    Comma,
    Colon,
    Separator,
    OpenParen,
    CloseParen,
    Begin,
    End,
    Eof,
    /// Lookahead wildcard; never produced by the lexer.
    Any,
}

/// Classification order. Earlier kinds win when a lexeme matches several
/// patterns.
const PRIORITY: [TokenKind; 27] = [
    TokenKind::Begin,
    TokenKind::End,
    TokenKind::OpenParen,
    TokenKind::CloseParen,
    TokenKind::Separator,
    TokenKind::BoolConst,
    TokenKind::If,
    TokenKind::Then,
    TokenKind::Else,
    TokenKind::For,
    TokenKind::To,
    TokenKind::Do,
    TokenKind::Dim,
    TokenKind::While,
    TokenKind::Read,
    TokenKind::Write,
    TokenKind::As,
    TokenKind::UnaryOp,
    TokenKind::Type,
    TokenKind::Comma,
    TokenKind::Colon,
    TokenKind::RelationOp,
    TokenKind::AddOp,
    TokenKind::MulOp,
    TokenKind::IntNumber,
    TokenKind::FloatNumber,
    TokenKind::Identifier,
];

impl TokenKind {
    /// The recognition pattern of this kind, unanchored.
    pub fn pattern(self) -> Option<&'static str> {
        let pattern = match self {
            TokenKind::RelationOp => "<>|<=|>=|=|<|>",
            TokenKind::AddOp => r"or|\+|-",
            TokenKind::MulOp => r"and|\*|/",
            TokenKind::UnaryOp => "not",
            TokenKind::BoolConst => "true|false",
            TokenKind::Identifier => "[A-Za-z][A-Za-z0-9]*",
            TokenKind::IntNumber => "[01]+[bB]|[0-7]+[oO]|[0-9][0-9A-Fa-f]*[hH]|[0-9]+[dD]?",
            TokenKind::FloatNumber => r"[0-9]+[eE][+-]?[0-9]+|[0-9]*\.[0-9]+(?:[eE][+-]?[0-9]+)?",
            TokenKind::Dim => "dim|var",
            TokenKind::Type => "integer|float|bool",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::To => "to",
            TokenKind::Do => "do",
            TokenKind::While => "while",
            TokenKind::Read => "read",
            TokenKind::Write => "write",
            TokenKind::As => "as",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Separator => ";|\n",
            TokenKind::OpenParen => r"\(",
            TokenKind::CloseParen => r"\)",
            TokenKind::Begin => "begin",
            TokenKind::End => "end",
            TokenKind::Eof | TokenKind::Any => return None,
        };
        Some(pattern)
    }

    /// Node name used for leaves of this kind in tree dumps.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::RelationOp => "RelationOp",
            TokenKind::AddOp => "AddOp",
            TokenKind::MulOp => "MulOp",
            TokenKind::UnaryOp => "UnaryOp",
            TokenKind::BoolConst => "BoolConst",
            TokenKind::Identifier => "Identifier",
            TokenKind::IntNumber => "IntNumber",
            TokenKind::FloatNumber => "FloatNumber",
            TokenKind::Dim => "Dim",
            TokenKind::Type => "Type",
            TokenKind::If => "If",
            TokenKind::Then => "Then",
            TokenKind::Else => "Else",
            TokenKind::For => "For",
            TokenKind::To => "To",
            TokenKind::Do => "Do",
            TokenKind::While => "While",
            TokenKind::Read => "Read",
            TokenKind::Write => "Write",
            TokenKind::As => "As",
            TokenKind::Comma => "Comma",
            TokenKind::Colon => "Colon",
            TokenKind::Separator => "Separator",
            TokenKind::OpenParen => "OpenParen",
            TokenKind::CloseParen => "CloseParen",
            TokenKind::Begin => "Begin",
            TokenKind::End => "End",
            TokenKind::Eof => "Eof",
            TokenKind::Any => "Any",
        }
    }

    /// Human-readable description, as shown in token listings and errors.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::RelationOp => "relation operator",
            TokenKind::AddOp => "addition operator",
            TokenKind::MulOp => "multiplication operator",
            TokenKind::UnaryOp => "not",
            TokenKind::BoolConst => "bool const",
            TokenKind::Identifier => "identifier",
            TokenKind::IntNumber => "integral number",
            TokenKind::FloatNumber => "float number",
            TokenKind::Dim => "dim",
            TokenKind::Type => "type",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::To => "to",
            TokenKind::Do => "do",
            TokenKind::While => "while",
            TokenKind::Read => "read",
            TokenKind::Write => "write",
            TokenKind::As => "as",
            TokenKind::Comma => "comma",
            TokenKind::Colon => "colon",
            TokenKind::Separator => "operation separator",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::Begin => "begin",
            TokenKind::End => "end",
            TokenKind::Eof => "end of input",
            TokenKind::Any => "any token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {}, {:?}, {} }}", self.kind, self.text, self.line)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum LexError {
    #[error("comment opened on line {line} is not finished")]
    UnterminatedComment { line: usize },
    #[error("{lexeme} is not a valid token (line {line})")]
    InvalidToken { lexeme: String, line: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedComment { line } | LexError::InvalidToken { line, .. } => *line,
        }
    }
}

/// Anchored patterns for every lexical kind, in priority order.
pub struct PatternTable {
    patterns: Vec<(TokenKind, Regex)>,
}

static SHARED_PATTERNS: LazyLock<PatternTable> = LazyLock::new(PatternTable::new);

impl PatternTable {
    pub fn new() -> Self {
        let patterns = PRIORITY
            .iter()
            .filter_map(|&kind| kind.pattern().map(|pattern| (kind, pattern)))
            .map(|(kind, pattern)| {
                let regex = Regex::new(&format!("^(?:{pattern})$"))
                    .expect("token patterns are valid regular expressions");
                (kind, regex)
            })
            .collect();
        Self { patterns }
    }

    /// The process-wide table, built on first use.
    pub fn shared() -> &'static PatternTable {
        &SHARED_PATTERNS
    }

    pub fn classify(&self, lexeme: &str, line: usize) -> Result<Token, LexError> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(lexeme))
            .map(|(kind, _)| Token::new(*kind, lexeme, line))
            .ok_or_else(|| LexError::InvalidToken {
                lexeme: lexeme.to_string(),
                line,
            })
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies a single raw lexeme as if it appeared on line 1.
pub fn classify(lexeme: &str) -> Result<Token, LexError> {
    PatternTable::shared().classify(lexeme, 1)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanMode {
    Numeric,
    Alphanumeric,
    Symbolic,
}

impl ScanMode {
    fn of(first: char) -> Self {
        if first.is_ascii_digit() || first == '.' {
            ScanMode::Numeric
        } else if first.is_ascii_alphanumeric() {
            ScanMode::Alphanumeric
        } else {
            ScanMode::Symbolic
        }
    }

    fn accepts(self, c: char, previous: Option<char>) -> bool {
        match self {
            ScanMode::Numeric => {
                c.is_ascii_alphanumeric()
                    || c == '.'
                    // Exponent sign, as in `1.5e-3`.
                    || (matches!(c, '+' | '-') && matches!(previous, Some('e' | 'E')))
            }
            ScanMode::Alphanumeric => c.is_ascii_alphanumeric(),
            ScanMode::Symbolic => !c.is_whitespace() && !c.is_ascii_alphanumeric(),
        }
    }
}

/// Characters that end any lexeme.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '{')
}

#[derive(Debug, PartialEq, Eq)]
struct Lexeme {
    text: String,
    line: usize,
}

/// Streams classified tokens out of a source string.
pub struct Lexer<'s> {
    chars: Peekable<Chars<'s>>,
    line: usize,
    patterns: &'s PatternTable,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self::with_patterns(source, PatternTable::shared())
    }

    pub fn with_patterns(source: &'s str, patterns: &'s PatternTable) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            patterns,
        }
    }

    fn next_lexeme(&mut self) -> Result<Option<Lexeme>, LexError> {
        while let Some(&c) = self.chars.peek() {
            match c {
                '\n' => {
                    self.chars.next();
                    let line = self.line;
                    self.line += 1;
                    return Ok(Some(Lexeme {
                        text: "\n".to_string(),
                        line,
                    }));
                }
                '{' => self.skip_comment()?,
                '(' | ')' => {
                    self.chars.next();
                    return Ok(Some(Lexeme {
                        text: c.to_string(),
                        line: self.line,
                    }));
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                _ => return Ok(Some(self.scan(c))),
            }
        }
        Ok(None)
    }

    fn skip_comment(&mut self) -> Result<(), LexError> {
        let opened_on = self.line;
        self.chars.next();
        for c in self.chars.by_ref() {
            match c {
                '}' => return Ok(()),
                '\n' => self.line += 1,
                _ => {}
            }
        }
        Err(LexError::UnterminatedComment { line: opened_on })
    }

    fn scan(&mut self, first: char) -> Lexeme {
        let mode = ScanMode::of(first);
        let mut text = String::new();
        let mut previous = None;
        while let Some(&c) = self.chars.peek() {
            if is_delimiter(c) || !mode.accepts(c, previous) {
                break;
            }
            text.push(c);
            previous = Some(c);
            self.chars.next();
        }
        Lexeme {
            text,
            line: self.line,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_lexeme()
            .transpose()
            .map(|lexeme| lexeme.and_then(|l| self.patterns.classify(&l.text, l.line)))
    }
}

#[tracing::instrument(level = "trace", skip_all)]
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(lexeme: &str) -> TokenKind {
        classify(lexeme)
            .unwrap_or_else(|err| panic!("{lexeme:?} should classify: {err}"))
            .kind
    }

    fn token(kind: TokenKind, text: &str, line: usize) -> Token {
        Token::new(kind, text, line)
    }

    #[test]
    fn classify_operators() {
        for op in ["<", ">", "<>", "=", ">=", "<="] {
            assert_eq!(kind_of(op), TokenKind::RelationOp, "{op}");
        }
        for op in ["+", "-", "or"] {
            assert_eq!(kind_of(op), TokenKind::AddOp, "{op}");
        }
        for op in ["*", "/", "and"] {
            assert_eq!(kind_of(op), TokenKind::MulOp, "{op}");
        }
        assert_eq!(kind_of("not"), TokenKind::UnaryOp);
    }

    #[test]
    fn classify_identifiers() {
        assert_eq!(kind_of("aaa"), TokenKind::Identifier);
        assert_eq!(kind_of("a009"), TokenKind::Identifier);
        assert_eq!(kind_of("aA009"), TokenKind::Identifier);
        assert_eq!(kind_of("ordinal"), TokenKind::Identifier);
        assert!(classify("009aa").is_err());
    }

    #[test]
    fn classify_keywords_before_identifiers() {
        assert_eq!(kind_of("dim"), TokenKind::Dim);
        assert_eq!(kind_of("var"), TokenKind::Dim);
        assert_eq!(kind_of("if"), TokenKind::If);
        assert_eq!(kind_of("then"), TokenKind::Then);
        assert_eq!(kind_of("else"), TokenKind::Else);
        assert_eq!(kind_of("while"), TokenKind::While);
        assert_eq!(kind_of("for"), TokenKind::For);
        assert_eq!(kind_of("do"), TokenKind::Do);
        assert_eq!(kind_of("to"), TokenKind::To);
        assert_eq!(kind_of("read"), TokenKind::Read);
        assert_eq!(kind_of("write"), TokenKind::Write);
        assert_eq!(kind_of("as"), TokenKind::As);
        assert_eq!(kind_of("begin"), TokenKind::Begin);
        assert_eq!(kind_of("end"), TokenKind::End);
        assert_eq!(kind_of("true"), TokenKind::BoolConst);
        assert_eq!(kind_of("false"), TokenKind::BoolConst);
        assert_eq!(kind_of("integer"), TokenKind::Type);
        assert_eq!(kind_of("float"), TokenKind::Type);
        assert_eq!(kind_of("bool"), TokenKind::Type);
    }

    #[test]
    fn classify_int_numbers() {
        for literal in [
            "423423", "423423d", "423423D", "423423o", "423423O", "0111011b", "0111011B", "0ffh",
            "12ABH",
        ] {
            assert_eq!(kind_of(literal), TokenKind::IntNumber, "{literal}");
        }
        assert!(classify("423423b").is_err());
        assert!(classify("423428O").is_err());
        assert!(classify("12g").is_err());
    }

    #[test]
    fn hex_needs_a_leading_digit() {
        assert_eq!(kind_of("0ffh"), TokenKind::IntNumber);
        assert_eq!(kind_of("ffh"), TokenKind::Identifier);
        assert_eq!(kind_of("each"), TokenKind::Identifier);
    }

    #[test]
    fn classify_float_numbers() {
        for literal in ["1.3", ".3", "1e3", "1.3e3", "1.3e+3", "1.3e-3", ".3e-3"] {
            assert_eq!(kind_of(literal), TokenKind::FloatNumber, "{literal}");
        }
        assert!(classify(".3.3").is_err());
        assert!(classify("1.").is_err());
    }

    #[test]
    fn classify_punctuation() {
        assert_eq!(kind_of("("), TokenKind::OpenParen);
        assert_eq!(kind_of(")"), TokenKind::CloseParen);
        assert_eq!(kind_of(","), TokenKind::Comma);
        assert_eq!(kind_of(":"), TokenKind::Colon);
        assert_eq!(kind_of(";"), TokenKind::Separator);
        assert_eq!(kind_of("\n"), TokenKind::Separator);
    }

    #[test]
    fn invalid_token_message_names_the_lexeme() {
        let err = PatternTable::shared()
            .classify("$$", 4)
            .expect_err("should not classify");
        assert_eq!(
            err,
            LexError::InvalidToken {
                lexeme: "$$".to_string(),
                line: 4
            }
        );
        assert!(err.to_string().starts_with("$$ is not a valid token"));
    }

    #[test]
    fn tokenize_declaration_and_assignment() {
        let tokens = tokenize("dim a integer\na as 1 + 2 + 3").expect("tokenize");
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::Dim, "dim", 1),
                token(TokenKind::Identifier, "a", 1),
                token(TokenKind::Type, "integer", 1),
                token(TokenKind::Separator, "\n", 1),
                token(TokenKind::Identifier, "a", 2),
                token(TokenKind::As, "as", 2),
                token(TokenKind::IntNumber, "1", 2),
                token(TokenKind::AddOp, "+", 2),
                token(TokenKind::IntNumber, "2", 2),
                token(TokenKind::AddOp, "+", 2),
                token(TokenKind::IntNumber, "3", 2),
            ]
        );
    }

    #[test]
    fn tokenize_single_keywords() {
        assert_eq!(
            tokenize("true").expect("tokenize"),
            vec![token(TokenKind::BoolConst, "true", 1)]
        );
        assert_eq!(
            tokenize("begin").expect("tokenize"),
            vec![token(TokenKind::Begin, "begin", 1)]
        );
        assert_eq!(
            tokenize("end").expect("tokenize"),
            vec![token(TokenKind::End, "end", 1)]
        );
    }

    #[test]
    fn tokenize_without_spaces_between_operators() {
        assert_eq!(
            tokenize("1+2+3").expect("tokenize"),
            vec![
                token(TokenKind::IntNumber, "1", 1),
                token(TokenKind::AddOp, "+", 1),
                token(TokenKind::IntNumber, "2", 1),
                token(TokenKind::AddOp, "+", 1),
                token(TokenKind::IntNumber, "3", 1),
            ]
        );
    }

    #[test]
    fn tokenize_floats_with_exponent_signs() {
        for literal in ["1.23", "1.23e10", "1.23e+10", "1.23e-10", ".23e10"] {
            assert_eq!(
                tokenize(literal).expect("tokenize"),
                vec![token(TokenKind::FloatNumber, literal, 1)]
            );
        }
    }

    #[test]
    fn tokenize_identifier_lists_and_colon_declarations() {
        assert_eq!(
            tokenize("dim a,b,c integer").expect("tokenize"),
            vec![
                token(TokenKind::Dim, "dim", 1),
                token(TokenKind::Identifier, "a", 1),
                token(TokenKind::Comma, ",", 1),
                token(TokenKind::Identifier, "b", 1),
                token(TokenKind::Comma, ",", 1),
                token(TokenKind::Identifier, "c", 1),
                token(TokenKind::Type, "integer", 1),
            ]
        );
        assert_eq!(
            tokenize("a,b: bool ; c").expect("tokenize"),
            vec![
                token(TokenKind::Identifier, "a", 1),
                token(TokenKind::Comma, ",", 1),
                token(TokenKind::Identifier, "b", 1),
                token(TokenKind::Colon, ":", 1),
                token(TokenKind::Type, "bool", 1),
                token(TokenKind::Separator, ";", 1),
                token(TokenKind::Identifier, "c", 1),
            ]
        );
    }

    #[test]
    fn tokenize_parentheses_next_to_operators() {
        assert_eq!(
            tokenize("3*(2+3)").expect("tokenize"),
            vec![
                token(TokenKind::IntNumber, "3", 1),
                token(TokenKind::MulOp, "*", 1),
                token(TokenKind::OpenParen, "(", 1),
                token(TokenKind::IntNumber, "2", 1),
                token(TokenKind::AddOp, "+", 1),
                token(TokenKind::IntNumber, "3", 1),
                token(TokenKind::CloseParen, ")", 1),
            ]
        );
        assert_eq!(
            tokenize("write(a)").expect("tokenize"),
            vec![
                token(TokenKind::Write, "write", 1),
                token(TokenKind::OpenParen, "(", 1),
                token(TokenKind::Identifier, "a", 1),
                token(TokenKind::CloseParen, ")", 1),
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_count_lines() {
        assert_eq!(
            tokenize("{gfdgjkfdh ghfd jghfd df}3").expect("tokenize"),
            vec![token(TokenKind::IntNumber, "3", 1)]
        );
        assert_eq!(
            tokenize("{gfdgjkfdh\nghfd jghfd df}3").expect("tokenize"),
            vec![token(TokenKind::IntNumber, "3", 2)]
        );
        assert_eq!(
            tokenize("{if a > b then c as b - a}\n3").expect("tokenize"),
            vec![
                token(TokenKind::Separator, "\n", 1),
                token(TokenKind::IntNumber, "3", 2),
            ]
        );
        assert_eq!(
            tokenize("a {note} as 1").expect("tokenize"),
            vec![
                token(TokenKind::Identifier, "a", 1),
                token(TokenKind::As, "as", 1),
                token(TokenKind::IntNumber, "1", 1),
            ]
        );
    }

    #[test]
    fn unterminated_comment_is_a_lex_error() {
        assert_eq!(
            tokenize("{abc"),
            Err(LexError::UnterminatedComment { line: 1 })
        );
        assert_eq!(
            tokenize("a as 1\n{gfdgjkfdh\nghfd"),
            Err(LexError::UnterminatedComment { line: 2 })
        );
    }

    #[test]
    fn glued_symbols_form_one_invalid_lexeme() {
        assert_eq!(
            tokenize("a as 1 +- 2"),
            Err(LexError::InvalidToken {
                lexeme: "+-".to_string(),
                line: 1
            })
        );
    }

    #[test]
    fn explicit_pattern_table_gives_the_same_tokens() {
        let table = PatternTable::new();
        let tokens = Lexer::with_patterns("x as 0111b", &table)
            .collect::<Result<Vec<_>, _>>()
            .expect("tokenize");
        assert_eq!(tokens, tokenize("x as 0111b").expect("tokenize"));
    }

    #[test]
    fn empty_and_blank_sources_have_no_tokens() {
        assert_eq!(tokenize("").expect("tokenize"), vec![]);
        assert_eq!(tokenize("  \t {only a comment} ").expect("tokenize"), vec![]);
    }
}
