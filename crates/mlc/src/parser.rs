//! Table-driven LL parser.
//!
//! Every grammar [`Symbol`] has a [`Rule`] saying how it reacts to the token
//! under the cursor: a leaf consumes it, the other rules pick a
//! [`Production`] to expand into. The driver keeps pending work on an explicit
//! stack and assembles a typed node each time all children of an expanded
//! production are finished. Parsing never recurses, and the list tails of
//! the finished tree unlink themselves when dropped, so long input does not
//! grow the call stack.

use std::fmt;

use tracing::trace;

use crate::ast::{Node, Program};
use crate::grammar::{Production, Symbol};
use crate::tokenizer::{Token, TokenKind};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("{expected} expected, found {found} (line {line})")]
    UnexpectedToken {
        expected: TokenKind,
        found: String,
        line: usize,
    },
    #[error("{symbol} cannot start with {found}, expected {} (line {line})", KindList(.expected))]
    NoAlternative {
        symbol: Symbol,
        expected: Vec<TokenKind>,
        found: String,
        line: usize,
    },
    #[error("end of input expected, found {found} (line {line})")]
    TrailingInput { found: String, line: usize },
    #[error("{production:?} assembled from unexpected {found} (line {line})")]
    Malformed {
        production: Production,
        found: &'static str,
        line: usize,
    },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { line, .. }
            | ParseError::NoAlternative { line, .. }
            | ParseError::TrailingInput { line, .. }
            | ParseError::Malformed { line, .. } => *line,
        }
    }
}

struct KindList<'a>(&'a [TokenKind]);

impl fmt::Display for KindList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, kind) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(if index + 1 == self.0.len() { " or " } else { ", " })?;
            }
            write!(f, "{kind}")?;
        }
        Ok(())
    }
}

/// How a token shows up in error messages.
fn shown(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => TokenKind::Eof.describe().to_string(),
        _ => format!("{:?}", token.text),
    }
}

/// The current token and the one after it.
#[derive(Clone, Copy, Debug)]
pub struct Window<'t> {
    pub current: &'t Token,
    pub next: &'t Token,
}

/// When a table entry of a [`Rule::Transformable`] applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookahead {
    /// The current token has this kind. [`TokenKind::Any`] matches anything.
    Kind(TokenKind),
    /// The current token has this kind and the next one has one of the others.
    Followed(TokenKind, &'static [TokenKind]),
}

impl Lookahead {
    fn is_wildcard(self) -> bool {
        self == Lookahead::Kind(TokenKind::Any)
    }

    fn leading(self) -> TokenKind {
        match self {
            Lookahead::Kind(kind) | Lookahead::Followed(kind, _) => kind,
        }
    }

    fn matches(self, window: Window<'_>) -> bool {
        match self {
            Lookahead::Kind(kind) => kind == TokenKind::Any || kind == window.current.kind,
            Lookahead::Followed(kind, next) => {
                kind == window.current.kind && next.contains(&window.next.kind)
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Rule {
    /// Consumes exactly one token of the kind.
    Leaf(TokenKind),
    /// Picks a production by lookahead. Exact entries win over the wildcard.
    Transformable(&'static [(Lookahead, Production)]),
    /// Always expands into the same production.
    Expandable(Production),
    /// Optional continuation: `more` if the current token is accepted, else `end`.
    Tail {
        accepts: &'static [TokenKind],
        more: Production,
        end: Production,
    },
}

/// What happened to the token a rule was fed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feed {
    Consumed,
    /// The token was not used; it goes to the first child of the production.
    Expand(Production),
}

impl Rule {
    pub fn feed(self, symbol: Symbol, window: Window<'_>) -> Result<Feed, ParseError> {
        let current = window.current;
        match self {
            Rule::Leaf(kind) if kind == current.kind => Ok(Feed::Consumed),
            Rule::Leaf(kind) => Err(ParseError::UnexpectedToken {
                expected: kind,
                found: shown(current),
                line: current.line,
            }),
            Rule::Transformable(table) => table
                .iter()
                .find(|(lookahead, _)| !lookahead.is_wildcard() && lookahead.matches(window))
                .or_else(|| table.iter().find(|(lookahead, _)| lookahead.is_wildcard()))
                .map(|&(_, production)| Feed::Expand(production))
                .ok_or_else(|| {
                    let mut expected = Vec::new();
                    for (lookahead, _) in table {
                        let kind = lookahead.leading();
                        if !expected.contains(&kind) {
                            expected.push(kind);
                        }
                    }
                    ParseError::NoAlternative {
                        symbol,
                        expected,
                        found: shown(current),
                        line: current.line,
                    }
                }),
            Rule::Expandable(production) => Ok(Feed::Expand(production)),
            Rule::Tail { accepts, more, end } => {
                if accepts.contains(&current.kind) {
                    Ok(Feed::Expand(more))
                } else {
                    Ok(Feed::Expand(end))
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Pending {
    Symbol(Symbol),
    /// All children of the production are on the finished stack.
    Reduce(Production),
}

/// Parses `tokens` as a complete `root`, e.g. a whole program or one factor.
#[tracing::instrument(level = "trace", skip_all, fields(root = ?root))]
pub fn parse_as(root: Symbol, tokens: &[Token]) -> Result<Node, ParseError> {
    let eof = Token::new(TokenKind::Eof, "", tokens.last().map_or(1, |token| token.line));
    let token_at = |index: usize| tokens.get(index).unwrap_or(&eof);

    let mut cursor = 0;
    let mut pending = vec![Pending::Symbol(root)];
    let mut finished: Vec<Node> = Vec::new();

    while let Some(work) = pending.pop() {
        match work {
            Pending::Symbol(symbol) => {
                let window = Window {
                    current: token_at(cursor),
                    next: token_at(cursor + 1),
                };
                match symbol.rule().feed(symbol, window)? {
                    Feed::Consumed => {
                        trace!(token = %window.current, "consumed");
                        finished.push(Node::from_token(window.current.clone()));
                        cursor += 1;
                    }
                    Feed::Expand(production) => {
                        trace!(?symbol, ?production, "expanding");
                        pending.push(Pending::Reduce(production));
                        pending.extend(production.rhs().iter().rev().map(|&child| Pending::Symbol(child)));
                    }
                }
            }
            Pending::Reduce(production) => {
                let line = token_at(cursor).line;
                let arity = production.rhs().len();
                let Some(split) = finished.len().checked_sub(arity) else {
                    return Err(ParseError::Malformed {
                        production,
                        found: "too few children",
                        line,
                    });
                };
                let children = finished.split_off(split);
                let node = production
                    .assemble(children)
                    .map_err(|mismatch| ParseError::Malformed {
                        production,
                        found: mismatch.found,
                        line,
                    })?;
                finished.push(node);
            }
        }
    }

    let current = token_at(cursor);
    if current.kind != TokenKind::Eof {
        return Err(ParseError::TrailingInput {
            found: shown(current),
            line: current.line,
        });
    }

    match (finished.pop(), finished.is_empty()) {
        (Some(node), true) => Ok(node),
        _ => Err(ParseError::Malformed {
            production: Production::Program,
            found: "a detached subtree",
            line: current.line,
        }),
    }
}

/// Parses a whole program.
pub fn parse(tokens: &[Token]) -> Result<Program, ParseError> {
    let node = parse_as(Symbol::Program, tokens)?;
    let line = tokens.last().map_or(1, |token| token.line);
    Program::try_from(node).map_err(|other| ParseError::Malformed {
        production: Production::Program,
        found: other.name(),
        line,
    })
}
