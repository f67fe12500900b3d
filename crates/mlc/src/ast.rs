//! Typed syntax tree.
//!
//! Every grammar non-terminal has its own node type, and every node owns its
//! children. Optional or repeated continuations ("tails") hold
//! `Option<(operator, rest)>`, where `None` is the empty expansion. Types on
//! expression nodes start out as [`DataType::Invalid`] and are filled in by
//! [`crate::semantic`].

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use crate::tokenizer::{Token, TokenKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    /// Nothing to type, e.g. a tail with no operator.
    None,
    Int,
    Float,
    Bool,
    /// Not analyzed yet.
    #[default]
    Invalid,
}

impl DataType {
    pub fn is_resolved(self) -> bool {
        matches!(self, DataType::Int | DataType::Float | DataType::Bool)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::None => "None",
            DataType::Int => "Int",
            DataType::Float => "Float",
            DataType::Bool => "Bool",
            DataType::Invalid => "Invalid",
        };
        f.write_str(name)
    }
}

impl FromStr for DataType {
    type Err = String;

    /// Parses a type name as written in declarations.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integer" => Ok(DataType::Int),
            "float" => Ok(DataType::Float),
            "bool" => Ok(DataType::Bool),
            _ => Err(format!("unknown type {s}")),
        }
    }
}

/// A single untyped token: keyword, punctuation, operator or type name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Leaf {
    pub token: Token,
}

impl Leaf {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            token: Token::new(kind, text, line),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Identifier {
    pub token: Token,
    pub ty: DataType,
}

impl Identifier {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            token: Token::new(TokenKind::Identifier, name, line),
            ty: DataType::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.token.text
    }
}

/// An integer, float or boolean constant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Literal {
    pub token: Token,
    pub ty: DataType,
}

impl Literal {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            token: Token::new(kind, text, line),
            ty: DataType::default(),
        }
    }

    /// The type implied by the literal's lexical kind.
    pub fn lexical_type(&self) -> DataType {
        match self.token.kind {
            TokenKind::IntNumber => DataType::Int,
            TokenKind::FloatNumber => DataType::Float,
            TokenKind::BoolConst => DataType::Bool,
            _ => DataType::Invalid,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Number {
    pub literal: Literal,
    pub ty: DataType,
}

impl Number {
    pub fn new(literal: Literal) -> Self {
        Self {
            literal,
            ty: DataType::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum FactorKind {
    Identifier(Identifier),
    Number(Number),
    Bool(Literal),
    Not {
        operator: Leaf,
        operand: Box<Factor>,
    },
    Group {
        open: Leaf,
        expression: Box<Expression>,
        close: Leaf,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Factor {
    pub kind: FactorKind,
    pub ty: DataType,
}

impl Factor {
    pub fn new(kind: FactorKind) -> Self {
        Self {
            kind,
            ty: DataType::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Addend {
    pub factor: Factor,
    pub tail: AddendTail,
    pub ty: DataType,
}

impl Addend {
    pub fn new(factor: Factor, tail: AddendTail) -> Self {
        Self {
            factor,
            tail,
            ty: DataType::default(),
        }
    }
}

/// `(MulOp Addend)?`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AddendTail {
    pub rest: Option<(Leaf, Box<Addend>)>,
    pub ty: DataType,
}

impl AddendTail {
    pub fn new(operator: Leaf, rest: Addend) -> Self {
        Self {
            rest: Some((operator, Box::new(rest))),
            ty: DataType::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Operand {
    pub addend: Addend,
    pub tail: OperandTail,
    pub ty: DataType,
}

impl Operand {
    pub fn new(addend: Addend, tail: OperandTail) -> Self {
        Self {
            addend,
            tail,
            ty: DataType::default(),
        }
    }
}

/// `(AddOp Operand)?`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperandTail {
    pub rest: Option<(Leaf, Box<Operand>)>,
    pub ty: DataType,
}

impl OperandTail {
    pub fn new(operator: Leaf, rest: Operand) -> Self {
        Self {
            rest: Some((operator, Box::new(rest))),
            ty: DataType::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Expression {
    pub operand: Operand,
    pub tail: ExpressionTail,
    pub ty: DataType,
}

impl Expression {
    pub fn new(operand: Operand, tail: ExpressionTail) -> Self {
        Self {
            operand,
            tail,
            ty: DataType::default(),
        }
    }
}

/// `(RelationOp Operand)?`, a single comparison.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExpressionTail {
    pub rest: Option<(Leaf, Box<Operand>)>,
    pub ty: DataType,
}

impl ExpressionTail {
    pub fn new(operator: Leaf, rest: Operand) -> Self {
        Self {
            rest: Some((operator, Box::new(rest))),
            ty: DataType::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpressionList {
    pub head: Expression,
    pub tail: ExpressionListTail,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionListTail {
    pub rest: Option<(Leaf, Box<ExpressionList>)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdentifierList {
    pub head: Identifier,
    pub tail: IdentifierListTail,
}

impl IdentifierList {
    pub fn iter(&self) -> IdentifierListIter<'_> {
        IdentifierListIter { next: Some(self) }
    }

    pub fn iter_mut(&mut self) -> IdentifierListIterMut<'_> {
        IdentifierListIterMut { next: Some(self) }
    }
}

pub struct IdentifierListIter<'a> {
    next: Option<&'a IdentifierList>,
}

impl<'a> Iterator for IdentifierListIter<'a> {
    type Item = &'a Identifier;

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.next.take()?;
        self.next = list.tail.rest.as_ref().map(|(_, rest)| &**rest);
        Some(&list.head)
    }
}

pub struct IdentifierListIterMut<'a> {
    next: Option<&'a mut IdentifierList>,
}

impl<'a> Iterator for IdentifierListIterMut<'a> {
    type Item = &'a mut Identifier;

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.next.take()?;
        self.next = list.tail.rest.as_mut().map(|(_, rest)| &mut **rest);
        Some(&mut list.head)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdentifierListTail {
    pub rest: Option<(Leaf, Box<IdentifierList>)>,
}

/// `dim a, b integer` has a keyword and no colon, `a, b: integer` the reverse.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Declaration {
    pub keyword: Option<Leaf>,
    pub identifiers: IdentifierList,
    pub colon: Option<Leaf>,
    pub type_name: Leaf,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Assignment {
    pub target: Identifier,
    pub as_keyword: Leaf,
    pub value: Expression,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Condition {
    pub if_keyword: Leaf,
    pub condition: Expression,
    pub then_keyword: Leaf,
    pub then_branch: Box<Statement>,
    pub tail: ConditionTail,
}

/// `(ELSE Statement)?`
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConditionTail {
    pub rest: Option<(Leaf, Box<Statement>)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForLoop {
    pub for_keyword: Leaf,
    pub init: Assignment,
    pub to_keyword: Leaf,
    pub limit: Expression,
    pub do_keyword: Leaf,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WhileLoop {
    pub while_keyword: Leaf,
    pub condition: Expression,
    pub do_keyword: Leaf,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NestedBlock {
    pub begin: Leaf,
    pub statements: Box<StatementList>,
    pub end: Leaf,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatementList {
    pub head: Statement,
    pub tail: StatementListTail,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatementListTail {
    pub rest: Option<(Leaf, Box<StatementList>)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reading {
    pub read_keyword: Leaf,
    pub open: Leaf,
    pub identifiers: IdentifierList,
    pub close: Leaf,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Writing {
    pub write_keyword: Leaf,
    pub open: Leaf,
    pub expressions: ExpressionList,
    pub close: Leaf,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Statement {
    Assignment(Assignment),
    NestedBlock(NestedBlock),
    Condition(Condition),
    ForLoop(ForLoop),
    WhileLoop(WhileLoop),
    Reading(Reading),
    Writing(Writing),
    /// Separators in statement position, followed by the actual statement.
    /// `statement` is never itself a `Skip`.
    Skip {
        separators: VecDeque<Leaf>,
        statement: Box<Statement>,
    },
    /// Nothing before end of input or `end`.
    Empty,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ProgramItem {
    Declaration(Declaration),
    Statement(Statement),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Program {
    pub item: ProgramItem,
    pub tail: ProgramTail,
}

impl Program {
    /// The program's items in source order.
    pub fn items(&self) -> impl Iterator<Item = &ProgramItem> {
        std::iter::successors(Some(self), |program| {
            program.tail.rest.as_ref().map(|(_, rest)| &**rest)
        })
        .map(|program| &program.item)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgramTail {
    pub rest: Option<(Leaf, Box<Program>)>,
}

/// One `(leaf, node)` step of a chain, without the node's own tail.
#[derive(Serialize)]
struct Link<'a, N> {
    leaf: &'a Leaf,
    node: &'a N,
    #[serde(skip_serializing_if = "Option::is_none")]
    ty: Option<DataType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tail_ty: Option<DataType>,
}

/// Tails of right-recursive lists can be as long as the input. They are
/// unlinked on drop and serialized as a flat sequence of links so that
/// neither walks the chain on the call stack.
macro_rules! chain_tail {
    ($tail:ident, $node:ident . $head:ident, $types:expr) => {
        impl Drop for $tail {
            fn drop(&mut self) {
                let mut next = self.rest.take();
                while let Some((_, mut node)) = next {
                    next = node.tail.rest.take();
                }
            }
        }

        impl Serialize for $tail {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let types: fn(&$tail, &$node) -> Option<(DataType, DataType)> = $types;
                let mut links = serializer.serialize_seq(None)?;
                let mut tail = self;
                while let Some((leaf, node)) = &tail.rest {
                    let link_types = types(tail, node);
                    links.serialize_element(&Link {
                        leaf,
                        node: &node.$head,
                        ty: link_types.map(|(ty, _)| ty),
                        tail_ty: link_types.map(|(_, tail_ty)| tail_ty),
                    })?;
                    tail = &node.tail;
                }
                links.end()
            }
        }
    };
}

chain_tail!(AddendTail, Addend.factor, |tail, node| Some((node.ty, tail.ty)));
chain_tail!(OperandTail, Operand.addend, |tail, node| Some((node.ty, tail.ty)));
chain_tail!(ExpressionListTail, ExpressionList.head, |_, _| None);
chain_tail!(IdentifierListTail, IdentifierList.head, |_, _| None);
chain_tail!(StatementListTail, StatementList.head, |_, _| None);
chain_tail!(ProgramTail, Program.item, |_, _| None);

/// Generates [`Node`], the tagged union of every node type, along with the
/// conversions in and out of it.
macro_rules! syntax_nodes {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        #[derive(Clone, Debug, PartialEq, Serialize)]
        pub enum Node {
            $($variant($ty)),*
        }

        impl Node {
            /// The node as the uniform view used by tree walks.
            pub fn as_syntax(&self) -> &dyn crate::dump::SyntaxNode {
                match self {
                    $(Node::$variant(inner) => inner),*
                }
            }
        }

        $(
            impl From<$ty> for Node {
                fn from(node: $ty) -> Self {
                    Node::$variant(node)
                }
            }

            impl TryFrom<Node> for $ty {
                type Error = Node;

                fn try_from(node: Node) -> Result<Self, Node> {
                    match node {
                        Node::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

syntax_nodes! {
    Leaf(Leaf),
    Identifier(Identifier),
    Literal(Literal),
    Number(Number),
    Factor(Factor),
    Addend(Addend),
    AddendTail(AddendTail),
    Operand(Operand),
    OperandTail(OperandTail),
    Expression(Expression),
    ExpressionTail(ExpressionTail),
    ExpressionList(ExpressionList),
    ExpressionListTail(ExpressionListTail),
    IdentifierList(IdentifierList),
    IdentifierListTail(IdentifierListTail),
    Declaration(Declaration),
    Assignment(Assignment),
    Condition(Condition),
    ConditionTail(ConditionTail),
    ForLoop(ForLoop),
    WhileLoop(WhileLoop),
    NestedBlock(NestedBlock),
    StatementList(StatementList),
    StatementListTail(StatementListTail),
    Reading(Reading),
    Writing(Writing),
    Statement(Statement),
    ProgramItem(ProgramItem),
    Program(Program),
    ProgramTail(ProgramTail),
}

impl Node {
    /// Wraps a consumed token in the leaf type its kind calls for.
    pub fn from_token(token: Token) -> Self {
        match token.kind {
            TokenKind::Identifier => Node::Identifier(Identifier {
                token,
                ty: DataType::default(),
            }),
            TokenKind::IntNumber | TokenKind::FloatNumber | TokenKind::BoolConst => {
                Node::Literal(Literal {
                    token,
                    ty: DataType::default(),
                })
            }
            _ => Node::Leaf(Leaf { token }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.as_syntax().name()
    }
}
