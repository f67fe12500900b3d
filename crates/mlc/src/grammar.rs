//! The model language's grammar as data: symbols, their rules and the
//! productions they expand into, plus how each production's finished children
//! are assembled into a typed node.

use std::collections::VecDeque;
use std::fmt;

use crate::ast::{
    Addend, AddendTail, Assignment, Condition, ConditionTail, Declaration, Expression,
    ExpressionList, ExpressionListTail, ExpressionTail, Factor, FactorKind, ForLoop,
    IdentifierList, IdentifierListTail, Leaf, NestedBlock, Node, Number, Operand, OperandTail,
    Program, ProgramItem, ProgramTail, Reading, Statement, StatementList, StatementListTail,
    WhileLoop, Writing,
};
use crate::parser::{Lookahead, Rule};
use crate::tokenizer::TokenKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    Leaf(TokenKind),
    Program,
    ProgramItem,
    ProgramTail,
    Declaration,
    IdentifierList,
    IdentifierListTail,
    Statement,
    StatementList,
    StatementListTail,
    Assignment,
    Condition,
    ConditionTail,
    ForLoop,
    WhileLoop,
    NestedBlock,
    Reading,
    Writing,
    ExpressionList,
    ExpressionListTail,
    Expression,
    ExpressionTail,
    Operand,
    OperandTail,
    Addend,
    AddendTail,
    Factor,
    Number,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Leaf(kind) => write!(f, "{kind}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Production {
    Program,
    ProgramItemDeclaration,
    ProgramItemStatement,
    ProgramItemEmpty,
    ProgramTailMore,
    ProgramTailEnd,
    DeclarationKeyword,
    DeclarationColon,
    IdentifierList,
    IdentifierListMore,
    IdentifierListEnd,
    StatementAssignment,
    StatementBlock,
    StatementCondition,
    StatementFor,
    StatementWhile,
    StatementRead,
    StatementWrite,
    StatementSkip,
    StatementEmpty,
    Assignment,
    Condition,
    ConditionElse,
    ConditionEnd,
    ForLoop,
    WhileLoop,
    NestedBlock,
    StatementList,
    StatementListMore,
    StatementListEnd,
    Reading,
    Writing,
    ExpressionList,
    ExpressionListMore,
    ExpressionListEnd,
    Expression,
    ExpressionComparison,
    ExpressionTailEnd,
    Operand,
    OperandMore,
    OperandEnd,
    Addend,
    AddendMore,
    AddendEnd,
    FactorIdentifier,
    FactorNumber,
    FactorBool,
    FactorNot,
    FactorGroup,
    NumberInt,
    NumberFloat,
}

use TokenKind as T;

const PROGRAM_ITEM: &[(Lookahead, Production)] = &[
    (Lookahead::Kind(T::Dim), Production::ProgramItemDeclaration),
    (
        Lookahead::Followed(T::Identifier, &[T::Comma, T::Colon]),
        Production::ProgramItemDeclaration,
    ),
    (Lookahead::Kind(T::Separator), Production::ProgramItemEmpty),
    (Lookahead::Kind(T::Any), Production::ProgramItemStatement),
];

const DECLARATION: &[(Lookahead, Production)] = &[
    (Lookahead::Kind(T::Dim), Production::DeclarationKeyword),
    (Lookahead::Kind(T::Identifier), Production::DeclarationColon),
];

const STATEMENT: &[(Lookahead, Production)] = &[
    (Lookahead::Kind(T::Identifier), Production::StatementAssignment),
    (Lookahead::Kind(T::Begin), Production::StatementBlock),
    (Lookahead::Kind(T::If), Production::StatementCondition),
    (Lookahead::Kind(T::For), Production::StatementFor),
    (Lookahead::Kind(T::While), Production::StatementWhile),
    (Lookahead::Kind(T::Read), Production::StatementRead),
    (Lookahead::Kind(T::Write), Production::StatementWrite),
    (Lookahead::Kind(T::Separator), Production::StatementSkip),
    (Lookahead::Kind(T::Eof), Production::StatementEmpty),
    (Lookahead::Kind(T::End), Production::StatementEmpty),
];

const FACTOR: &[(Lookahead, Production)] = &[
    (Lookahead::Kind(T::Identifier), Production::FactorIdentifier),
    (Lookahead::Kind(T::IntNumber), Production::FactorNumber),
    (Lookahead::Kind(T::FloatNumber), Production::FactorNumber),
    (Lookahead::Kind(T::BoolConst), Production::FactorBool),
    (Lookahead::Kind(T::UnaryOp), Production::FactorNot),
    (Lookahead::Kind(T::OpenParen), Production::FactorGroup),
];

const NUMBER: &[(Lookahead, Production)] = &[
    (Lookahead::Kind(T::IntNumber), Production::NumberInt),
    (Lookahead::Kind(T::FloatNumber), Production::NumberFloat),
];

impl Symbol {
    pub fn rule(self) -> Rule {
        match self {
            Symbol::Leaf(kind) => Rule::Leaf(kind),
            Symbol::Program => Rule::Expandable(Production::Program),
            Symbol::ProgramItem => Rule::Transformable(PROGRAM_ITEM),
            Symbol::ProgramTail => Rule::Tail {
                accepts: &[T::Separator],
                more: Production::ProgramTailMore,
                end: Production::ProgramTailEnd,
            },
            Symbol::Declaration => Rule::Transformable(DECLARATION),
            Symbol::IdentifierList => Rule::Expandable(Production::IdentifierList),
            Symbol::IdentifierListTail => Rule::Tail {
                accepts: &[T::Comma],
                more: Production::IdentifierListMore,
                end: Production::IdentifierListEnd,
            },
            Symbol::Statement => Rule::Transformable(STATEMENT),
            Symbol::StatementList => Rule::Expandable(Production::StatementList),
            Symbol::StatementListTail => Rule::Tail {
                accepts: &[T::Separator],
                more: Production::StatementListMore,
                end: Production::StatementListEnd,
            },
            Symbol::Assignment => Rule::Expandable(Production::Assignment),
            Symbol::Condition => Rule::Expandable(Production::Condition),
            Symbol::ConditionTail => Rule::Tail {
                accepts: &[T::Else],
                more: Production::ConditionElse,
                end: Production::ConditionEnd,
            },
            Symbol::ForLoop => Rule::Expandable(Production::ForLoop),
            Symbol::WhileLoop => Rule::Expandable(Production::WhileLoop),
            Symbol::NestedBlock => Rule::Expandable(Production::NestedBlock),
            Symbol::Reading => Rule::Expandable(Production::Reading),
            Symbol::Writing => Rule::Expandable(Production::Writing),
            Symbol::ExpressionList => Rule::Expandable(Production::ExpressionList),
            Symbol::ExpressionListTail => Rule::Tail {
                accepts: &[T::Comma],
                more: Production::ExpressionListMore,
                end: Production::ExpressionListEnd,
            },
            Symbol::Expression => Rule::Expandable(Production::Expression),
            Symbol::ExpressionTail => Rule::Tail {
                accepts: &[T::RelationOp],
                more: Production::ExpressionComparison,
                end: Production::ExpressionTailEnd,
            },
            Symbol::Operand => Rule::Expandable(Production::Operand),
            Symbol::OperandTail => Rule::Tail {
                accepts: &[T::AddOp],
                more: Production::OperandMore,
                end: Production::OperandEnd,
            },
            Symbol::Addend => Rule::Expandable(Production::Addend),
            Symbol::AddendTail => Rule::Tail {
                accepts: &[T::MulOp],
                more: Production::AddendMore,
                end: Production::AddendEnd,
            },
            Symbol::Factor => Rule::Transformable(FACTOR),
            Symbol::Number => Rule::Transformable(NUMBER),
        }
    }
}

/// Finished children did not have the node types a production expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub found: &'static str,
}

/// Hands out a production's finished children in order, converted to the
/// node type the caller asks for.
struct Children {
    nodes: std::vec::IntoIter<Node>,
}

impl Children {
    fn next<N>(&mut self) -> Result<N, ShapeMismatch>
    where
        N: TryFrom<Node, Error = Node>,
    {
        let node = self.nodes.next().ok_or(ShapeMismatch { found: "nothing" })?;
        N::try_from(node).map_err(|other| ShapeMismatch { found: other.name() })
    }

    fn boxed<N>(&mut self) -> Result<Box<N>, ShapeMismatch>
    where
        N: TryFrom<Node, Error = Node>,
    {
        self.next().map(Box::new)
    }

    fn finish(mut self, node: Node) -> Result<Node, ShapeMismatch> {
        match self.nodes.next() {
            Some(extra) => Err(ShapeMismatch { found: extra.name() }),
            None => Ok(node),
        }
    }
}

impl Production {
    /// The symbols this production expands into, in source order.
    pub fn rhs(self) -> &'static [Symbol] {
        use Symbol as S;
        match self {
            Production::Program => &[S::ProgramItem, S::ProgramTail],
            Production::ProgramItemDeclaration => &[S::Declaration],
            Production::ProgramItemStatement => &[S::Statement],
            Production::ProgramTailMore => &[S::Leaf(T::Separator), S::Program],
            Production::DeclarationKeyword => &[S::Leaf(T::Dim), S::IdentifierList, S::Leaf(T::Type)],
            Production::DeclarationColon => {
                &[S::IdentifierList, S::Leaf(T::Colon), S::Leaf(T::Type)]
            }
            Production::IdentifierList => &[S::Leaf(T::Identifier), S::IdentifierListTail],
            Production::IdentifierListMore => &[S::Leaf(T::Comma), S::IdentifierList],
            Production::StatementAssignment => &[S::Assignment],
            Production::StatementBlock => &[S::NestedBlock],
            Production::StatementCondition => &[S::Condition],
            Production::StatementFor => &[S::ForLoop],
            Production::StatementWhile => &[S::WhileLoop],
            Production::StatementRead => &[S::Reading],
            Production::StatementWrite => &[S::Writing],
            Production::StatementSkip => &[S::Leaf(T::Separator), S::Statement],
            Production::Assignment => &[S::Leaf(T::Identifier), S::Leaf(T::As), S::Expression],
            Production::Condition => &[
                S::Leaf(T::If),
                S::Expression,
                S::Leaf(T::Then),
                S::Statement,
                S::ConditionTail,
            ],
            Production::ConditionElse => &[S::Leaf(T::Else), S::Statement],
            Production::ForLoop => &[
                S::Leaf(T::For),
                S::Assignment,
                S::Leaf(T::To),
                S::Expression,
                S::Leaf(T::Do),
                S::Statement,
            ],
            Production::WhileLoop => &[S::Leaf(T::While), S::Expression, S::Leaf(T::Do), S::Statement],
            Production::NestedBlock => &[S::Leaf(T::Begin), S::StatementList, S::Leaf(T::End)],
            Production::StatementList => &[S::Statement, S::StatementListTail],
            Production::StatementListMore => &[S::Leaf(T::Separator), S::StatementList],
            Production::Reading => &[
                S::Leaf(T::Read),
                S::Leaf(T::OpenParen),
                S::IdentifierList,
                S::Leaf(T::CloseParen),
            ],
            Production::Writing => &[
                S::Leaf(T::Write),
                S::Leaf(T::OpenParen),
                S::ExpressionList,
                S::Leaf(T::CloseParen),
            ],
            Production::ExpressionList => &[S::Expression, S::ExpressionListTail],
            Production::ExpressionListMore => &[S::Leaf(T::Comma), S::ExpressionList],
            Production::Expression => &[S::Operand, S::ExpressionTail],
            Production::ExpressionComparison => &[S::Leaf(T::RelationOp), S::Operand],
            Production::Operand => &[S::Addend, S::OperandTail],
            Production::OperandMore => &[S::Leaf(T::AddOp), S::Operand],
            Production::Addend => &[S::Factor, S::AddendTail],
            Production::AddendMore => &[S::Leaf(T::MulOp), S::Addend],
            Production::FactorIdentifier => &[S::Leaf(T::Identifier)],
            Production::FactorNumber => &[S::Number],
            Production::FactorBool => &[S::Leaf(T::BoolConst)],
            Production::FactorNot => &[S::Leaf(T::UnaryOp), S::Factor],
            Production::FactorGroup => &[S::Leaf(T::OpenParen), S::Expression, S::Leaf(T::CloseParen)],
            Production::NumberInt => &[S::Leaf(T::IntNumber)],
            Production::NumberFloat => &[S::Leaf(T::FloatNumber)],
            Production::ProgramItemEmpty
            | Production::ProgramTailEnd
            | Production::IdentifierListEnd
            | Production::StatementEmpty
            | Production::ConditionEnd
            | Production::StatementListEnd
            | Production::ExpressionListEnd
            | Production::ExpressionTailEnd
            | Production::OperandEnd
            | Production::AddendEnd => &[],
        }
    }

    /// Builds this production's node from its finished children, which must
    /// line up with [`Production::rhs`].
    pub fn assemble(self, children: Vec<Node>) -> Result<Node, ShapeMismatch> {
        let mut c = Children {
            nodes: children.into_iter(),
        };
        let node: Node = match self {
            Production::Program => Program {
                item: c.next()?,
                tail: c.next()?,
            }
            .into(),
            Production::ProgramItemDeclaration => ProgramItem::Declaration(c.next()?).into(),
            Production::ProgramItemStatement => ProgramItem::Statement(c.next()?).into(),
            Production::ProgramItemEmpty => ProgramItem::Statement(Statement::Empty).into(),
            Production::ProgramTailMore => ProgramTail {
                rest: Some((c.next()?, c.boxed()?)),
            }
            .into(),
            Production::ProgramTailEnd => ProgramTail::default().into(),
            Production::DeclarationKeyword => Declaration {
                keyword: Some(c.next()?),
                identifiers: c.next()?,
                colon: None,
                type_name: c.next()?,
            }
            .into(),
            Production::DeclarationColon => Declaration {
                keyword: None,
                identifiers: c.next()?,
                colon: Some(c.next()?),
                type_name: c.next()?,
            }
            .into(),
            Production::IdentifierList => IdentifierList {
                head: c.next()?,
                tail: c.next()?,
            }
            .into(),
            Production::IdentifierListMore => IdentifierListTail {
                rest: Some((c.next()?, c.boxed()?)),
            }
            .into(),
            Production::IdentifierListEnd => IdentifierListTail::default().into(),
            Production::StatementAssignment => Statement::Assignment(c.next()?).into(),
            Production::StatementBlock => Statement::NestedBlock(c.next()?).into(),
            Production::StatementCondition => Statement::Condition(c.next()?).into(),
            Production::StatementFor => Statement::ForLoop(c.next()?).into(),
            Production::StatementWhile => Statement::WhileLoop(c.next()?).into(),
            Production::StatementRead => Statement::Reading(c.next()?).into(),
            Production::StatementWrite => Statement::Writing(c.next()?).into(),
            Production::StatementSkip => {
                let separator: Leaf = c.next()?;
                let statement: Statement = c.next()?;
                match statement {
                    Statement::Skip {
                        mut separators,
                        statement,
                    } => {
                        separators.push_front(separator);
                        Statement::Skip {
                            separators,
                            statement,
                        }
                    }
                    statement => Statement::Skip {
                        separators: VecDeque::from([separator]),
                        statement: Box::new(statement),
                    },
                }
                .into()
            }
            Production::StatementEmpty => Statement::Empty.into(),
            Production::Assignment => Assignment {
                target: c.next()?,
                as_keyword: c.next()?,
                value: c.next()?,
            }
            .into(),
            Production::Condition => Condition {
                if_keyword: c.next()?,
                condition: c.next()?,
                then_keyword: c.next()?,
                then_branch: c.boxed()?,
                tail: c.next()?,
            }
            .into(),
            Production::ConditionElse => ConditionTail {
                rest: Some((c.next()?, c.boxed()?)),
            }
            .into(),
            Production::ConditionEnd => ConditionTail::default().into(),
            Production::ForLoop => ForLoop {
                for_keyword: c.next()?,
                init: c.next()?,
                to_keyword: c.next()?,
                limit: c.next()?,
                do_keyword: c.next()?,
                body: c.boxed()?,
            }
            .into(),
            Production::WhileLoop => WhileLoop {
                while_keyword: c.next()?,
                condition: c.next()?,
                do_keyword: c.next()?,
                body: c.boxed()?,
            }
            .into(),
            Production::NestedBlock => NestedBlock {
                begin: c.next()?,
                statements: c.boxed()?,
                end: c.next()?,
            }
            .into(),
            Production::StatementList => StatementList {
                head: c.next()?,
                tail: c.next()?,
            }
            .into(),
            Production::StatementListMore => StatementListTail {
                rest: Some((c.next()?, c.boxed()?)),
            }
            .into(),
            Production::StatementListEnd => StatementListTail::default().into(),
            Production::Reading => Reading {
                read_keyword: c.next()?,
                open: c.next()?,
                identifiers: c.next()?,
                close: c.next()?,
            }
            .into(),
            Production::Writing => Writing {
                write_keyword: c.next()?,
                open: c.next()?,
                expressions: c.next()?,
                close: c.next()?,
            }
            .into(),
            Production::ExpressionList => ExpressionList {
                head: c.next()?,
                tail: c.next()?,
            }
            .into(),
            Production::ExpressionListMore => ExpressionListTail {
                rest: Some((c.next()?, c.boxed()?)),
            }
            .into(),
            Production::ExpressionListEnd => ExpressionListTail::default().into(),
            Production::Expression => Expression::new(c.next()?, c.next()?).into(),
            Production::ExpressionComparison => ExpressionTail::new(c.next()?, c.next()?).into(),
            Production::ExpressionTailEnd => ExpressionTail::default().into(),
            Production::Operand => Operand::new(c.next()?, c.next()?).into(),
            Production::OperandMore => OperandTail::new(c.next()?, c.next()?).into(),
            Production::OperandEnd => OperandTail::default().into(),
            Production::Addend => Addend::new(c.next()?, c.next()?).into(),
            Production::AddendMore => AddendTail::new(c.next()?, c.next()?).into(),
            Production::AddendEnd => AddendTail::default().into(),
            Production::FactorIdentifier => Factor::new(FactorKind::Identifier(c.next()?)).into(),
            Production::FactorNumber => Factor::new(FactorKind::Number(c.next()?)).into(),
            Production::FactorBool => Factor::new(FactorKind::Bool(c.next()?)).into(),
            Production::FactorNot => Factor::new(FactorKind::Not {
                operator: c.next()?,
                operand: c.boxed()?,
            })
            .into(),
            Production::FactorGroup => Factor::new(FactorKind::Group {
                open: c.next()?,
                expression: c.boxed()?,
                close: c.next()?,
            })
            .into(),
            Production::NumberInt | Production::NumberFloat => Number::new(c.next()?).into(),
        };
        c.finish(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Identifier, Literal};
    use crate::dump::{dump, SyntaxNode};
    use crate::parser::{parse, parse_as, ParseError};
    use crate::tokenizer::{tokenize, Token};

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source).expect("source should tokenize")
    }

    fn parse_symbol(symbol: Symbol, source: &str) -> Node {
        parse_as(symbol, &tokens(source)).expect("source should parse")
    }

    fn int_factor(text: &str) -> Factor {
        Factor::new(FactorKind::Number(Number::new(Literal::new(
            T::IntNumber,
            text,
            1,
        ))))
    }

    #[test]
    fn product_dump() {
        let node = parse_symbol(Symbol::Addend, "1*3");
        insta::assert_snapshot!(dump(node.as_syntax()), @r"
        Addend (type = Invalid)
          Factor (type = Invalid)
            Number (type = Invalid)
              IntNumber { 1 } (type = Invalid)
          AddendTail (type = Invalid)
            MulOp { * }
            Addend (type = Invalid)
              Factor (type = Invalid)
                Number (type = Invalid)
                  IntNumber { 3 } (type = Invalid)
              AddendTail (type = Invalid)
        ");
    }

    #[test]
    fn product_matches_hand_built_tree() {
        let parsed = Addend::try_from(parse_symbol(Symbol::Addend, "1*3")).expect("addend");
        let built = Addend::new(
            int_factor("1"),
            AddendTail::new(
                Leaf::new(T::MulOp, "*", 1),
                Addend::new(int_factor("3"), AddendTail::default()),
            ),
        );
        assert_eq!(parsed, built);
        assert_eq!(dump(&parsed), dump(&built));
    }

    #[test]
    fn sum_is_right_recursive() {
        let operand = Operand::try_from(parse_symbol(Symbol::Operand, "1 + 2 - x")).expect("operand");
        let (plus, rest) = operand.tail.rest.as_ref().expect("first tail");
        assert_eq!(plus.token.text, "+");
        let (minus, last) = rest.tail.rest.as_ref().expect("second tail");
        assert_eq!(minus.token.text, "-");
        assert!(last.tail.rest.is_none());
        assert!(matches!(
            last.addend.factor.kind,
            FactorKind::Identifier(ref id) if id.name() == "x"
        ));
    }

    #[test]
    fn comparison_is_not_chainable() {
        let err = parse_as(Symbol::Expression, &tokens("a < b < c")).expect_err("chained");
        assert!(matches!(err, ParseError::TrailingInput { .. }));
    }

    #[test]
    fn nested_factors() {
        let factor = Factor::try_from(parse_symbol(Symbol::Factor, "not (a or true)")).expect("factor");
        let FactorKind::Not { operand, .. } = factor.kind else {
            panic!("expected not");
        };
        let FactorKind::Group { expression, .. } = operand.kind else {
            panic!("expected group");
        };
        let (or, rest) = expression.operand.tail.rest.as_ref().expect("or tail");
        assert_eq!(or.token.kind, T::AddOp);
        assert!(matches!(rest.addend.factor.kind, FactorKind::Bool(_)));
    }

    #[test]
    fn statement_kinds() {
        let cases = [
            ("a as 1", "Assignment"),
            ("begin a as 1 end", "NestedBlock"),
            ("if a then b as 1 else b as 2", "Condition"),
            ("for i as 1 to 10 do s as s + i", "ForLoop"),
            ("while a < 10 do a as a + 1", "WhileLoop"),
            ("read(a, b)", "Reading"),
            ("write(a, b + 1, 2.5)", "Writing"),
        ];
        for (source, expected) in cases {
            let statement =
                Statement::try_from(parse_symbol(Symbol::Statement, source)).expect("statement");
            let inner = statement.children();
            assert_eq!(inner[0].name(), expected, "{source}");
        }
    }

    #[test]
    fn condition_without_else() {
        let statement = Statement::try_from(parse_symbol(Symbol::Statement, "if a = b then c as a"))
            .expect("statement");
        let Statement::Condition(condition) = statement else {
            panic!("expected condition");
        };
        assert!(condition.tail.rest.is_none());
        assert!(condition.condition.tail.rest.is_some());
    }

    #[test]
    fn blank_lines_before_a_statement_collapse_into_one_skip() {
        let source = "if a then\n\n\nb as 1";
        let statement = Statement::try_from(parse_symbol(Symbol::Statement, source)).expect("statement");
        let Statement::Condition(condition) = statement else {
            panic!("expected condition");
        };
        let Statement::Skip {
            separators,
            statement,
        } = &*condition.then_branch
        else {
            panic!("expected skip");
        };
        let lines = separators.iter().map(|separator| separator.token.line).collect::<Vec<_>>();
        assert_eq!(lines, vec![1, 2, 3]);
        assert!(matches!(**statement, Statement::Assignment(_)));
    }

    #[test]
    fn block_spanning_lines() {
        let source = "begin\n  a as 1\n  b as 2\nend";
        let statement = Statement::try_from(parse_symbol(Symbol::Statement, source)).expect("block");
        let Statement::NestedBlock(block) = statement else {
            panic!("expected block");
        };
        assert_eq!(block.end.token.line, 4);
    }

    #[test]
    fn empty_block() {
        let statement = Statement::try_from(parse_symbol(Symbol::Statement, "begin end")).expect("block");
        let Statement::NestedBlock(block) = statement else {
            panic!("expected block");
        };
        assert_eq!(block.statements.head, Statement::Empty);
    }

    #[test]
    fn declaration_forms() {
        let program = parse(&tokens("dim a, b integer\nvar c float\nd, e: bool")).expect("parse");
        let declarations = program
            .items()
            .filter_map(|item| match item {
                ProgramItem::Declaration(declaration) => Some(declaration),
                ProgramItem::Statement(_) => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(declarations.len(), 3);
        assert!(declarations[0].keyword.is_some() && declarations[0].colon.is_none());
        assert_eq!(declarations[1].type_name.token.text, "float");
        assert!(declarations[2].keyword.is_none() && declarations[2].colon.is_some());
        let names = declarations[2]
            .identifiers
            .iter()
            .map(Identifier::name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["d", "e"]);
    }

    #[test]
    fn single_name_colon_declaration() {
        let program = parse(&tokens("a: integer")).expect("parse");
        assert!(matches!(program.item, ProgramItem::Declaration(_)));
    }

    #[test]
    fn declaration_without_type_fails() {
        let err = parse(&tokens("dim a, b\na as 1")).expect_err("missing type");
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                expected: T::Type,
                found: "\"\\n\"".to_string(),
                line: 1,
            }
        );
    }

    #[test]
    fn missing_then_is_reported_with_line() {
        let err = parse(&tokens("dim a integer\nif a > 1 a as 2")).expect_err("missing then");
        assert_eq!(err.line(), 2);
        assert!(err.to_string().starts_with("then expected"));
    }

    #[test]
    fn program_skips_blank_lines() {
        let program = parse(&tokens("\n\ndim a integer\n\n\na as 1\n\n")).expect("parse");
        let statements = program
            .items()
            .filter(|item| matches!(item, ProgramItem::Statement(Statement::Assignment(_))))
            .count();
        assert_eq!(statements, 1);
    }

    #[test]
    fn every_rule_table_entry_has_a_production() {
        for table in [PROGRAM_ITEM, DECLARATION, STATEMENT, FACTOR, NUMBER] {
            for (_, production) in table {
                let empty = matches!(
                    production,
                    Production::StatementEmpty | Production::ProgramItemEmpty
                );
                assert_eq!(production.rhs().is_empty(), empty, "{production:?}");
            }
        }
    }
}
