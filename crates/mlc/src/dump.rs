//! Uniform view over syntax nodes and the indented text dump built on it.

use std::fmt::Write as _;

use crate::ast::{
    Addend, AddendTail, Assignment, Condition, ConditionTail, DataType, Declaration, Expression,
    ExpressionList, ExpressionListTail, ExpressionTail, Factor, FactorKind, ForLoop, Identifier,
    IdentifierList, IdentifierListTail, Leaf, Literal, NestedBlock, Node, Number, Operand,
    OperandTail, Program, ProgramItem, ProgramTail, Reading, Statement, StatementList,
    StatementListTail, WhileLoop, Writing,
};
use crate::tokenizer::Token;

pub trait SyntaxNode {
    fn name(&self) -> &'static str;

    /// The token of a single-token node.
    fn token(&self) -> Option<&Token> {
        None
    }

    /// `None` for nodes that carry no type at all.
    fn data_type(&self) -> Option<DataType> {
        None
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        Vec::new()
    }
}

/// Renders `root` and its descendants, one node per line, two spaces of
/// indentation per level:
///
/// ```text
/// Addend (type = Invalid)
///   Factor (type = Invalid)
///     Number (type = Invalid)
///       IntNumber { 1 } (type = Invalid)
///   AddendTail (type = Invalid)
/// ```
pub fn dump(root: &dyn SyntaxNode) -> String {
    let mut out = String::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if !out.is_empty() {
            out.push('\n');
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(node.name());
        if let Some(token) = node.token() {
            let _ = write!(out, " {{ {} }}", escape(&token.text));
        }
        if let Some(ty) = node.data_type() {
            let _ = write!(out, " (type = {ty})");
        }
        stack.extend(node.children().into_iter().rev().map(|child| (child, depth + 1)));
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('\n', "\\n").replace('\t', "\\t")
}

fn push_rest<'a, O, R>(children: &mut Vec<&'a dyn SyntaxNode>, rest: &'a Option<(O, Box<R>)>)
where
    O: SyntaxNode,
    R: SyntaxNode,
{
    if let Some((operator, rest)) = rest {
        children.push(operator);
        children.push(&**rest);
    }
}

impl SyntaxNode for Leaf {
    fn name(&self) -> &'static str {
        self.token.kind.name()
    }

    fn token(&self) -> Option<&Token> {
        Some(&self.token)
    }
}

impl SyntaxNode for Identifier {
    fn name(&self) -> &'static str {
        "Identifier"
    }

    fn token(&self) -> Option<&Token> {
        Some(&self.token)
    }

    fn data_type(&self) -> Option<DataType> {
        Some(self.ty)
    }
}

impl SyntaxNode for Literal {
    fn name(&self) -> &'static str {
        self.token.kind.name()
    }

    fn token(&self) -> Option<&Token> {
        Some(&self.token)
    }

    fn data_type(&self) -> Option<DataType> {
        Some(self.ty)
    }
}

impl SyntaxNode for Number {
    fn name(&self) -> &'static str {
        "Number"
    }

    fn data_type(&self) -> Option<DataType> {
        Some(self.ty)
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![&self.literal]
    }
}

impl SyntaxNode for Factor {
    fn name(&self) -> &'static str {
        "Factor"
    }

    fn data_type(&self) -> Option<DataType> {
        Some(self.ty)
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        match &self.kind {
            FactorKind::Identifier(identifier) => vec![identifier],
            FactorKind::Number(number) => vec![number],
            FactorKind::Bool(literal) => vec![literal],
            FactorKind::Not { operator, operand } => vec![operator, &**operand],
            FactorKind::Group {
                open,
                expression,
                close,
            } => vec![open, &**expression, close],
        }
    }
}

/// `Head Tail` pairs: a typed node made of a head and a tail.
macro_rules! typed_pair {
    ($ty:ty, $name:literal, $head:ident, $tail:ident) => {
        impl SyntaxNode for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn data_type(&self) -> Option<DataType> {
                Some(self.ty)
            }

            fn children(&self) -> Vec<&dyn SyntaxNode> {
                vec![&self.$head, &self.$tail]
            }
        }
    };
}

typed_pair!(Addend, "Addend", factor, tail);
typed_pair!(Operand, "Operand", addend, tail);
typed_pair!(Expression, "Expression", operand, tail);

/// Optional continuations: `rest: Option<(operator, Box<next>)>`.
macro_rules! tail_node {
    ($ty:ty, $name:literal, typed) => {
        impl SyntaxNode for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn data_type(&self) -> Option<DataType> {
                Some(self.ty)
            }

            fn children(&self) -> Vec<&dyn SyntaxNode> {
                let mut children = Vec::new();
                push_rest(&mut children, &self.rest);
                children
            }
        }
    };
    ($ty:ty, $name:literal) => {
        impl SyntaxNode for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn children(&self) -> Vec<&dyn SyntaxNode> {
                let mut children = Vec::new();
                push_rest(&mut children, &self.rest);
                children
            }
        }
    };
}

tail_node!(AddendTail, "AddendTail", typed);
tail_node!(OperandTail, "OperandTail", typed);
tail_node!(ExpressionTail, "ExpressionTail", typed);
tail_node!(ExpressionListTail, "ExpressionListTail");
tail_node!(IdentifierListTail, "IdentifierListTail");
tail_node!(StatementListTail, "StatementListTail");
tail_node!(ConditionTail, "ConditionTail");
tail_node!(ProgramTail, "ProgramTail");

impl SyntaxNode for ExpressionList {
    fn name(&self) -> &'static str {
        "ExpressionList"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![&self.head, &self.tail]
    }
}

impl SyntaxNode for IdentifierList {
    fn name(&self) -> &'static str {
        "IdentifierList"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![&self.head, &self.tail]
    }
}

impl SyntaxNode for StatementList {
    fn name(&self) -> &'static str {
        "StatementList"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![&self.head, &self.tail]
    }
}

impl SyntaxNode for Declaration {
    fn name(&self) -> &'static str {
        "Declaration"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        let mut children: Vec<&dyn SyntaxNode> = Vec::new();
        if let Some(keyword) = &self.keyword {
            children.push(keyword);
        }
        children.push(&self.identifiers);
        if let Some(colon) = &self.colon {
            children.push(colon);
        }
        children.push(&self.type_name);
        children
    }
}

impl SyntaxNode for Assignment {
    fn name(&self) -> &'static str {
        "Assignment"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![&self.target, &self.as_keyword, &self.value]
    }
}

impl SyntaxNode for Condition {
    fn name(&self) -> &'static str {
        "Condition"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![
            &self.if_keyword,
            &self.condition,
            &self.then_keyword,
            &*self.then_branch,
            &self.tail,
        ]
    }
}

impl SyntaxNode for ForLoop {
    fn name(&self) -> &'static str {
        "ForLoop"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![
            &self.for_keyword,
            &self.init,
            &self.to_keyword,
            &self.limit,
            &self.do_keyword,
            &*self.body,
        ]
    }
}

impl SyntaxNode for WhileLoop {
    fn name(&self) -> &'static str {
        "WhileLoop"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![
            &self.while_keyword,
            &self.condition,
            &self.do_keyword,
            &*self.body,
        ]
    }
}

impl SyntaxNode for NestedBlock {
    fn name(&self) -> &'static str {
        "NestedBlock"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![&self.begin, &*self.statements, &self.end]
    }
}

impl SyntaxNode for Reading {
    fn name(&self) -> &'static str {
        "Reading"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![&self.read_keyword, &self.open, &self.identifiers, &self.close]
    }
}

impl SyntaxNode for Writing {
    fn name(&self) -> &'static str {
        "Writing"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![&self.write_keyword, &self.open, &self.expressions, &self.close]
    }
}

impl SyntaxNode for Statement {
    fn name(&self) -> &'static str {
        "Statement"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        match self {
            Statement::Assignment(inner) => vec![inner],
            Statement::NestedBlock(inner) => vec![inner],
            Statement::Condition(inner) => vec![inner],
            Statement::ForLoop(inner) => vec![inner],
            Statement::WhileLoop(inner) => vec![inner],
            Statement::Reading(inner) => vec![inner],
            Statement::Writing(inner) => vec![inner],
            Statement::Skip {
                separators,
                statement,
            } => {
                let mut children: Vec<&dyn SyntaxNode> = Vec::new();
                children.extend(separators.iter().map(|separator| separator as &dyn SyntaxNode));
                children.push(&**statement);
                children
            }
            Statement::Empty => Vec::new(),
        }
    }
}

impl SyntaxNode for ProgramItem {
    fn name(&self) -> &'static str {
        "ProgramItem"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        match self {
            ProgramItem::Declaration(inner) => vec![inner],
            ProgramItem::Statement(inner) => vec![inner],
        }
    }
}

impl SyntaxNode for Program {
    fn name(&self) -> &'static str {
        "Program"
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        vec![&self.item, &self.tail]
    }
}

impl SyntaxNode for Node {
    fn name(&self) -> &'static str {
        self.as_syntax().name()
    }

    fn token(&self) -> Option<&Token> {
        self.as_syntax().token()
    }

    fn data_type(&self) -> Option<DataType> {
        self.as_syntax().data_type()
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        self.as_syntax().children()
    }
}
