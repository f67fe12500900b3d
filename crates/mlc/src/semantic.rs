//! Declaration and type checking.
//!
//! The analyzer walks a parsed [`Program`] children-first, records every
//! declaration in a [`SymbolTable`] and writes the resolved [`DataType`] into
//! each expression node. Binary operators are typed by looking up
//! `(left, operator, right)` in a [`CompatibilityMatrix`]. The first violation
//! stops the walk.

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::{debug, trace};

use crate::ast::{
    Addend, Assignment, Condition, DataType, Declaration, Expression, ExpressionList, Factor,
    FactorKind, ForLoop, Identifier, IdentifierList, Leaf, NestedBlock, Operand, Program,
    ProgramItem, Reading, Statement, StatementList, WhileLoop, Writing,
};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SemanticError {
    #[error("Variable {name} is redeclared (line {line})")]
    Redeclared { name: String, line: usize },
    #[error("Variable {name} is undeclared (line {line})")]
    Undeclared { name: String, line: usize },
    #[error("operator {operator} is not defined for {left} and {right} (line {line})")]
    IncompatibleOperands {
        left: DataType,
        operator: String,
        right: DataType,
        line: usize,
    },
    #[error("cannot assign {value} to variable {name} of type {target} (line {line})")]
    IncompatibleAssignment {
        name: String,
        target: DataType,
        value: DataType,
        line: usize,
    },
    #[error("operator {operator} is not defined for {operand} (line {line})")]
    UndefinedUnary {
        operator: String,
        operand: DataType,
        line: usize,
    },
    #[error("unknown type {name} (line {line})")]
    UnknownType { name: String, line: usize },
}

impl SemanticError {
    pub fn line(&self) -> usize {
        match self {
            SemanticError::Redeclared { line, .. }
            | SemanticError::Undeclared { line, .. }
            | SemanticError::IncompatibleOperands { line, .. }
            | SemanticError::IncompatibleAssignment { line, .. }
            | SemanticError::UndefinedUnary { line, .. }
            | SemanticError::UnknownType { line, .. } => *line,
        }
    }
}

/// Declared variables and their types.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, DataType>,
}

impl SymbolTable {
    pub fn declare(&mut self, identifier: &Identifier, ty: DataType) -> Result<(), SemanticError> {
        if self.symbols.contains_key(identifier.name()) {
            return Err(SemanticError::Redeclared {
                name: identifier.name().to_string(),
                line: identifier.token.line,
            });
        }
        self.symbols.insert(identifier.name().to_string(), ty);
        Ok(())
    }

    pub fn lookup(&self, identifier: &Identifier) -> Result<DataType, SemanticError> {
        self.symbols
            .get(identifier.name())
            .copied()
            .ok_or_else(|| SemanticError::Undeclared {
                name: identifier.name().to_string(),
                line: identifier.token.line,
            })
    }

    pub fn get(&self, name: &str) -> Option<DataType> {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

const RELATIONS: [&str; 6] = ["=", "<>", "<", "<=", ">", ">="];
const ARITHMETIC: [&str; 4] = ["+", "-", "*", "/"];
const LOGICAL: [&str; 2] = ["and", "or"];
const NUMERIC: [DataType; 2] = [DataType::Int, DataType::Float];

/// Result types of binary operators, keyed by operator text and operand types.
#[derive(Clone, Debug)]
pub struct CompatibilityMatrix {
    rules: HashMap<&'static str, HashMap<(DataType, DataType), DataType>>,
}

static SHARED_MATRIX: LazyLock<CompatibilityMatrix> = LazyLock::new(CompatibilityMatrix::new);

impl CompatibilityMatrix {
    pub fn new() -> Self {
        let mut matrix = Self {
            rules: HashMap::new(),
        };
        for operator in RELATIONS {
            for left in NUMERIC {
                for right in NUMERIC {
                    matrix.insert(left, operator, right, DataType::Bool);
                }
            }
        }
        for operator in ["=", "<>"] {
            matrix.insert(DataType::Bool, operator, DataType::Bool, DataType::Bool);
        }
        for operator in ARITHMETIC {
            matrix.insert(DataType::Int, operator, DataType::Int, DataType::Int);
            matrix.insert(DataType::Float, operator, DataType::Float, DataType::Float);
            matrix.insert(DataType::Int, operator, DataType::Float, DataType::Float);
            matrix.insert(DataType::Float, operator, DataType::Int, DataType::Float);
        }
        for operator in LOGICAL {
            matrix.insert(DataType::Bool, operator, DataType::Bool, DataType::Bool);
            matrix.insert(DataType::Int, operator, DataType::Int, DataType::Int);
        }
        matrix
    }

    /// The process-wide matrix, built on first use.
    pub fn shared() -> &'static CompatibilityMatrix {
        &SHARED_MATRIX
    }

    pub fn insert(&mut self, left: DataType, operator: &'static str, right: DataType, result: DataType) {
        self.rules.entry(operator).or_default().insert((left, right), result);
    }

    pub fn result(&self, left: DataType, operator: &str, right: DataType) -> Option<DataType> {
        self.rules.get(operator)?.get(&(left, right)).copied()
    }
}

impl Default for CompatibilityMatrix {
    fn default() -> Self {
        Self::new()
    }
}

fn assignable(target: DataType, value: DataType) -> bool {
    target == value || (target == DataType::Float && value == DataType::Int)
}

/// A node whose tail continues with another node of the same type.
trait Chain: Sized {
    fn rest(&mut self) -> Option<(&Leaf, &mut Self)>;
    fn set_types(&mut self, ty: DataType, tail: DataType);
}

impl Chain for Operand {
    fn rest(&mut self) -> Option<(&Leaf, &mut Self)> {
        self.tail.rest.as_mut().map(|(operator, next)| (&*operator, &mut **next))
    }

    fn set_types(&mut self, ty: DataType, tail: DataType) {
        self.ty = ty;
        self.tail.ty = tail;
    }
}

impl Chain for Addend {
    fn rest(&mut self) -> Option<(&Leaf, &mut Self)> {
        self.tail.rest.as_mut().map(|(operator, next)| (&*operator, &mut **next))
    }

    fn set_types(&mut self, ty: DataType, tail: DataType) {
        self.ty = ty;
        self.tail.ty = tail;
    }
}

pub struct Analyzer<'m> {
    symbols: SymbolTable,
    matrix: &'m CompatibilityMatrix,
}

impl Analyzer<'static> {
    pub fn new() -> Self {
        Self::with_matrix(CompatibilityMatrix::shared())
    }
}

impl Default for Analyzer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'m> Analyzer<'m> {
    pub fn with_matrix(matrix: &'m CompatibilityMatrix) -> Self {
        Self {
            symbols: SymbolTable::default(),
            matrix,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn program(&mut self, program: &mut Program) -> Result<(), SemanticError> {
        let mut current = Some(program);
        while let Some(program) = current {
            match &mut program.item {
                ProgramItem::Declaration(declaration) => self.declaration(declaration)?,
                ProgramItem::Statement(statement) => self.statement(statement)?,
            }
            current = program.tail.rest.as_mut().map(|(_, rest)| &mut **rest);
        }
        Ok(())
    }

    fn declaration(&mut self, declaration: &mut Declaration) -> Result<(), SemanticError> {
        let type_name = &declaration.type_name.token;
        let ty = type_name
            .text
            .parse::<DataType>()
            .map_err(|_| SemanticError::UnknownType {
                name: type_name.text.clone(),
                line: type_name.line,
            })?;
        for identifier in declaration.identifiers.iter_mut() {
            self.symbols.declare(identifier, ty)?;
            identifier.ty = ty;
            debug!(name = identifier.name(), %ty, "declared variable");
        }
        Ok(())
    }

    fn statement(&mut self, statement: &mut Statement) -> Result<(), SemanticError> {
        match statement {
            Statement::Assignment(assignment) => self.assignment(assignment),
            Statement::NestedBlock(block) => self.block(block),
            Statement::Condition(condition) => self.condition(condition),
            Statement::ForLoop(for_loop) => self.for_loop(for_loop),
            Statement::WhileLoop(while_loop) => self.while_loop(while_loop),
            Statement::Reading(reading) => self.reading(reading),
            Statement::Writing(writing) => self.writing(writing),
            Statement::Skip { statement, .. } => self.statement(statement),
            Statement::Empty => Ok(()),
        }
    }

    fn assignment(&mut self, assignment: &mut Assignment) -> Result<(), SemanticError> {
        let target = self.identifier(&mut assignment.target)?;
        let value = self.expression(&mut assignment.value)?;
        if !assignable(target, value) {
            return Err(SemanticError::IncompatibleAssignment {
                name: assignment.target.name().to_string(),
                target,
                value,
                line: assignment.as_keyword.token.line,
            });
        }
        Ok(())
    }

    fn block(&mut self, block: &mut NestedBlock) -> Result<(), SemanticError> {
        let mut current: Option<&mut StatementList> = Some(&mut *block.statements);
        while let Some(list) = current {
            self.statement(&mut list.head)?;
            current = list.tail.rest.as_mut().map(|(_, rest)| &mut **rest);
        }
        Ok(())
    }

    fn condition(&mut self, condition: &mut Condition) -> Result<(), SemanticError> {
        self.expression(&mut condition.condition)?;
        self.statement(&mut condition.then_branch)?;
        if let Some((_, otherwise)) = &mut condition.tail.rest {
            self.statement(otherwise)?;
        }
        Ok(())
    }

    fn for_loop(&mut self, for_loop: &mut ForLoop) -> Result<(), SemanticError> {
        self.assignment(&mut for_loop.init)?;
        self.expression(&mut for_loop.limit)?;
        self.statement(&mut for_loop.body)
    }

    fn while_loop(&mut self, while_loop: &mut WhileLoop) -> Result<(), SemanticError> {
        self.expression(&mut while_loop.condition)?;
        self.statement(&mut while_loop.body)
    }

    fn reading(&mut self, reading: &mut Reading) -> Result<(), SemanticError> {
        self.identifiers(&mut reading.identifiers)
    }

    fn identifiers(&mut self, identifiers: &mut IdentifierList) -> Result<(), SemanticError> {
        for identifier in identifiers.iter_mut() {
            self.identifier(identifier)?;
        }
        Ok(())
    }

    fn writing(&mut self, writing: &mut Writing) -> Result<(), SemanticError> {
        let mut current: Option<&mut ExpressionList> = Some(&mut writing.expressions);
        while let Some(list) = current {
            self.expression(&mut list.head)?;
            current = list.tail.rest.as_mut().map(|(_, rest)| &mut **rest);
        }
        Ok(())
    }

    fn identifier(&mut self, identifier: &mut Identifier) -> Result<DataType, SemanticError> {
        identifier.ty = self.symbols.lookup(identifier)?;
        Ok(identifier.ty)
    }

    fn expression(&mut self, expression: &mut Expression) -> Result<DataType, SemanticError> {
        let left = self.operand(&mut expression.operand)?;
        expression.tail.ty = DataType::None;
        expression.ty = left;
        if let Some((operator, right)) = &mut expression.tail.rest {
            let right = self.operand(right)?;
            expression.tail.ty = right;
            expression.ty = self.combine(left, operator, right)?;
        }
        Ok(expression.ty)
    }

    fn operand(&mut self, operand: &mut Operand) -> Result<DataType, SemanticError> {
        self.chain(operand, |analyzer, operand| analyzer.addend(&mut operand.addend))
    }

    fn addend(&mut self, addend: &mut Addend) -> Result<DataType, SemanticError> {
        self.chain(addend, |analyzer, addend| analyzer.factor(&mut addend.factor))
    }

    /// Types a right-recursive chain `h0 op0 (h1 op1 (h2 ...))` without
    /// recursing: heads left to right first, then the operators from the
    /// innermost pair outwards.
    fn chain<N: Chain>(
        &mut self,
        first: &mut N,
        head: fn(&mut Self, &mut N) -> Result<DataType, SemanticError>,
    ) -> Result<DataType, SemanticError> {
        let mut heads = Vec::new();
        let mut operators = Vec::new();
        let mut current = Some(&mut *first);
        while let Some(node) = current {
            heads.push(head(self, node)?);
            current = node.rest().map(|(operator, next)| {
                operators.push(operator.clone());
                next
            });
        }

        let mut types = heads.clone();
        for (index, operator) in operators.iter().enumerate().rev() {
            types[index] = self.combine(heads[index], operator, types[index + 1])?;
        }

        let mut current = Some(first);
        let mut index = 0;
        while let Some(node) = current {
            let tail = types.get(index + 1).copied().unwrap_or(DataType::None);
            node.set_types(types[index], tail);
            index += 1;
            current = node.rest().map(|(_, next)| next);
        }
        Ok(types[0])
    }

    fn factor(&mut self, factor: &mut Factor) -> Result<DataType, SemanticError> {
        factor.ty = match &mut factor.kind {
            FactorKind::Identifier(identifier) => self.identifier(identifier)?,
            FactorKind::Number(number) => {
                number.literal.ty = number.literal.lexical_type();
                number.ty = number.literal.ty;
                number.ty
            }
            FactorKind::Bool(literal) => {
                literal.ty = literal.lexical_type();
                literal.ty
            }
            FactorKind::Not { operator, operand } => {
                let ty = self.factor(operand)?;
                if ty == DataType::Float {
                    return Err(SemanticError::UndefinedUnary {
                        operator: operator.token.text.clone(),
                        operand: ty,
                        line: operator.token.line,
                    });
                }
                ty
            }
            FactorKind::Group { expression, .. } => self.expression(expression)?,
        };
        Ok(factor.ty)
    }

    fn combine(&self, left: DataType, operator: &Leaf, right: DataType) -> Result<DataType, SemanticError> {
        let text = operator.token.text.as_str();
        let result = self.matrix.result(left, text, right);
        trace!(%left, operator = text, %right, ?result, "combined operands");
        result.ok_or_else(|| SemanticError::IncompatibleOperands {
            left,
            operator: text.to_string(),
            right,
            line: operator.token.line,
        })
    }
}

/// Checks `program` and returns it with every expression typed.
#[tracing::instrument(level = "trace", skip_all)]
pub fn analyze(mut program: Program) -> Result<Program, SemanticError> {
    let mut analyzer = Analyzer::new();
    analyzer.program(&mut program)?;
    debug!(variables = analyzer.symbols().len(), "analysis finished");
    Ok(program)
}
