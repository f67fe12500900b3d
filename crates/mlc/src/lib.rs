//! Front end for the `dim` model language: a tokenizer, a table-driven parser
//! producing a typed syntax tree, and a semantic analyzer that checks
//! declarations and types.
//!
//! ```
//! let program = mlc::parse_and_analyze("dim a integer\na as 1 + 2\n").unwrap();
//! assert_eq!(program.items().count(), 3);
//! ```

pub mod ast;
pub mod diagnostics;
pub mod dump;
pub mod grammar;
pub mod parser;
pub mod semantic;
pub mod tokenizer;

pub use ast::{DataType, Node, Program};
pub use dump::{dump, SyntaxNode};
pub use grammar::Symbol;
pub use parser::{parse, parse_as, ParseError};
pub use semantic::{analyze, SemanticError};
pub use tokenizer::{classify, tokenize, LexError, Token, TokenKind};

/// The first error of whichever stage failed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FrontendError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

impl FrontendError {
    pub fn line(&self) -> usize {
        match self {
            FrontendError::Lex(err) => err.line(),
            FrontendError::Parse(err) => err.line(),
            FrontendError::Semantic(err) => err.line(),
        }
    }
}

/// Tokenizes, parses and analyzes `source`.
#[tracing::instrument(level = "trace", skip_all)]
pub fn parse_and_analyze(source: &str) -> Result<Program, FrontendError> {
    let tokens = tokenize(source)?;
    let program = parse(&tokens)?;
    Ok(analyze(program)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ProgramItem, Statement};

    #[test]
    fn stages_report_their_own_errors() {
        let err = parse_and_analyze("{abc").expect_err("unterminated comment");
        assert!(matches!(err, FrontendError::Lex(LexError::UnterminatedComment { line: 1 })));

        let err = parse_and_analyze("dim a integer\nbegin a as 1").expect_err("missing end");
        assert!(matches!(err, FrontendError::Parse(_)));
        assert_eq!(err.line(), 2);

        let err = parse_and_analyze("a as 1").expect_err("undeclared");
        assert!(matches!(err, FrontendError::Semantic(SemanticError::Undeclared { .. })));
    }

    #[test]
    fn accepts_a_complete_program() {
        let source = "{ sums the first n numbers }
dim n, i, sum integer
var mean float
read(n)
sum as 0
for i as 1 to n do sum as sum + i
if n > 0 then mean as sum / n else mean as 0
write(sum, mean)
";
        let program = parse_and_analyze(source).expect("valid program");
        let text = dump(&program);
        assert!(text.contains("ForLoop"));
        assert!(!text.contains("(type = Invalid)"));
    }

    fn on_small_stack(work: impl FnOnce() + Send + 'static) {
        std::thread::Builder::new()
            .stack_size(8 << 20)
            .spawn(work)
            .expect("spawn worker thread")
            .join()
            .expect("worker thread");
    }

    #[test]
    fn long_sum_is_analyzed_and_dropped() {
        let source = format!("a: integer\na as 1{}", "+1".repeat(100_000));
        on_small_stack(move || {
            let program = parse_and_analyze(&source).expect("valid program");
            let Some(ProgramItem::Statement(Statement::Assignment(assignment))) =
                program.items().nth(1)
            else {
                panic!("expected assignment");
            };
            assert_eq!(assignment.value.ty, DataType::Int);
        });
    }

    #[test]
    fn long_program_is_analyzed_serialized_and_dropped() {
        let source = format!("a: integer\n{}", "a as 1\n".repeat(200_000));
        on_small_stack(move || {
            let program = parse_and_analyze(&source).expect("valid program");
            assert_eq!(program.items().count(), 200_002);
            let json = serde_json::to_value(&program).expect("serialize");
            assert_eq!(json["tail"].as_array().map(Vec::len), Some(200_001));
        });
    }

    #[test]
    fn many_blank_lines_inside_a_block() {
        let source = format!("a: integer\nbegin{}a as 1\nend", "\n".repeat(200_000));
        on_small_stack(move || {
            parse_and_analyze(&source).expect("valid program");
        });
    }

    #[test]
    fn error_messages_carry_the_line() {
        let err = parse_and_analyze("x: integer\n\nx as true").expect_err("bool into int");
        assert_eq!(err.to_string(), "cannot assign Bool to variable x of type Int (line 3)");
    }
}
