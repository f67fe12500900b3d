use std::collections::HashMap;
use std::fmt;
use std::io::IsTerminal;
use std::ops::Range;
use std::path::Path;

use ariadne::{sources, Config, Label, Report, ReportKind};

use crate::parser::ParseError;
use crate::semantic::SemanticError;
use crate::tokenizer::LexError;
use crate::FrontendError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticStage {
    Tokenize,
    Parse,
    Analyze,
    Io,
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticStage::Tokenize => "tokenize",
            DiagnosticStage::Parse => "parse",
            DiagnosticStage::Analyze => "analyze",
            DiagnosticStage::Io => "io",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLabel {
    pub file_id: String,
    pub span: Range<usize>,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct CompilerDiagnostic {
    pub code: String,
    pub stage: DiagnosticStage,
    pub message: String,
    pub labels: Vec<SourceLabel>,
    pub notes: Vec<String>,
    pub help: Option<String>,
    pub sources: HashMap<String, String>,
}

impl CompilerDiagnostic {
    pub fn new(
        code: impl Into<String>,
        stage: DiagnosticStage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            stage,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            help: None,
            sources: HashMap::new(),
        }
    }

    pub fn with_source(mut self, file_id: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.insert(file_id.into(), source.into());
        self
    }

    pub fn with_label(
        mut self,
        file_id: impl Into<String>,
        span: Range<usize>,
        message: impl Into<String>,
    ) -> Self {
        self.labels.push(SourceLabel {
            file_id: file_id.into(),
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn render_plain(&self) -> String {
        self.render_with_color(false)
    }

    pub fn render_terminal_auto(&self) -> String {
        self.render_with_color(std::io::stderr().is_terminal())
    }

    fn render_with_color(&self, use_color: bool) -> String {
        let (primary_file_id, primary_span) = if let Some(label) = self.labels.first() {
            (label.file_id.clone(), sanitize_span(&label.span))
        } else if let Some((file_id, source)) = self.sources.iter().next() {
            let end = next_char_boundary(source, 0);
            (file_id.clone(), 0..end)
        } else {
            ("<unknown>".to_string(), 0..1)
        };

        let mut report = Report::build(
            ReportKind::Error,
            (primary_file_id.clone(), primary_span.clone()),
        )
        .with_code(self.code.clone())
        .with_message(format!(
            "error[{}:{}]: {}",
            self.stage, self.code, self.message
        ))
        .with_config(Config::default().with_color(use_color));

        for label in &self.labels {
            report = report.with_label(
                Label::new((label.file_id.clone(), sanitize_span(&label.span)))
                    .with_message(label.message.clone()),
            );
        }

        for note in &self.notes {
            report = report.with_note(note.clone());
        }

        if let Some(help) = &self.help {
            report = report.with_help(help.clone());
        }

        let mut source_entries = self
            .sources
            .iter()
            .map(|(id, src)| (id.clone(), src.clone()))
            .collect::<Vec<_>>();
        if !source_entries.iter().any(|(id, _)| id == &primary_file_id) {
            source_entries.push((primary_file_id.clone(), String::new()));
        }

        let mut output = Vec::new();
        match report.finish().write(sources(source_entries), &mut output) {
            Ok(()) => String::from_utf8_lossy(&output).trim_end().to_string(),
            Err(_) => self.fallback_render(),
        }
    }

    fn fallback_render(&self) -> String {
        let mut out = format!("error[{}:{}]: {}", self.stage, self.code, self.message);
        for note in &self.notes {
            out.push('\n');
            out.push_str("note: ");
            out.push_str(note);
        }
        if let Some(help) = &self.help {
            out.push('\n');
            out.push_str("help: ");
            out.push_str(help);
        }
        out
    }
}

pub fn diagnostic_from_anyhow(
    stage: DiagnosticStage,
    code: impl Into<String>,
    message: impl Into<String>,
    error: &anyhow::Error,
    source_path: Option<&Path>,
) -> CompilerDiagnostic {
    let mut diagnostic = CompilerDiagnostic::new(code, stage, message);

    let mut causes = error.chain();
    if let Some(primary) = causes.next() {
        diagnostic.message = format!("{}: {}", diagnostic.message, primary);
    }
    for cause in causes {
        diagnostic = diagnostic.with_note(format!("caused by: {cause}"));
    }
    if let Some(path) = source_path {
        diagnostic = diagnostic.with_note(format!("while reading {}", path.display()));
    }

    diagnostic
}

/// Labels the offending line of `source`, narrowed to the offending lexeme
/// when it can be found on that line.
pub fn diagnostic_from_frontend_error(
    source: &str,
    source_path: Option<&Path>,
    error: &FrontendError,
) -> CompilerDiagnostic {
    let (code, stage, message, needle) = match error {
        FrontendError::Lex(lex) => {
            let needle = match lex {
                LexError::UnterminatedComment { .. } => Some("{"),
                LexError::InvalidToken { lexeme, .. } => Some(lexeme.as_str()),
            };
            ("MLC-LEX-001", DiagnosticStage::Tokenize, "tokenization failed", needle)
        }
        FrontendError::Parse(parse) => {
            let code = match parse {
                ParseError::Malformed { .. } => "MLC-PARSE-002",
                _ => "MLC-PARSE-001",
            };
            (code, DiagnosticStage::Parse, "parse failed", None)
        }
        FrontendError::Semantic(semantic) => {
            let needle = match semantic {
                SemanticError::Redeclared { name, .. }
                | SemanticError::Undeclared { name, .. }
                | SemanticError::IncompatibleAssignment { name, .. }
                | SemanticError::UnknownType { name, .. } => Some(name.as_str()),
                SemanticError::IncompatibleOperands { operator, .. }
                | SemanticError::UndefinedUnary { operator, .. } => Some(operator.as_str()),
            };
            (
                "MLC-SEMANTIC-001",
                DiagnosticStage::Analyze,
                "semantic analysis failed",
                needle,
            )
        }
    };

    let file_id = file_id_from_path(source_path);
    let line = error.line();
    let span = line_span(source, line, needle);
    let mut diagnostic = CompilerDiagnostic::new(code, stage, message)
        .with_source(file_id.clone(), source.to_string())
        .with_label(file_id, span, error.to_string())
        .with_note(format!("at line {line}"));
    if let FrontendError::Semantic(SemanticError::Undeclared { name, .. }) = error {
        diagnostic = diagnostic.with_help(format!("declare it first, e.g. `dim {name} integer`"));
    }
    diagnostic
}

pub fn file_id_from_path(path: Option<&Path>) -> String {
    path.map(|value| value.display().to_string())
        .unwrap_or_else(|| "<memory>".to_string())
}

/// Byte range of `needle` on the 1-based `line`, or of the whole line when
/// `needle` is absent or not on it.
pub fn line_span(source: &str, line: usize, needle: Option<&str>) -> Range<usize> {
    let start = line_start_byte_index(source, line);
    let end = source[start..]
        .find('\n')
        .map_or(source.len(), |offset| start + offset);
    let text = &source[start..end];
    if let Some(offset) = needle.filter(|n| !n.is_empty()).and_then(|n| text.find(n)) {
        let found = start + offset;
        return found..found + needle.map_or(0, str::len);
    }
    let leading = text.len() - text.trim_start().len();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        sanitize_span(&(start..start))
    } else {
        start + leading..start + leading + trimmed.len()
    }
}

pub fn line_start_byte_index(source: &str, line_1_based: usize) -> usize {
    if line_1_based <= 1 {
        return 0;
    }
    source
        .match_indices('\n')
        .nth(line_1_based - 2)
        .map_or(source.len(), |(index, _)| index + 1)
}

pub fn sanitize_span(span: &Range<usize>) -> Range<usize> {
    if span.end <= span.start {
        span.start..span.start.saturating_add(1)
    } else {
        span.clone()
    }
}

pub fn next_char_boundary(source: &str, start: usize) -> usize {
    if start >= source.len() {
        return start.saturating_add(1);
    }
    let mut iter = source[start..].char_indices();
    let _ = iter.next();
    if let Some((delta, _)) = iter.next() {
        start + delta
    } else {
        source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        diagnostic_from_anyhow, diagnostic_from_frontend_error, line_span, CompilerDiagnostic,
        DiagnosticStage,
    };
    use crate::parse_and_analyze;

    fn diagnose(source: &str) -> CompilerDiagnostic {
        let err = parse_and_analyze(source).expect_err("source should be rejected");
        diagnostic_from_frontend_error(source, None, &err)
    }

    #[test]
    fn lexer_error_marks_the_lexeme() {
        let source = "dim a integer\na as 1 +- 2\n";
        let diagnostic = diagnose(source);
        assert_eq!(diagnostic.stage, DiagnosticStage::Tokenize);
        assert_eq!(diagnostic.code, "MLC-LEX-001");
        let span = diagnostic.labels[0].span.clone();
        assert_eq!(&source[span], "+-");
    }

    #[test]
    fn unterminated_comment_marks_the_brace() {
        let source = "a: integer\n{never closed\n";
        let diagnostic = diagnose(source);
        let span = diagnostic.labels[0].span.clone();
        assert_eq!(&source[span], "{");
        assert_eq!(diagnostic.notes, vec!["at line 2".to_string()]);
    }

    #[test]
    fn parse_error_marks_the_line() {
        let source = "dim a integer\n  if a then\n";
        let source_err = "dim a integer\n  if a > 1 a as 2\n";
        assert!(parse_and_analyze(source).is_ok());
        let diagnostic = diagnose(source_err);
        assert_eq!(diagnostic.stage, DiagnosticStage::Parse);
        let span = diagnostic.labels[0].span.clone();
        assert_eq!(&source_err[span], "if a > 1 a as 2");
    }

    #[test]
    fn semantic_error_marks_the_name() {
        let source = "a: integer\nwrite(a, b)";
        let diagnostic = diagnose(source);
        assert_eq!(diagnostic.stage, DiagnosticStage::Analyze);
        let span = diagnostic.labels[0].span.clone();
        assert_eq!(&source[span.clone()], "b");
        assert_eq!(span.start, "a: integer\nwrite(a, ".len());
        assert!(diagnostic.help.is_some());
        let text = diagnostic.render_plain();
        assert!(text.contains("MLC-SEMANTIC-001"));
        assert!(text.contains("Variable b is undeclared"));
    }

    #[test]
    fn line_span_falls_back_to_the_whole_line() {
        let source = "first\n   second line  \nthird";
        let span = line_span(source, 2, Some("missing"));
        assert_eq!(&source[span], "second line");
        let span = line_span(source, 3, None);
        assert_eq!(&source[span], "third");
        let span = line_span(source, 9, None);
        assert_eq!(span, source.len()..source.len() + 1);
    }

    #[test]
    fn plain_rendering_does_not_contain_ansi_sequences() {
        let diagnostic =
            CompilerDiagnostic::new("MLC-SEMANTIC-001", DiagnosticStage::Analyze, "analysis failed")
                .with_note("unknown type string");
        let text = diagnostic.render_plain();
        assert!(!text.contains("\u{1b}["));
    }

    #[test]
    fn plain_rendering_with_source_and_no_labels_is_valid() {
        let diagnostic = CompilerDiagnostic::new("MLC-PARSE-001", DiagnosticStage::Parse, "parse failed")
            .with_source("test.ml", "dim a integer\n")
            .with_note("unexpected token");
        let text = diagnostic.render_plain();
        assert!(text.contains("parse failed"));
        assert!(text.contains("MLC-PARSE-001"));
    }

    #[test]
    fn anyhow_chain_becomes_notes() {
        let error = anyhow::anyhow!("no such file").context("failed to read program.ml");
        let diagnostic = diagnostic_from_anyhow(
            DiagnosticStage::Io,
            "MLC-IO-001",
            "cannot read source",
            &error,
            None,
        );
        assert_eq!(diagnostic.message, "cannot read source: failed to read program.ml");
        assert_eq!(diagnostic.notes, vec!["caused by: no such file".to_string()]);
    }
}
