//! Diagnostic extraction from the blueprint loader's structured error tree
//! (spec.md §7).
//!
//! The loader's own error type is out of scope for this core (it lives in
//! the blueprint container library), so `LoaderError` here is the shape the
//! orchestrator and controller need to walk: a small recursive tree over the
//! `{load, schema, parse, lex, core, run}` kinds spec.md names, each leaf
//! carrying an optional line/column and children.

use crate::models::{Diagnostic, DiagnosticSeverity};

#[derive(Debug, Clone)]
pub enum LoaderErrorKind {
    Load,
    Schema,
    Parse,
    Lex,
    Core,
    /// Runtime/execution errors, as distinct from authoring errors. Dropped
    /// in validation contexts per spec.md §7.
    Run,
}

#[derive(Debug, Clone)]
pub struct LoaderError {
    pub kind: LoaderErrorKind,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub children: Vec<LoaderError>,
}

impl LoaderError {
    pub fn leaf(kind: LoaderErrorKind, message: impl Into<String>) -> Self {
        LoaderError {
            kind,
            message: message.into(),
            line: None,
            column: None,
            children: Vec::new(),
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_children(mut self, children: Vec<LoaderError>) -> Self {
        self.children = children;
        self
    }
}

/// Walk the error tree, yielding one diagnostic per leaf. Each leaf's
/// position is its own line/column, or the nearest enclosing `Load` error's
/// position if the leaf has none, or `(0,0)` if nothing in the ancestry has
/// one. Leaves tagged `Run` are dropped when `drop_runtime_only` is set
/// (the validation context; deploy/staging keep them).
pub fn flatten(root: &LoaderError, drop_runtime_only: bool) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    walk(root, None, drop_runtime_only, &mut out);
    out
}

fn walk(
    node: &LoaderError,
    inherited_pos: Option<(u32, u32)>,
    drop_runtime_only: bool,
    out: &mut Vec<Diagnostic>,
) {
    let own_pos = match (node.line, node.column) {
        (Some(l), Some(c)) => Some((l, c)),
        _ => None,
    };
    let carried_pos = own_pos.or(inherited_pos);
    let next_inherited = if matches!(node.kind, LoaderErrorKind::Load) {
        own_pos.or(inherited_pos)
    } else {
        inherited_pos
    };

    if node.children.is_empty() {
        if drop_runtime_only && matches!(node.kind, LoaderErrorKind::Run) {
            return;
        }
        let (line, column) = carried_pos.unwrap_or((0, 0));
        out.push(Diagnostic {
            message: node.message.clone(),
            severity: DiagnosticSeverity::Error,
            line,
            column,
        });
        return;
    }

    for child in &node.children {
        walk(child, next_inherited, drop_runtime_only, out);
    }
}

/// A single line-0 diagnostic synthesized from a non-structured error, used
/// when `fallback_to_general_diagnostic` is set (the deployment path).
/// Change staging uses an empty list instead (spec.md §7).
pub fn general_diagnostic(message: impl Into<String>) -> Vec<Diagnostic> {
    vec![Diagnostic {
        message: message.into(),
        severity: DiagnosticSeverity::Error,
        line: 0,
        column: 0,
    }]
}
