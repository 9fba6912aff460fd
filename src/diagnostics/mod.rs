//! Diagnostics computed per document on top of the search context.
//!
//! Checkers only read the index; suppression comments and configuration
//! overrides are applied once at the end.

mod checks;
mod code;
mod doc;
mod names;

use tower_lsp_server::lsp_types::{self, DiagnosticTag, NumberOrString};

pub use code::{DiagnosticCode, DiagnosticSeverity};

use crate::line_index::LineIndex;
use crate::semantic::SearchContext;
use crate::syntax::{LuaSyntaxTree, TextRange};
use crate::vfs::DocumentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: DiagnosticSeverity,
    pub range: TextRange,
    pub message: String,
}

impl Diagnostic {
    /// Converts to the protocol type with UTF-16 positions.
    pub fn to_lsp(&self, line_index: &LineIndex) -> lsp_types::Diagnostic {
        let severity = match self.severity {
            DiagnosticSeverity::Error => lsp_types::DiagnosticSeverity::ERROR,
            DiagnosticSeverity::Warning => lsp_types::DiagnosticSeverity::WARNING,
            DiagnosticSeverity::Information => lsp_types::DiagnosticSeverity::INFORMATION,
            DiagnosticSeverity::Hint => lsp_types::DiagnosticSeverity::HINT,
        };
        let tags = match self.code {
            DiagnosticCode::Deprecated => Some(vec![DiagnosticTag::DEPRECATED]),
            DiagnosticCode::UnusedLocal => Some(vec![DiagnosticTag::UNNECESSARY]),
            _ => None,
        };
        lsp_types::Diagnostic {
            range: line_index.range(self.range),
            severity: Some(severity),
            code: Some(NumberOrString::String(self.code.as_str().to_string())),
            source: Some("lua-lsp".to_string()),
            message: self.message.clone(),
            tags,
            ..Default::default()
        }
    }
}

// ─── suppression comments ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionAction {
    Disable,
    Enable,
    DisableNextLine,
    DisableLine,
}

impl SuppressionAction {
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "disable" => SuppressionAction::Disable,
            "enable" => SuppressionAction::Enable,
            "disable-next-line" => SuppressionAction::DisableNextLine,
            "disable-line" => SuppressionAction::DisableLine,
            _ => return None,
        })
    }
}

/// One `---@diagnostic` comment. No codes means every code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticSuppression {
    pub action: SuppressionAction,
    pub codes: Vec<DiagnosticCode>,
    /// Zero-based line of the comment.
    pub line: u32,
}

impl DiagnosticSuppression {
    fn covers(&self, code: DiagnosticCode) -> bool {
        self.codes.is_empty() || self.codes.contains(&code)
    }
}

/// `disable`/`enable` toggle a code from their line to the end of the file;
/// the line forms only affect one line.
pub fn is_suppressed(suppressions: &[DiagnosticSuppression], code: DiagnosticCode, line: u32) -> bool {
    let mut disabled = false;
    let mut ordered: Vec<&DiagnosticSuppression> = suppressions.iter().collect();
    ordered.sort_by_key(|suppression| suppression.line);
    for suppression in ordered {
        if !suppression.covers(code) {
            continue;
        }
        match suppression.action {
            SuppressionAction::Disable if suppression.line <= line => disabled = true,
            SuppressionAction::Enable if suppression.line <= line => disabled = false,
            SuppressionAction::DisableNextLine if suppression.line + 1 == line => return true,
            SuppressionAction::DisableLine if suppression.line == line => return true,
            _ => {}
        }
    }
    disabled
}

// ─── running the checkers ──────────────────────────────────────────────

/// Collects diagnostics for one document while the checkers run.
pub(crate) struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, code: DiagnosticCode, range: TextRange, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            code,
            severity: code.default_severity(),
            range,
            message: message.into(),
        });
    }
}

/// Runs every checker over a document. Meta documents have no diagnostics.
/// Returns whatever was collected when the context is cancelled midway.
#[tracing::instrument(skip_all, fields(doc = doc_id.0))]
pub fn check_document(
    ctx: &mut SearchContext,
    doc_id: DocumentId,
    tree: &LuaSyntaxTree,
    line_index: &LineIndex,
) -> Vec<Diagnostic> {
    let index = ctx.index();
    if index.is_meta(doc_id) {
        return Vec::new();
    }
    let mut sink = DiagnosticSink::new();
    let passes: [fn(&mut SearchContext, DocumentId, &LuaSyntaxTree, &mut DiagnosticSink); 4] = [
        names::check_syntax,
        names::check_names,
        checks::check_flow,
        doc::check_type_decls,
    ];
    for pass in passes {
        if ctx.is_cancelled() {
            tracing::debug!("diagnostic pass cancelled");
            break;
        }
        pass(ctx, doc_id, tree, &mut sink);
    }

    let config = &ctx.config().diagnostics;
    let suppressions = index.suppressions(doc_id);
    let mut diagnostics: Vec<Diagnostic> = sink
        .diagnostics
        .into_iter()
        .filter(|diagnostic| !config.disable.contains(&diagnostic.code))
        .filter(|diagnostic| {
            let line = line_index.line(diagnostic.range.start) as u32;
            !is_suppressed(suppressions, diagnostic.code, line)
        })
        .map(|mut diagnostic| {
            if let Some(severity) = config.severity.get(&diagnostic.code) {
                diagnostic.severity = *severity;
            }
            diagnostic
        })
        .collect();
    diagnostics.sort_by_key(|diagnostic| (diagnostic.range.start, diagnostic.code));
    diagnostics.dedup();
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suppression(action: SuppressionAction, codes: &[DiagnosticCode], line: u32) -> DiagnosticSuppression {
        DiagnosticSuppression {
            action,
            codes: codes.to_vec(),
            line,
        }
    }

    #[test]
    fn test_disable_applies_to_rest_of_file() {
        let suppressions = vec![suppression(
            SuppressionAction::Disable,
            &[DiagnosticCode::TypeNotMatch],
            2,
        )];
        assert!(!is_suppressed(&suppressions, DiagnosticCode::TypeNotMatch, 1));
        assert!(is_suppressed(&suppressions, DiagnosticCode::TypeNotMatch, 2));
        assert!(is_suppressed(&suppressions, DiagnosticCode::TypeNotMatch, 40));
        assert!(!is_suppressed(&suppressions, DiagnosticCode::UndefinedGlobal, 40));
    }

    #[test]
    fn test_enable_ends_disabled_region() {
        let suppressions = vec![
            suppression(SuppressionAction::Enable, &[], 10),
            suppression(SuppressionAction::Disable, &[], 0),
        ];
        assert!(is_suppressed(&suppressions, DiagnosticCode::UnusedLocal, 5));
        assert!(!is_suppressed(&suppressions, DiagnosticCode::UnusedLocal, 11));
    }

    #[test]
    fn test_line_forms() {
        let suppressions = vec![
            suppression(SuppressionAction::DisableNextLine, &[DiagnosticCode::Deprecated], 3),
            suppression(SuppressionAction::DisableLine, &[], 7),
        ];
        assert!(is_suppressed(&suppressions, DiagnosticCode::Deprecated, 4));
        assert!(!is_suppressed(&suppressions, DiagnosticCode::Deprecated, 5));
        assert!(is_suppressed(&suppressions, DiagnosticCode::SyntaxError, 7));
    }
}
