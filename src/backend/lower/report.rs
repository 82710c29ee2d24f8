// Pretty lowering diagnostics with source highlighting using ariadne

use crate::backend::lower::error::{Diagnostic, ErrorCategory, LowerError};
use ariadne::{Color, Label, Report, ReportKind, Source};

/// Report a lowering diagnostic with source highlighting
pub fn report_diagnostic(filename: &str, source: &str, diagnostic: &Diagnostic) {
    let report = build_report(diagnostic);
    if let Err(err) = report.eprint(Source::from(source)) {
        eprintln!("{diagnostic} (failed to render report: {err})");
        return;
    }

    let start = diagnostic.error.span().start;
    eprintln!("  --> {}:{}", filename, get_line_col(source, start));
}

fn get_line_col(source: &str, offset: usize) -> String {
    let mut line = 1;
    let mut col = 1;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    format!("{}:{}", line, col)
}

/// Build an ariadne Report from a lowering diagnostic
pub fn build_report(diagnostic: &Diagnostic) -> Report<'static, std::ops::Range<usize>> {
    let error = &diagnostic.error;
    let span = error.span();
    let range = span.start..span.end;

    let (label, help) = match error {
        LowerError::UnresolvedIdentifier { name, .. } => (
            format!("`{}` has no lowered value in scope", name),
            "Identifiers must be declared before use; semantic analysis should have rejected this program".to_string(),
        ),
        LowerError::MissingBehaviors { .. } => (
            "no behaviors recorded for this statement".to_string(),
            "Run behavior analysis before lowering".to_string(),
        ),
        LowerError::MissingLiteralValue { ty, .. } => (
            format!("literal cannot be represented as `{}`", ty),
            "Literal types must be resolved to a concrete scalar".to_string(),
        ),
        LowerError::NotAFunction { name, .. } => (
            format!("`{}` does not name a function", name),
            "Only user-declared functions can be called by name".to_string(),
        ),
        LowerError::UnsubstitutedOverride { name, .. } => (
            format!("override `{}` declared here", name),
            "Substitute pipeline overrides with their values before lowering".to_string(),
        ),
        LowerError::InvalidBuiltin {
            builtin, position, ..
        } => (
            format!("`@builtin({})` on a {}", builtin, position),
            if *position == "parameter" {
                "Parameters cannot receive frag_depth".to_string()
            } else {
                "Return values support position, frag_depth and sample_mask only".to_string()
            },
        ),
        LowerError::MissingWorkgroupSize { function, .. } => (
            format!("`{}` needs `@workgroup_size`", function),
            "Compute entry points must declare at least the x dimension".to_string(),
        ),
        LowerError::UnresolvedControl {
            statement,
            expected,
            ..
        } => (
            format!("`{}` outside of any {}", statement, expected),
            "This is a bug in the lowering pass".to_string(),
        ),
        LowerError::Internal { message, .. } => (
            message.clone(),
            "This is a bug in the lowering pass".to_string(),
        ),
    };

    let color = match error.category() {
        ErrorCategory::UpstreamContract => Color::Red,
        ErrorCategory::Internal => Color::Magenta,
    };

    let mut builder = Report::build(ReportKind::Error, range.clone())
        .with_code(error.code())
        .with_message(error.to_string())
        .with_label(Label::new(range).with_message(label).with_color(color))
        .with_help(help);
    if let Some(function) = &diagnostic.function {
        builder = builder.with_note(format!("while lowering function `{}`", function));
    }
    builder.finish()
}
