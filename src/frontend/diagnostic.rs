use std::fmt::Write;

use super::ast::Span;

/// A parser or resolver message, optionally anchored to a source span.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// Renders the message, quoting the offending source line with a
    /// caret under the spanned column when one is known.
    pub fn render(&self, source: &str) -> String {
        let Some(span) = &self.span else {
            return format!("error: {}", self.message);
        };
        let mut out = format!(
            "error at line {}, column {}: {}",
            span.line, span.column, self.message
        );
        if let Some(text) = source.lines().nth(span.line.saturating_sub(1)) {
            let mut marker = String::new();
            // Mirror tabs so the caret lines up under tab-indented code.
            for ch in text.chars().take(span.column.saturating_sub(1)) {
                marker.push(if ch == '\t' { '\t' } else { ' ' });
            }
            let _ = write!(out, "\n  | {}\n  | {}^", text, marker);
        }
        out
    }
}

#[derive(Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.items.push(Diagnostic::new(message, span));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        for (i, diag) in self.items.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&diag.render(source));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanless_message_renders_plain() {
        let diag = Diagnostic::new("hook name rejected", None);
        assert_eq!(diag.render(""), "error: hook name rejected");
    }

    #[test]
    fn caret_respects_tab_indentation() {
        let source = "package main\n\tx := := 1\n";
        let diag = Diagnostic::new(
            "expected expression",
            Some(Span {
                start: 0,
                end: 0,
                line: 2,
                column: 7,
            }),
        );
        let rendered = diag.render(source);
        assert!(rendered.contains("error at line 2, column 7"));
        // The marker line copies the tab so the caret stays aligned.
        assert!(rendered.contains("\n  | \t"));
        assert!(rendered.ends_with('^'));
    }
}
