//! Diagnostics and their layout.
//!
//! A [`Diagnostic`] is built by the phase that found the problem and laid
//! out once, through [`Diagnostic::layout`], for every output format: the
//! plain [`Display`](fmt::Display) rendering and the colored terminal
//! emitter paint the same pieces in different ways.

use std::fmt;

use viuact_ir::Span;

use crate::ErrorCode;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LabelStyle {
    /// Where the problem is.
    Primary,
    /// Related location, e.g. the declaration a use disagrees with.
    Secondary,
}

/// A message attached to a span of the form tree.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub style: LabelStyle,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Label {
            span,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Label {
            span,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }

    #[inline]
    pub fn is_primary(&self) -> bool {
        self.style == LabelStyle::Primary
    }
}

/// One compiler message.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    /// `name/arity` of the function being compiled, when known.
    pub function: Option<String>,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    /// Possible fixes, rendered as `help:` lines.
    pub suggestions: Vec<String>,
}

/// Role of a piece of laid-out text; emitters map it to a color.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Style {
    Plain,
    Severity(Severity),
    Code,
    Label(LabelStyle),
    Note,
    Help,
}

/// Receives the pieces of a laid-out diagnostic in order.
pub trait Paint {
    fn paint(&mut self, text: &str, style: Style);
}

impl Paint for String {
    fn paint(&mut self, text: &str, _style: Style) {
        self.push_str(text);
    }
}

impl Diagnostic {
    fn with_severity(code: ErrorCode, severity: Severity) -> Self {
        Diagnostic {
            code,
            severity,
            message: String::new(),
            function: None,
            labels: Vec::new(),
            notes: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    #[cold]
    pub fn error(code: ErrorCode) -> Self {
        Self::with_severity(code, Severity::Error)
    }

    #[cold]
    pub fn warning(code: ErrorCode) -> Self {
        Self::with_severity(code, Severity::Warning)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Name the function the problem was found in.
    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Span of the first primary label.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels.iter().find(|l| l.is_primary()).map(|l| l.span)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Feed the diagnostic to `out`, one line per piece of context:
    ///
    /// ```text
    /// error[E2201]: unbound name `x`
    ///   in function `main/0`
    ///   --> 3..4: not bound in this scope
    ///   = note: ...
    ///   = help: ...
    /// ```
    ///
    /// Lines are separated by `\n`; the last one has no terminator.
    pub fn layout(&self, out: &mut dyn Paint) {
        out.paint(self.severity.as_str(), Style::Severity(self.severity));
        out.paint(&format!("[{}]", self.code), Style::Code);
        out.paint(&format!(": {}", self.message), Style::Plain);

        if let Some(function) = &self.function {
            out.paint(&format!("\n  in function `{function}`"), Style::Plain);
        }
        for label in &self.labels {
            let marker = if label.is_primary() { "-->" } else { "   " };
            out.paint(&format!("\n  {marker} {:?}: ", label.span), Style::Plain);
            out.paint(&label.message, Style::Label(label.style));
        }
        for note in &self.notes {
            out.paint("\n  = ", Style::Plain);
            out.paint("note", Style::Note);
            out.paint(&format!(": {note}"), Style::Plain);
        }
        for suggestion in &self.suggestions {
            out.paint("\n  = ", Style::Plain);
            out.paint("help", Style::Help);
            out.paint(&format!(": {suggestion}"), Style::Plain);
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = String::new();
        self.layout(&mut text);
        f.write_str(&text)
    }
}
