//! Terminal output, optionally colored with ANSI escapes.

use std::io::{self, Write};

use crate::{Diagnostic, LabelStyle, Paint, Severity, Style};

use super::DiagnosticEmitter;

const RED: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[1;33m";
const GREEN: &str = "\x1b[1;32m";
const BLUE: &str = "\x1b[1;34m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn escape(style: Style) -> Option<&'static str> {
    match style {
        Style::Plain => None,
        Style::Severity(Severity::Error) | Style::Label(LabelStyle::Primary) => Some(RED),
        Style::Severity(Severity::Warning) => Some(YELLOW),
        Style::Code | Style::Note => Some(BOLD),
        Style::Label(LabelStyle::Secondary) => Some(BLUE),
        Style::Help => Some(GREEN),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Color only when writing to a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// `is_tty` only matters for [`ColorMode::Auto`].
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    pub fn stderr(mode: ColorMode, is_tty: bool) -> TerminalEmitter<io::Stderr> {
        TerminalEmitter::with_color_mode(io::stderr(), mode, is_tty)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

// Write errors are ignored: there is nowhere left to report them.
impl<W: Write> Paint for TerminalEmitter<W> {
    fn paint(&mut self, text: &str, style: Style) {
        match escape(style).filter(|_| self.colors) {
            Some(color) => {
                let _ = write!(self.writer, "{color}{text}{RESET}");
            }
            None => {
                let _ = self.writer.write_all(text.as_bytes());
            }
        }
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        diagnostic.layout(self);
        let _ = self.writer.write_all(b"\n\n");
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    /// `error: aborting due to 2 previous errors; 1 warning emitted`
    fn emit_summary(&mut self, error_count: usize, warning_count: usize) {
        let warnings = match warning_count {
            0 => None,
            1 => Some("1 warning emitted".to_string()),
            n => Some(format!("{n} warnings emitted")),
        };
        let line = match (error_count, warnings) {
            (0, None) => return,
            (0, Some(warnings)) => {
                self.paint("warning", Style::Severity(Severity::Warning));
                format!(": {warnings}")
            }
            (errors, warnings) => {
                self.paint("error", Style::Severity(Severity::Error));
                let errors = if errors == 1 {
                    "previous error".to_string()
                } else {
                    format!("{errors} previous errors")
                };
                match warnings {
                    Some(warnings) => format!(": aborting due to {errors}; {warnings}"),
                    None => format!(": aborting due to {errors}"),
                }
            }
        };
        let _ = writeln!(self.writer, "{line}");
    }
}
