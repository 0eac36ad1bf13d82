//! Human-readable diagnostic output.
//!
//! Formatting options travel in an explicit [`OutputContext`] rather than
//! global state, so the resolution engine never needs to know how its
//! diagnostics end up on screen.

use console::Style;
use std::io::Write;

use super::{Diagnostic, Severity};

/// Output options for components that report diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputContext {
    /// Whether to use colors (ANSI escape codes).
    pub use_color: bool,
    /// Suppress warnings, print errors only.
    pub errors_only: bool,
}

impl OutputContext {
    /// Plain output with every diagnostic shown.
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    pub fn with_errors_only(mut self, errors_only: bool) -> Self {
        self.errors_only = errors_only;
        self
    }
}

/// Formats diagnostics for terminal display.
pub struct HumanFormatter {
    ctx: OutputContext,
}

impl HumanFormatter {
    pub fn new(ctx: OutputContext) -> Self {
        Self { ctx }
    }

    fn severity_style(&self, severity: Severity) -> Style {
        if !self.ctx.use_color {
            return Style::new();
        }
        match severity {
            Severity::Warning => Style::new().color256(208),
            Severity::Error => Style::new().red().bold(),
        }
    }

    /// Write each diagnostic followed by a summary line.
    pub fn format<'a, W, I>(&self, diagnostics: I, writer: &mut W) -> std::io::Result<()>
    where
        W: Write,
        I: IntoIterator<Item = &'a Diagnostic>,
    {
        let mut error_count = 0;
        let mut warning_count = 0;

        for diag in diagnostics {
            match diag.severity {
                Severity::Error => error_count += 1,
                Severity::Warning => {
                    warning_count += 1;
                    if self.ctx.errors_only {
                        continue;
                    }
                }
            }

            // Header line: error[kind]: message
            let label = format!("{}[{}]", diag.severity, diag.kind);
            writeln!(
                writer,
                "{}: {}",
                self.severity_style(diag.severity).apply_to(label),
                diag.message
            )?;

            if let Some(ref pack) = diag.subject.pack {
                match diag.subject.variable {
                    Some(ref var) => writeln!(writer, "  --> pack {}, variable {}", pack, var)?,
                    None => writeln!(writer, "  --> pack {}", pack)?,
                }
            } else if let Some(ref var) = diag.subject.variable {
                writeln!(writer, "  --> variable {}", var)?;
            }
        }

        if error_count > 0 || warning_count > 0 {
            writeln!(
                writer,
                "Found {} error(s) and {} warning(s)",
                error_count, warning_count
            )?;
        }

        Ok(())
    }
}
