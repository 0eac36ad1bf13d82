//! Terminal UI.

use console::Term;
use std::io::Write;

use super::{should_use_colors, OutputMode, Theme, UserInterface};

/// UI writing to stdout, with errors on stderr.
pub struct TerminalUI {
    out: Term,
    err: Term,
    theme: Theme,
    mode: OutputMode,
    use_color: bool,
}

impl TerminalUI {
    pub fn new(mode: OutputMode, no_color: bool) -> Self {
        let use_color = !no_color && should_use_colors();
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme: if use_color {
                Theme::new()
            } else {
                Theme::plain()
            },
            mode,
            use_color,
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn use_color(&self) -> bool {
        self.use_color
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.out, "{}", msg).ok();
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.err, "{}", self.theme.format_warning(msg)).ok();
        }
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_error(msg)).ok();
    }

    fn output(&mut self, data: &str) {
        write!(self.out, "{}", data).ok();
        if !data.ends_with('\n') {
            writeln!(self.out).ok();
        }
    }

    fn diagnostics(&mut self, rendered: &str) {
        write!(self.err, "{}", rendered).ok();
    }
}
