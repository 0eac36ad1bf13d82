//! Mock UI for tests.

use super::{OutputMode, UserInterface};

/// Captures everything written for later assertion.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    messages: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    outputs: Vec<String>,
    diagnostics: Vec<String>,
}

impl MockUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Rendered diagnostic blocks.
    pub fn diagnostics_shown(&self) -> &[String] {
        &self.diagnostics
    }

    /// Everything shown on the main output, in order of kind.
    pub fn all_text(&self) -> String {
        self.messages
            .iter()
            .chain(&self.outputs)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn use_color(&self) -> bool {
        false
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            self.messages.push(msg.to_string());
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            self.warnings.push(msg.to_string());
        }
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn output(&mut self, data: &str) {
        self.outputs.push(data.to_string());
    }

    fn diagnostics(&mut self, rendered: &str) {
        self.diagnostics.push(rendered.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_by_kind() {
        let mut ui = MockUI::new();
        ui.message("m");
        ui.warning("w");
        ui.error("e");
        ui.output("o");
        assert_eq!(ui.messages(), ["m"]);
        assert_eq!(ui.warnings(), ["w"]);
        assert_eq!(ui.errors(), ["e"]);
        assert_eq!(ui.all_text(), "m\no");
    }

    #[test]
    fn quiet_mode_keeps_results_and_errors() {
        let mut ui = MockUI::with_mode(OutputMode::Quiet);
        ui.message("hidden");
        ui.warning("hidden");
        ui.error("shown");
        ui.output("data");
        assert!(ui.messages().is_empty());
        assert!(ui.warnings().is_empty());
        assert_eq!(ui.errors(), ["shown"]);
        assert_eq!(ui.outputs(), ["data"]);
    }
}
