//! Terminal output.
//!
//! Commands write through the [`UserInterface`] trait so that tests can
//! capture output with [`MockUI`] instead of a terminal.
//!
//! # Example
//!
//! ```
//! use packwright::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.message("Loading pack");
//! ui.output("port: 8080\n");
//! assert_eq!(ui.messages(), ["Loading pack"]);
//! assert_eq!(ui.outputs(), ["port: 8080\n"]);
//! ```

pub mod mock;
pub mod output;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use output::OutputMode;
pub use terminal::TerminalUI;
pub use theme::{should_use_colors, Theme};

/// Trait for user interface interactions.
pub trait UserInterface {
    fn output_mode(&self) -> OutputMode;

    /// Whether styled output is allowed.
    fn use_color(&self) -> bool;

    /// Display a status message. Hidden in quiet mode.
    fn message(&mut self, msg: &str);

    /// Display a warning on stderr. Hidden in quiet mode.
    fn warning(&mut self, msg: &str);

    /// Display an error message. Always shown.
    fn error(&mut self, msg: &str);

    /// Write command results (YAML, JSON, tables). Always shown.
    fn output(&mut self, data: &str);

    /// Write pre-rendered diagnostics. Always shown.
    fn diagnostics(&mut self, rendered: &str);
}

/// Create the UI for the current process.
pub fn create_ui(mode: OutputMode, no_color: bool) -> Box<dyn UserInterface> {
    Box::new(TerminalUI::new(mode, no_color))
}
