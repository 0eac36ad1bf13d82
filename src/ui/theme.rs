//! Terminal styles.

use console::Style;

/// Styles for packwright's terminal output.
#[derive(Debug, Clone)]
pub struct Theme {
    pub warning: Style,
    pub error: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    pub fn new() -> Self {
        Self {
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
        }
    }

    /// A theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            warning: Style::new(),
            error: Style::new(),
        }
    }

    pub fn format_warning(&self, msg: &str) -> String {
        self.warning.apply_to(format!("⚠ {}", msg)).to_string()
    }

    pub fn format_error(&self, msg: &str) -> String {
        self.error.apply_to(format!("✗ {}", msg)).to_string()
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    console::Term::stdout().is_term()
}
