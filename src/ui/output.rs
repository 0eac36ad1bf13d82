//! Output verbosity.

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Status messages and results.
    #[default]
    Normal,
    /// Results and errors only.
    Quiet,
}

impl OutputMode {
    /// Whether status and warning messages are shown.
    pub fn shows_status(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_hides_status() {
        assert!(OutputMode::Normal.shows_status());
        assert!(!OutputMode::Quiet.shows_status());
        assert_eq!(OutputMode::default(), OutputMode::Normal);
    }
}
