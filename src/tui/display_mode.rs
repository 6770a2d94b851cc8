//! Display mode detection.
//!
//! Picks between TUI, silent, and JSON output based on CLI flags and
//! whether stdout is an interactive terminal.

/// The display mode for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Full TUI with live progress
    Tui,
    /// No output until final results
    Silent,
    /// Structured output only
    Json,
}

impl DisplayMode {
    /// Determine display mode from CLI flags and environment.
    ///
    /// The `--json` flag wins over everything. Otherwise a TTY gets
    /// the TUI and anything piped gets silent output.
    pub fn detect(json_flag: bool, is_tty: bool) -> Self {
        if json_flag {
            DisplayMode::Json
        } else if is_tty {
            DisplayMode::Tui
        } else {
            DisplayMode::Silent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_json_flag_wins_over_tty() {
        assert_eq!(DisplayMode::detect(true, true), DisplayMode::Json);
        assert_eq!(DisplayMode::detect(true, false), DisplayMode::Json);
    }

    #[test]
    fn test_tty_without_json_gets_tui() {
        assert_eq!(DisplayMode::detect(false, true), DisplayMode::Tui);
    }

    #[test]
    fn test_pipe_without_json_gets_silent() {
        assert_eq!(DisplayMode::detect(false, false), DisplayMode::Silent);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: every flag combination maps to exactly one mode and
        /// the JSON flag always takes precedence.
        #[test]
        fn detect_covers_all_flag_combinations(
            json_flag in any::<bool>(),
            is_tty in any::<bool>()
        ) {
            let result = DisplayMode::detect(json_flag, is_tty);

            let expected = match (json_flag, is_tty) {
                (true, _) => DisplayMode::Json,
                (false, true) => DisplayMode::Tui,
                (false, false) => DisplayMode::Silent,
            };

            prop_assert_eq!(result, expected);
        }
    }
}
