//! # Output Configuration
//!
//! Controls how the CLI decorates its summary lines: emoji markers on color
//! capable terminals, bracketed plain-text markers otherwise.
//!
//! The following flags and environment variables are honoured:
//! - `--color=never|always|auto`
//! - `NO_COLOR` disables colors when set (https://no-color.org/)
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors even when stdout is not a TTY
//! - `TERM=dumb` disables colors
//!
//! ## Usage
//!
//! ```rust
//! use helm_values::output::{Marker, OutputConfig};
//!
//! let out = OutputConfig::from_env_and_flag("never");
//! assert_eq!(out.marker(Marker::Ok), "[OK]");
//! ```

use std::env;

/// Kind of summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Scan,
    Ok,
    Warn,
    Error,
    Info,
    Write,
}

impl Marker {
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Scan => "🔍",
            Self::Ok => "✅",
            Self::Warn => "⚠️",
            Self::Error => "❌",
            Self::Info => "📊",
            Self::Write => "📝",
        }
    }

    pub fn plain(self) -> &'static str {
        match self {
            Self::Scan => "[SCAN]",
            Self::Ok => "[OK]",
            Self::Warn => "[WARN]",
            Self::Error => "[ERR]",
            Self::Info => "[INFO]",
            Self::Write => "[WRITE]",
        }
    }
}

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and the `--color` flag
    /// (`always`, `never` or `auto`).
    ///
    /// `always` wins over `NO_COLOR`; `auto` inspects the environment and the
    /// terminal.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    /// Marker to prefix a summary line with.
    pub fn marker(&self, marker: Marker) -> &'static str {
        if self.use_color {
            marker.emoji()
        } else {
            marker.plain()
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_always() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
        assert!(OutputConfig::from_env_and_flag("ALWAYS").use_color);
    }

    #[test]
    fn test_color_never() {
        assert!(!OutputConfig::from_env_and_flag("never").use_color);
    }

    #[test]
    fn test_marker_with_color() {
        let out = OutputConfig { use_color: true };
        assert_eq!(out.marker(Marker::Ok), "✅");
        assert_eq!(out.marker(Marker::Error), "❌");
    }

    #[test]
    fn test_marker_without_color() {
        let out = OutputConfig { use_color: false };
        assert_eq!(out.marker(Marker::Warn), "[WARN]");
        assert_eq!(out.marker(Marker::Write), "[WRITE]");
    }
}
