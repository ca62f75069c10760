//! Glob pre-filter for candidate log lines
//!
//! Cheap shape check that discards lines which are not packet-filter log
//! records before the field parser runs.

use glob::{MatchOptions, Pattern, PatternError};

use crate::constants::HIT_PATTERN;

/// Compiled line-match pattern owned by a tail session
#[derive(Debug, Clone)]
pub struct LinePattern {
    pattern: Pattern,
}

impl LinePattern {
    /// Compile an arbitrary glob
    pub fn new(glob: &str) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::new(glob)?,
        })
    }

    /// The packet-filter record pattern `* IN=* OUT=* SRC=* `
    pub fn hits() -> Self {
        // HIT_PATTERN holds no bracket expressions, so compilation cannot fail
        match Pattern::new(HIT_PATTERN) {
            Ok(pattern) => Self { pattern },
            Err(_) => unreachable!("built-in hit pattern is a valid glob"),
        }
    }

    /// Whether the whole line matches the glob
    pub fn matches(&self, line: &str) -> bool {
        self.pattern.matches_with(
            line,
            MatchOptions {
                case_sensitive: true,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        )
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Default for LinePattern {
    fn default() -> Self {
        Self::hits()
    }
}
