//! Error types for the syntax front end

/// Errors raised while parsing Python source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// The tree-sitter grammar could not be loaded
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// tree-sitter returned no tree
    #[error("parse failed")]
    ParseFailed,

    /// Source contains a syntax error
    #[error("syntax error at {line}:{column}: {message}")]
    InvalidSyntax {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// What was found
        message: String,
    },

    /// Snippet did not contain the expected construct
    #[error("expected {expected}, found {found}")]
    UnexpectedNode {
        /// What the caller asked for
        expected: &'static str,
        /// What the snippet contained
        found: String,
    },
}

impl SyntaxError {
    /// Create invalid-syntax error from a 0-based tree-sitter position
    pub fn invalid_syntax(row: usize, column: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            line: row + 1,
            column: column + 1,
            message: message.into(),
        }
    }
}

/// Result alias for syntax operations
pub type SyntaxResult<T> = Result<T, SyntaxError>;
