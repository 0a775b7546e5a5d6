use std::{fmt, sync::Arc};

/// Where a rule comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Loc {
    pub file: Arc<str>,
    /// The line the rule starts on, starting from 1.
    pub line: usize,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// An error evaluating a guard or payload expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: String,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid shift amount {0}")]
    Shift(i64),
    #[error("log2 of {0}")]
    Log2(i64),
    #[error("can't merge two symbols")]
    MergeSym,
}

/// An error in a rule file, or while applying one of its rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// The rule file is malformed. Only ever happens while compiling a rule file.
    #[error("{loc}: {message}")]
    Syntax { loc: Loc, message: String },
    /// A rule matched but its guard or replacement couldn't be evaluated.
    #[error("{loc}: {source}")]
    Eval { loc: Loc, source: EvalError },
}

impl RuleError {
    pub(crate) fn syntax(loc: &Loc, message: impl Into<String>) -> Self {
        Self::Syntax {
            loc: loc.clone(),
            message: message.into(),
        }
    }

    pub fn loc(&self) -> &Loc {
        match self {
            RuleError::Syntax { loc, .. } | RuleError::Eval { loc, .. } => loc,
        }
    }
}
