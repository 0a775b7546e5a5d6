use ssa_ir::CheckError;
use ssa_rules::RuleError;

/// An internal compiler error. The input was accepted, but the compiler couldn't turn it into
/// code: either a pass broke an invariant, or the rules don't cover the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Ice {
    #[error("invalid function after `{pass}`: {source}")]
    Check {
        pass: &'static str,
        source: CheckError,
    },
    #[error("{value} in {block}: `{op}` wasn't lowered")]
    Unlowered {
        op: &'static str,
        value: String,
        block: String,
    },
    #[error("{block}: block kind `{kind}` wasn't lowered")]
    UnloweredBlock { kind: &'static str, block: String },
    #[error("`{pass}` didn't reach a fixpoint after {sweeps} sweeps")]
    NoFixpoint { pass: &'static str, sweeps: usize },
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("ran out of registers for {value}")]
    OutOfRegisters { value: String },
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Ice {
    /// A short name of the kind of error, used by the file driven tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Ice::Check { .. } => "check",
            Ice::Unlowered { .. } => "unlowered",
            Ice::UnloweredBlock { .. } => "unlowered-block",
            Ice::NoFixpoint { .. } => "no-fixpoint",
            Ice::Rule(_) => "rule",
            Ice::OutOfRegisters { .. } => "out-of-registers",
            Ice::Unsupported(_) => "unsupported",
        }
    }
}

/// An internal compiler error in one function of a compilation unit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("internal compiler error in `{func}`: {ice}")]
pub struct CompileError {
    pub func: String,
    pub ice: Ice,
}
