//! Rewrite rules over the SSA IR.
//!
//! A rule file is a list of rules of the form `match [&& guard] -> result`. Rules about values
//! match a tree of operations rooted at the rewritten value, rules about blocks match the kind of
//! a block and its control value. The first matching rule, in file order, fires.

mod compile;
mod error;
pub mod expr;
mod reader;
mod rewrite;
mod syntax;

pub use error::{EvalError, Loc, RuleError};
pub use reader::{read_rules, RuleText};
pub use rewrite::{BlockRule, Rule, RuleSet, ValueRule};
