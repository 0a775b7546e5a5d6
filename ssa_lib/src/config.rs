use crate::passes::{self, PASSES};
use ssa_ir::{Arch, Registry};
use ssa_rules::{RuleError, RuleSet};
use std::collections::HashSet;

const GENERIC_RULES: &str = include_str!("../rules/generic.rules");
const MIPS_RULES: &str = include_str!("../rules/mips.rules");

/// Everything a compilation needs besides the function itself. Immutable once built, so one
/// `Config` can be shared by all threads compiling a unit.
#[derive(Debug)]
pub struct Config {
    registry: Registry,
    generic_rules: RuleSet,
    lower_rules: RuleSet,
    skip: HashSet<&'static str>,
    dump: HashSet<&'static str>,
    check_after_each_pass: bool,
    max_sweeps: Option<usize>,
    rule_log: bool,
}

impl Config {
    /// The registry of the target architecture.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn generic_rules(&self) -> &RuleSet {
        &self.generic_rules
    }

    pub fn lower_rules(&self) -> &RuleSet {
        &self.lower_rules
    }

    pub fn skips(&self, pass: &str) -> bool {
        self.skip.contains(pass)
    }

    pub fn dumps(&self, pass: &str) -> bool {
        self.dump.contains(pass)
    }

    pub fn check_after_each_pass(&self) -> bool {
        self.check_after_each_pass
    }

    pub fn max_sweeps(&self) -> Option<usize> {
        self.max_sweeps
    }

    pub fn rule_log(&self) -> bool {
        self.rule_log
    }
}

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    arch: Arch,
    skip: Vec<String>,
    dump: Vec<String>,
    check_after_each_pass: bool,
    max_sweeps: Option<usize>,
    rule_log: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigErr {
    #[error("There is no pass named `{0}`.")]
    UnknownPass(String),
    #[error("The `{0}` pass can't be skipped.")]
    RequiredPass(&'static str),
    #[error("Code can only be generated for a real architecture.")]
    NoTarget,
    #[error("Invalid rule: {0}")]
    Rules(#[source] RuleError),
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            arch: Arch::Mips,
            skip: Vec::new(),
            dump: Vec::new(),
            check_after_each_pass: cfg!(debug_assertions),
            max_sweeps: Some(1000),
            rule_log: false,
        }
    }
}

impl ConfigBuilder {
    /// Target MIPS, run every pass, and give up on rewriting after 1000 sweeps.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arch(mut self, arch: Arch) -> Self {
        self.arch = arch;
        self
    }

    /// Don't run the optional pass `pass`.
    pub fn skip(mut self, pass: impl Into<String>) -> Self {
        self.skip.push(pass.into());
        self
    }

    /// Log the function at debug level after `pass`.
    pub fn dump(mut self, pass: impl Into<String>) -> Self {
        self.dump.push(pass.into());
        self
    }

    pub fn check_after_each_pass(mut self, check: bool) -> Self {
        self.check_after_each_pass = check;
        self
    }

    /// Limit the number of sweeps of the rewrite passes, `None` to never give up.
    pub fn max_sweeps(mut self, max_sweeps: Option<usize>) -> Self {
        self.max_sweeps = max_sweeps;
        self
    }

    /// Log how often every rule fired after each rewrite pass.
    pub fn rule_log(mut self, rule_log: bool) -> Self {
        self.rule_log = rule_log;
        self
    }

    pub fn build(self) -> Result<Config, ConfigErr> {
        if self.arch == Arch::Generic {
            return Err(ConfigErr::NoTarget);
        }

        let mut skip = HashSet::new();
        for name in &self.skip {
            let pass = passes::find(name).ok_or_else(|| ConfigErr::UnknownPass(name.clone()))?;
            if pass.required {
                return Err(ConfigErr::RequiredPass(pass.name));
            }
            skip.insert(pass.name);
        }
        let dump = self
            .dump
            .iter()
            .map(|name| {
                passes::find(name)
                    .map(|pass| pass.name)
                    .ok_or_else(|| ConfigErr::UnknownPass(name.clone()))
            })
            .collect::<Result<HashSet<_>, _>>()?;

        let generic_rules =
            RuleSet::compile("generic.rules", GENERIC_RULES, &Registry::new(Arch::Generic))
                .map_err(ConfigErr::Rules)?;
        let registry = Registry::new(self.arch);
        let lower_rules =
            RuleSet::compile("mips.rules", MIPS_RULES, &registry).map_err(ConfigErr::Rules)?;
        log::debug!(
            "configured {} passes for {}",
            PASSES.len() - skip.len(),
            self.arch
        );

        Ok(Config {
            registry,
            generic_rules,
            lower_rules,
            skip,
            dump,
            check_after_each_pass: self.check_after_each_pass,
            max_sweeps: self.max_sweeps,
            rule_log: self.rule_log,
        })
    }
}
