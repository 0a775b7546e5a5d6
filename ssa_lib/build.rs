//! Checks the rule files, so that a broken rule fails the build instead of every compilation.

use ssa_ir::{Arch, Registry};
use ssa_rules::RuleSet;

const RULE_FILES: &[(&str, Arch)] = &[
    ("rules/generic.rules", Arch::Generic),
    ("rules/mips.rules", Arch::Mips),
];

fn main() {
    for &(path, arch) in RULE_FILES {
        println!("cargo:rerun-if-changed={path}");
        let src = std::fs::read_to_string(path)
            .unwrap_or_else(|err| panic!("couldn't read `{path}`: {err}"));
        if let Err(err) = RuleSet::compile(path, &src, &Registry::new(arch)) {
            panic!("{err}");
        }
    }
}
