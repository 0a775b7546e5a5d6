//! Checks a rule file and prints the rules it dispatches on every operation and block kind.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ssa_ir::{Arch, BlockKind, Op, Registry};
use ssa_rules::RuleSet;
use std::path::PathBuf;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Target {
    Generic,
    Mips,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The rule file
    file: PathBuf,

    /// The operations the rules may use besides the generic ones.
    #[arg(short = 'a', long, value_enum, default_value = "generic")]
    arch: Target,

    /// Only check the file, don't print the dispatch table.
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let src = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read rule file `{}`", args.file.display()))?;

    let registry = Registry::new(match args.arch {
        Target::Generic => Arch::Generic,
        Target::Mips => Arch::Mips,
    });
    let name = args.file.to_string_lossy();
    let rules = RuleSet::compile(&name, &src, &registry)?;

    if args.quiet {
        return Ok(());
    }
    for &op in Op::ALL {
        print_rules(op.name(), rules.value_rules(op).iter().map(|r| (r.loc(), r.text())));
    }
    for &kind in BlockKind::ALL {
        print_rules(kind.name(), rules.block_rules(kind).iter().map(|r| (r.loc(), r.text())));
    }
    Ok(())
}

fn print_rules<'a>(
    key: &str,
    rules: impl Iterator<Item = (&'a ssa_rules::Loc, &'a str)>,
) {
    let mut rules = rules.peekable();
    if rules.peek().is_none() {
        return;
    }
    println!("{key}:");
    for (loc, text) in rules {
        println!("    {loc}: {text}");
    }
}
