use crate::util::PathOrStd;

use ssa_lib::{Config, ConfigBuilder, ConfigErr};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use codespan_reporting::files::SimpleFile;

use std::{fs::File, io::Read};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The input functions, printed back after parsing.
    Ssa,
    /// The functions after the generic optimizations.
    Opt,
    /// The functions with only MIPS operations left.
    Lowered,
    /// The functions as they are handed to the register allocator.
    Scheduled,
    /// MIPS assembly.
    MipsAsm,
    /// The generated programs in Rust's debug format.
    ProgRustDbg,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The input file, use `-` for std in.
    #[arg(default_value = "-")]
    input_path: PathOrStd,

    /// The output format.
    #[arg(short = 'e', long, value_name = "FORMAT", value_enum, default_value = "mips-asm")]
    pub emit: OutputFormat,

    /// Zero or more optional passes to skip, e.g. `generic cse` or `nilcheckelim`.
    #[arg(long = "skip", value_name = "PASS")]
    skips: Vec<String>,

    /// Log the functions after these passes, needs `-v`.
    #[arg(long = "dump", value_name = "PASS")]
    dumps: Vec<String>,

    /// Check the functions after every pass, not only at the start and after lowering.
    #[arg(long)]
    check: bool,

    /// Give up on the rewrite passes after this many sweeps, 0 for no limit.
    #[arg(long, value_name = "N", default_value_t = 1000)]
    max_sweeps: usize,

    /// Log how often every rewrite rule fired, needs `-v`.
    #[arg(long)]
    rule_log: bool,

    /// The number of threads compiling functions, defaults to one per core.
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Name registers (`$sp`) instead of numbering them (`$29`) in the assembly.
    #[arg(long)]
    pub register_names: bool,

    /// Log more, repeat for even more.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The output file, use `-` for std out.
    #[arg(short = 'o', long = "output", default_value = "-")]
    output_path: PathOrStd,
}

pub fn open_input_source(args: &Args) -> anyhow::Result<SimpleFile<String, String>> {
    let name = args.input_path.display_name();
    match &args.input_path {
        PathOrStd::Path(path) => {
            if !path.exists() {
                bail!("Input file `{}` doesn't exist", path.display());
            }
            let mut handle = File::open(path)
                .with_context(|| format!("Failed to open input file `{}`", path.display()))?;
            let mut s = String::new();
            handle
                .read_to_string(&mut s)
                .with_context(|| format!("Failed to read from input file `{}`", path.display()))?;

            Ok(SimpleFile::new(name, s))
        }
        PathOrStd::StdStream => {
            let mut handle = std::io::stdin().lock();
            let mut s = String::new();
            handle
                .read_to_string(&mut s)
                .context("Failed to read from stdin")?;

            Ok(SimpleFile::new(name, s))
        }
    }
}

pub fn extract_config(args: &Args) -> Result<Config, ConfigErr> {
    let builder = args
        .skips
        .iter()
        .fold(ConfigBuilder::new(), |builder, pass| builder.skip(pass.as_str()));
    let builder = args
        .dumps
        .iter()
        .fold(builder, |builder, pass| builder.dump(pass.as_str()));

    let max_sweeps = (args.max_sweeps > 0).then_some(args.max_sweeps);
    let builder = if args.check {
        builder.check_after_each_pass(true)
    } else {
        builder
    };

    builder
        .max_sweeps(max_sweeps)
        .rule_log(args.rule_log)
        .build()
}

pub fn open_output(args: &Args) -> anyhow::Result<Box<dyn std::io::Write>> {
    match &args.output_path {
        PathOrStd::Path(path) => std::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)
            .map(|f| Box::new(f) as Box<dyn std::io::Write>)
            .with_context(|| format!("Failed to open output file `{}`", path.display())),
        PathOrStd::StdStream => Ok(Box::new(std::io::stdout().lock())),
    }
}
