mod cli;
mod compile;
mod report;
mod util;

use anyhow::{bail, Context, Result};
use clap::Parser;

use compile::{compile, CompileOpts};
use std::io::Write;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to start the compile threads")?;
    }

    let source = cli::open_input_source(&args)?;
    let config = cli::extract_config(&args)?;
    let opts = CompileOpts {
        output_format: args.emit,
        register_names: args.register_names,
    };

    let output = match compile(&source, &config, &opts) {
        Ok(output) => output,
        Err(failure) => {
            report::eprint_failure(&failure, &source);
            bail!("couldn't compile due to the previous error");
        }
    };

    cli::open_output(&args)?
        .write_all(&output)
        .with_context(|| "Failed to write to output".to_string())?;

    Ok(())
}
