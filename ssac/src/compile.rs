use crate::cli::OutputFormat;
use codespan_reporting::files::SimpleFile;
use ssa_ir::{parse_unit, Func, ParseError};
use ssa_lib::{
    compile_unit, optimize_unit,
    outputter::{MipsOutputConfig, MipsOutputter},
    CompileError, Config, Stage,
};

pub struct CompileOpts {
    pub output_format: OutputFormat,
    pub register_names: bool,
}

/// Why a unit produced no output.
#[derive(Debug)]
pub enum Failure {
    Parse(ParseError),
    Compile(CompileError),
    Output(std::fmt::Error),
}

pub fn compile(
    source: &SimpleFile<String, String>,
    config: &Config,
    opts: &CompileOpts,
) -> Result<Vec<u8>, Failure> {
    let funcs = parse_unit(source.source(), config.registry()).map_err(Failure::Parse)?;
    log::info!("parsed {} functions from {}", funcs.len(), source.name());

    let stage = match opts.output_format {
        OutputFormat::Ssa => return Ok(print_funcs(&funcs)),
        OutputFormat::Opt => Stage::Opt,
        OutputFormat::Lowered => Stage::Lowered,
        OutputFormat::Scheduled => Stage::Scheduled,
        OutputFormat::MipsAsm | OutputFormat::ProgRustDbg => {
            let programs = compile_unit(config, funcs).map_err(Failure::Compile)?;
            if opts.output_format == OutputFormat::ProgRustDbg {
                return Ok(format!("{programs:#?}\n").into_bytes());
            }

            let mut output = String::new();
            MipsOutputter::new(&mut output)
                .with_config(MipsOutputConfig {
                    use_register_names: opts.register_names,
                })
                .write_programs(&programs)
                .map_err(Failure::Output)?;
            return Ok(output.into_bytes());
        }
    };

    let funcs = optimize_unit(config, funcs, stage).map_err(Failure::Compile)?;
    Ok(print_funcs(&funcs))
}

/// The functions in their textual form, separated by empty lines.
fn print_funcs(funcs: &[Func]) -> Vec<u8> {
    funcs
        .iter()
        .map(Func::to_string)
        .collect::<Vec<_>>()
        .join("\n")
        .into_bytes()
}
