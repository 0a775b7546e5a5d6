use std::fs;

use ssa_ir::parse_unit;
use ssa_lib::{
    compile_unit,
    outputter::{MipsOutputConfig, MipsOutputter},
    CompileError, ConfigBuilder,
};

include! {concat!(env!("OUT_DIR"), "/tests.rs")}

pub fn compile(file_name: &str) -> Result<String, CompileError> {
    let source = fs::read_to_string(file_name).unwrap();
    let config = ConfigBuilder::new()
        .check_after_each_pass(true)
        .build()
        .unwrap();
    let funcs = parse_unit(&source, config.registry())
        .unwrap_or_else(|err| panic!("Failed to parse `{file_name}`: {err} at {:?}", err.span));

    let programs = compile_unit(&config, funcs)?;
    let mut output = String::new();
    MipsOutputter::new(&mut output)
        .with_config(MipsOutputConfig {
            use_register_names: true,
        })
        .write_programs(&programs)
        .unwrap();
    Ok(output)
}

/// The lines of the assembly with the tabs between the fields replaced by single spaces.
fn normalized_lines(file: &str) -> Vec<String> {
    let output = match compile(file) {
        Ok(output) => output,
        Err(err) => panic!("Expected file `{file}` to compile successfully but got: {err}"),
    };
    output
        .lines()
        .map(|line| {
            line.split('\t')
                .filter(|field| !field.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn asm_test(file: &str, expected: &[&str]) {
    let lines = normalized_lines(file);
    pretty_assertions::assert_eq!(
        expected.join("\n"),
        lines.join("\n"),
        "The expected assembly (left) does not match the generated one (right)",
    );
}

fn contains_test(file: &str, expected: &[&str]) {
    let lines = normalized_lines(file);
    for line in expected {
        if !lines.iter().any(|l| l == line) {
            println!("Generated assembly:\n{}", lines.join("\n"));
            panic!("Expected the assembly to contain `{line}`");
        }
    }
}

fn lacks_test(file: &str, unexpected: &[&str]) {
    let lines = normalized_lines(file);
    for text in unexpected {
        if lines.iter().any(|l| l.contains(text)) {
            println!("Generated assembly:\n{}", lines.join("\n"));
            panic!("Expected the assembly not to contain `{text}`");
        }
    }
}

fn ice_test(file: &str, kind: &str) {
    match compile(file) {
        Ok(output) => panic!("Expected compile to fail, but it produced:\n{output}"),
        Err(err) => {
            if err.ice.kind() != kind {
                panic!("Expected an internal compiler error of kind `{kind}`, but got: {err}");
            }
        }
    }
}
