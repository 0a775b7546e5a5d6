use crate::compile::Failure;

use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::SimpleFile,
    term::{
        self,
        termcolor::{ColorChoice, StandardStream},
    },
};
use is_terminal::IsTerminal;

pub fn eprint_failure(failure: &Failure, file: &SimpleFile<String, String>) {
    let color = if std::io::stderr().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut writer = StandardStream::stderr(color);
    let config = term::Config {
        chars: term::Chars {
            single_primary_caret: '─',
            single_secondary_caret: '─',
            multi_primary_caret_start: '╯',
            multi_secondary_caret_start: '╯',
            multi_primary_caret_end: '╯',
            multi_secondary_caret_end: '╯',
            ..term::Chars::box_drawing()
        },

        ..Default::default()
    };

    let diagnostic = match failure {
        Failure::Parse(err) => Diagnostic::error()
            .with_message("invalid input")
            .with_labels(vec![
                Label::primary((), err.span.clone()).with_message(&err.message)
            ]),
        Failure::Compile(err) => Diagnostic::bug()
            .with_message(format!("internal compiler error in `{}`", err.func))
            .with_code(err.ice.kind())
            .with_notes(vec![err.ice.to_string()]),
        Failure::Output(err) => Diagnostic::bug().with_message(format!("couldn't format: {err}")),
    };

    if let Err(err) = term::emit(&mut writer, &config, file, &diagnostic) {
        log::error!("couldn't report a diagnostic: {err}");
    }
}
