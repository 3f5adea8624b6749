mod cli;

use std::process::ExitCode;

use cli::{Params, build_cli};

fn main() -> ExitCode {
    let matches = build_cli().get_matches();
    let params = Params::from_matches(&matches);

    for warning in params.extension_warnings() {
        eprintln!("pargen warning: {warning}");
    }

    match pargen_compiler::generate(&params.options) {
        Ok(generated) => {
            if generated.diagnostics.has_warnings() {
                eprintln!("{}", render_warnings(&params, &generated.diagnostics));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("pargen: error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Warnings carry spans into the grammar file; render them as annotated
/// snippets when the file is still readable, plainly otherwise.
fn render_warnings(params: &Params, diagnostics: &pargen_core::Diagnostics) -> String {
    let path = params
        .options
        .peg_path
        .as_deref()
        .unwrap_or(&params.options.tok_path);
    match std::fs::read_to_string(path) {
        Ok(source) => diagnostics
            .printer()
            .source(&source)
            .path(&path.display().to_string())
            .render(),
        Err(_) => diagnostics.printer().render(),
    }
}
