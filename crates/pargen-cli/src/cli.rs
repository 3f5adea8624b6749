//! Command-line definition and parameter extraction.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use pargen_compiler::Options;

pub fn build_cli() -> Command {
    Command::new("pargen")
        .about("pargen - a tokenizer and parser generator")
        .arg(
            Arg::new("tokenizer_file")
                .value_name("INPUT_TOK")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Tokenizer grammar file (.tok)"),
        )
        .arg(
            Arg::new("grammar_file")
                .value_name("INPUT_PEG")
                .value_parser(value_parser!(PathBuf))
                .help("Parser grammar file (.peg)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Output path (defaults to the grammar basename with .h)"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable extra generator assertions and runtime sanity checks"),
        )
        .arg(
            Arg::new("tokenizer_debug")
                .short('t')
                .long("tokenizer-debug")
                .action(ArgAction::SetTrue)
                .help("Generate an interactive tokenizer"),
        )
        .arg(
            Arg::new("grammar_debug")
                .short('g')
                .long("grammar-debug")
                .action(ArgAction::SetTrue)
                .help("Generate an interactive parser"),
        )
        .arg(
            Arg::new("memdebug")
                .short('m')
                .long("memdebug")
                .action(ArgAction::SetTrue)
                .help("Debug the generated memory allocator"),
        )
        .arg(
            Arg::new("unsafe")
                .short('u')
                .long("unsafe")
                .action(ArgAction::SetTrue)
                .help("Don't check for errors. Much faster"),
        )
        .arg(
            Arg::new("line_directives")
                .short('l')
                .long("line-directives")
                .action(ArgAction::SetTrue)
                .help("Emit #line directives for action fragments"),
        )
}

pub struct Params {
    pub options: Options,
}

impl Params {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let tok = matches
            .get_one::<PathBuf>("tokenizer_file")
            .expect("clap enforces the tokenizer file")
            .clone();

        let mut options = Options::new(tok);
        options.peg_path = matches.get_one::<PathBuf>("grammar_file").cloned();
        options.out_path = matches.get_one::<PathBuf>("output").cloned();
        options.debug = matches.get_flag("debug");
        options.tokenizer_debug = matches.get_flag("tokenizer_debug");
        options.grammar_debug = matches.get_flag("grammar_debug");
        options.memdebug = matches.get_flag("memdebug");
        options.unsafe_gen = matches.get_flag("unsafe");
        options.line_directives = matches.get_flag("line_directives");

        Self { options }
    }

    /// Unconventional extensions warn but never stop the run; the message
    /// exists because swapped arguments are the usual cause.
    pub fn extension_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.options.tok_path.extension().is_none_or(|e| e != "tok") {
            warnings.push(format!(
                "tokenizer file {} does not end in .tok. Proceeding anyway.",
                self.options.tok_path.display()
            ));
        }
        if let Some(peg) = &self.options.peg_path
            && peg.extension().is_none_or(|e| e != "peg")
        {
            warnings.push(format!(
                "grammar file {} does not end in .peg. Proceeding anyway.",
                peg.display()
            ));
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(args: &[&str]) -> Params {
        let matches = build_cli()
            .try_get_matches_from(args)
            .expect("arguments should parse");
        Params::from_matches(&matches)
    }

    #[test]
    fn positional_targets_and_output() {
        let p = params(&["pargen", "calc.tok", "calc.peg", "-o", "out/calc.h"]);
        assert_eq!(p.options.tok_path, PathBuf::from("calc.tok"));
        assert_eq!(p.options.peg_path, Some(PathBuf::from("calc.peg")));
        assert_eq!(p.options.out_path, Some(PathBuf::from("out/calc.h")));
    }

    #[test]
    fn tokenizer_file_is_required() {
        assert!(build_cli().try_get_matches_from(["pargen"]).is_err());
    }

    #[test]
    fn all_switches_parse() {
        let p = params(&["pargen", "calc.tok", "-d", "-t", "-g", "-m", "-u", "-l"]);
        assert!(p.options.debug);
        assert!(p.options.tokenizer_debug);
        assert!(p.options.grammar_debug);
        assert!(p.options.memdebug);
        assert!(p.options.unsafe_gen);
        assert!(p.options.line_directives);
    }

    #[test]
    fn long_switches_parse() {
        let p = params(&["pargen", "calc.tok", "--unsafe", "--grammar-debug"]);
        assert!(p.options.unsafe_gen);
        assert!(p.options.grammar_debug);
    }

    #[test]
    fn extension_mismatches_warn_but_proceed() {
        let p = params(&["pargen", "calc.txt", "grammar.txt"]);
        let warnings = p.extension_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains(".tok"));
        assert!(warnings[1].contains(".peg"));

        let p = params(&["pargen", "calc.tok", "calc.peg"]);
        assert!(p.extension_warnings().is_empty());
    }
}
