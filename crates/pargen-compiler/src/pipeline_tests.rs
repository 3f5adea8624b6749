use std::fs;
use std::path::PathBuf;

use indoc::indoc;

use crate::{Error, Options, generate, generate_to_string};

const CALC_TOK: &str = indoc! {r#"
    PLUS: "+"
    NUMBER: (0-1, 1, [0-9]); 1
"#};

const CALC_PEG: &str = indoc! {r#"
    expr <- NUMBER (PLUS NUMBER:n {rule = node(PLUS, rule, n)})*
"#};

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("write fixture");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn calc_options(fixture: &Fixture) -> Options {
    let tok = fixture.write("calc.tok", CALC_TOK);
    let peg = fixture.write("calc.peg", CALC_PEG);
    Options::new(tok)
        .grammar(peg)
        .output(fixture.path("calc.h"))
}

#[test]
fn generates_and_writes_the_output_file() {
    let fixture = Fixture::new();
    let generated = generate(&calc_options(&fixture)).unwrap();
    assert_eq!(generated.out_path, fixture.path("calc.h"));

    let on_disk = fs::read_to_string(&generated.out_path).unwrap();
    assert_eq!(on_disk, generated.output);
    assert!(on_disk.contains("calc_parse_expr"));
    assert!(generated.diagnostics.is_empty());
}

#[test]
fn generating_twice_is_byte_identical() {
    let fixture = Fixture::new();
    let options = calc_options(&fixture);
    let first = generate(&options).unwrap();
    let second = generate(&options).unwrap();
    assert_eq!(first.output, second.output);
}

#[test]
fn syntax_errors_leave_no_output_behind() {
    let fixture = Fixture::new();
    let tok = fixture.write("calc.tok", CALC_TOK);
    let peg = fixture.write("calc.peg", "expr <- <-");
    let options = Options::new(tok).grammar(peg).output(fixture.path("calc.h"));

    let err = generate(&options).unwrap_err();
    assert!(matches!(err, Error::GrammarSyntax { .. }), "got: {err}");
    assert!(!fixture.path("calc.h").exists(), "partial output was written");
}

#[test]
fn missing_tokenizer_file_is_a_read_error() {
    let fixture = Fixture::new();
    let options = Options::new(fixture.path("nope.tok"));
    let err = generate_to_string(&options).unwrap_err();
    assert!(matches!(err, Error::FileRead { .. }));
}

#[test]
fn invalid_utf8_reports_the_byte_offset() {
    let fixture = Fixture::new();
    let path = fixture.path("bad.tok");
    fs::write(&path, [b'P', b'L', 0xC0, b'!']).unwrap();
    let err = generate_to_string(&Options::new(path)).unwrap_err();
    assert!(matches!(err, Error::InvalidUtf8 { offset: 2, .. }), "got: {err}");
}

#[test]
fn empty_token_grammar_is_rejected() {
    let fixture = Fixture::new();
    let tok = fixture.write("empty.tok", "// nothing here\n");
    let err = generate_to_string(&Options::new(tok)).unwrap_err();
    assert!(matches!(err, Error::EmptyGrammar));
}

#[test]
fn tokenizer_only_run_without_grammar_file() {
    let fixture = Fixture::new();
    let tok = fixture.write("calc.tok", CALC_TOK);
    let options = Options::new(tok).output(fixture.path("calc.h"));
    let generated = generate(&options).unwrap();
    assert!(generated.output.contains("calc_nextToken"));
    assert!(!generated.output.contains("calc_parse_"));
}

#[test]
fn empty_grammar_file_generates_a_bare_recognizer() {
    let fixture = Fixture::new();
    let tok = fixture.write("calc.tok", CALC_TOK);
    let peg = fixture.write("calc.peg", "");
    let options = Options::new(tok).grammar(peg).output(fixture.path("calc.h"));
    let generated = generate(&options).unwrap();
    // Parser scaffolding exists, but there are no rule functions.
    assert!(generated.output.contains("calc_parser_ctx_init"));
    assert!(!generated.output.contains("calc_parse_expr"));
}

#[test]
fn default_output_path_derives_from_the_grammar_name() {
    let options = Options::new("x/calc.tok").grammar("x/mylang.peg");
    assert_eq!(options.resolved_out_path(), PathBuf::from("mylang.h"));
    assert_eq!(options.prefix(), "mylang");

    let options = Options::new("x/calc.tok");
    assert_eq!(options.resolved_out_path(), PathBuf::from("calc.h"));
}

#[test]
fn demo_grammars_generate() {
    let fixture = Fixture::new();
    let demos = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos"));
    let options = Options::new(demos.join("calc.tok"))
        .grammar(demos.join("calc.peg"))
        .output(fixture.path("calc.h"));
    let generated = generate(&options).unwrap();
    assert!(generated.diagnostics.is_empty());
    assert!(generated.output.contains("calc_parse_baseexpr"));
    assert!(generated.output.contains("rule = node(PLUS, rule, n);"));
}

#[test]
fn output_goes_exactly_where_requested() {
    let fixture = Fixture::new();
    let tok = fixture.write("calc.tok", CALC_TOK);
    let out = fixture.path("nested").join("gen.h");
    fs::create_dir_all(out.parent().unwrap()).unwrap();
    let generated = generate(&Options::new(tok).output(&out)).unwrap();
    assert_eq!(generated.out_path, out);
    assert!(out.exists());
}
