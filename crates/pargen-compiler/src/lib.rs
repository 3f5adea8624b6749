//! pargen compiler: grammar files in, self-contained C99 recognizer out.
//!
//! The pipeline is strictly linear and all-or-nothing:
//!
//! ```text
//! read -> parse (.tok, .peg) -> analyze -> tokenizer IR + PEG IR -> emit
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pargen_compiler::{Options, generate};
//!
//! let options = Options::new("calc.tok").grammar("calc.peg");
//! let generated = generate(&options).expect("valid grammar");
//! eprintln!("wrote {}", generated.out_path.display());
//! ```

pub mod analyze;
pub mod ast;
pub mod emit;
pub mod ir;
pub mod lexer;
pub mod parser;



#[cfg(test)]
mod pipeline_tests;

use std::path::{Path, PathBuf};

use pargen_core::{Diagnostics, SourceError, SourceFile};

/// Everything that can abort a generation run. Exit code 1, no output file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8 (byte offset {offset})", .path.display())]
    InvalidUtf8 { path: PathBuf, offset: usize },

    #[error(
        "{}:{line}:{col}: syntax error: expected {expected}, found {found}",
        .path.display()
    )]
    GrammarSyntax {
        path: PathBuf,
        line: u32,
        col: u32,
        expected: String,
        found: String,
    },

    #[error("there are two or more tokens named {name}")]
    DuplicateToken { name: String },

    #[error("{name} is reserved for the token stream sentinels")]
    ReservedToken { name: String },

    #[error("tokenizer literals {first} and {second} are equal")]
    DuplicateLiteral { first: String, second: String },

    #[error("there are two or more rules named {name}")]
    DuplicateRule { name: String },

    #[error("node kind {name} is declared more than once")]
    DuplicateNodeKind { name: String },

    #[error("{name} appears as a rule, but has no definition")]
    UndefinedRule { name: String },

    #[error("{name} appears in the parser, but has no token definition")]
    UndefinedToken { name: String },

    #[error("cannot resolve the reference in {rule}: there is no {direction} rule")]
    NoSuchNeighbor {
        rule: String,
        direction: &'static str,
    },

    #[error("cannot use {name} as a label: it is a rule name or reserved")]
    LabelCollision { name: String },

    #[error("no rule can be named {name}")]
    ReservedRuleName { name: String },

    #[error("no token rules are defined, so there is nothing to generate")]
    EmptyGrammar,

    #[error("could not write output: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SourceError> for Error {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Read { path, source } => Error::FileRead { path, source },
            SourceError::InvalidUtf8 { path, offset } => Error::InvalidUtf8 { path, offset },
        }
    }
}

/// Configuration for one generation run.
#[derive(Debug, Clone)]
pub struct Options {
    pub tok_path: PathBuf,
    pub peg_path: Option<PathBuf>,
    pub out_path: Option<PathBuf>,
    /// Extra generator assertions and runtime sanity checks.
    pub debug: bool,
    /// Emit the interactive tokenizer trace frontend.
    pub tokenizer_debug: bool,
    /// Emit the interactive parser trace frontend.
    pub grammar_debug: bool,
    /// Emit allocator trace hooks.
    pub memdebug: bool,
    /// Skip generated safety checks.
    pub unsafe_gen: bool,
    /// Emit `#line` directives around spliced action fragments.
    pub line_directives: bool,
}

impl Options {
    pub fn new(tok_path: impl Into<PathBuf>) -> Self {
        Self {
            tok_path: tok_path.into(),
            peg_path: None,
            out_path: None,
            debug: false,
            tokenizer_debug: false,
            grammar_debug: false,
            memdebug: false,
            unsafe_gen: false,
            line_directives: false,
        }
    }

    pub fn grammar(mut self, peg_path: impl Into<PathBuf>) -> Self {
        self.peg_path = Some(peg_path.into());
        self
    }

    pub fn output(mut self, out_path: impl Into<PathBuf>) -> Self {
        self.out_path = Some(out_path.into());
        self
    }

    /// Output path, defaulting to `<prefix>.h` in the current directory.
    pub fn resolved_out_path(&self) -> PathBuf {
        match &self.out_path {
            Some(path) => path.clone(),
            None => PathBuf::from(format!("{}.h", self.prefix())),
        }
    }

    /// Symbol prefix for the generated code, derived from the grammar file
    /// name (or the tokenizer file name when no grammar is given).
    pub fn prefix(&self) -> String {
        let source = self.peg_path.as_deref().unwrap_or(&self.tok_path);
        emit::prefix_from_path(source)
    }
}

/// A successful run: the output text, where it was written, and any
/// warnings collected along the way.
#[derive(Debug)]
pub struct Generated {
    pub output: String,
    pub out_path: PathBuf,
    pub diagnostics: Diagnostics,
}

/// Runs the whole pipeline in memory. Warnings end up in the returned
/// [`Diagnostics`]; any error aborts with no output.
pub fn generate_to_string(options: &Options) -> Result<(String, Diagnostics), Error> {
    let mut diagnostics = Diagnostics::new();

    let tok_source = SourceFile::read(&options.tok_path)?;
    let tok_grammar = parser::parse_token_file(&tok_source)?;

    let peg_source = match &options.peg_path {
        Some(path) => Some(SourceFile::read(path)?),
        None => None,
    };
    let peg_grammar = peg_source
        .as_ref()
        .map(parser::parse_grammar_file)
        .transpose()?;
    let has_parser = peg_grammar.is_some();

    let symtab = analyze::analyze(tok_grammar, peg_grammar, &mut diagnostics)?;

    let tokenizer_ir = ir::build_tokenizer_ir(&symtab.token_defs)?;
    if tokenizer_ir.is_empty() {
        return Err(Error::EmptyGrammar);
    }

    let peg_ir = has_parser.then(|| ir::peg::lower(&symtab));

    let output = emit::emit(
        &symtab,
        &tokenizer_ir,
        peg_ir.as_ref(),
        options,
        &mut diagnostics,
    )?;

    Ok((output, diagnostics))
}

/// Runs the pipeline and writes the output atomically: the text goes to a
/// temporary file in the output directory which is renamed over the target
/// only on full success. Partial output never reaches the output path.
pub fn generate(options: &Options) -> Result<Generated, Error> {
    let (output, diagnostics) = generate_to_string(options)?;
    let out_path = options.resolved_out_path();
    write_atomically(&out_path, &output)?;
    Ok(Generated {
        output,
        out_path,
        diagnostics,
    })
}

fn write_atomically(out_path: &Path, content: &str) -> Result<(), Error> {
    use std::io::Write;

    let dir = match out_path.parent() {
        Some(parent) if parent != Path::new("") => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(out_path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}
