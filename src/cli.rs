//! Command-line surface: reads one source file and runs it through the
//! front-end, printing either a success summary or a formatted diagnostic.
//!
//! The flag set mirrors what a small single-TU C front-end's driver
//! typically exposes even though this crate never emits an object file:
//! most of these are accepted and otherwise inert, matching how the
//! original driver tolerated flags meant for other compilation stages.

use clap::Parser as ClapParser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser, Debug)]
#[command(name = "cparse", about = "Tokenizer, scope manager, type system, and parser for a C subset")]
pub struct Cli {
    /// Source file to compile.
    #[arg(short = 'c', long = "compile", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output path. Accepted for interface compatibility; this front-end
    /// does not generate code, so nothing is written here.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Additional include search path. Accepted and ignored: this
    /// front-end does not run a preprocessor.
    #[arg(short = 'i', long = "include", value_name = "PATH")]
    pub include: Vec<PathBuf>,

    /// Preprocessor macro definition. Accepted and ignored.
    #[arg(short = 'd', long = "define", value_name = "MACRO")]
    pub define: Vec<String>,

    /// Language mode hint. Accepted and ignored; this front-end only
    /// understands the one C subset it implements.
    #[arg(short = 'x', long = "lang", value_name = "MODE")]
    pub lang: Option<String>,

    /// Tokenize only and print the resulting token stream, skipping parsing
    /// entirely. The one flag that changes behavior.
    #[arg(short = 'E', long = "tokenize-only")]
    pub tokenize_only: bool,

    /// Positional source path, used when `-c` is omitted.
    pub positional: Option<PathBuf>,
}

impl Cli {
    fn source_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().or(self.positional.as_ref())
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let Some(path) = cli.source_path() else {
        eprintln!("cparse: no input file");
        return ExitCode::FAILURE;
    };

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cparse: could not read {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    if cli.tokenize_only {
        return run_tokenize_only(&source);
    }

    let arena = cparse::arena::Arena::new();
    match cparse::compile(&source, &arena) {
        Ok(unit) => {
            println!(
                "{}: parsed ok ({} string literal(s))",
                path.display(),
                unit.string_literals.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.display_with_source(&source));
            ExitCode::FAILURE
        }
    }
}

fn run_tokenize_only(source: &str) -> ExitCode {
    let mut interner = cparse::intern::Interner::new();
    let mut lexer = cparse::lexer::Lexer::new(source, &mut interner);
    match lexer.tokenize() {
        Ok(tokens) => {
            for tok in &tokens {
                println!("{:?} @ {}..{}", tok.kind, tok.span.start, tok.span.end);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.display_with_source(source));
            ExitCode::FAILURE
        }
    }
}
