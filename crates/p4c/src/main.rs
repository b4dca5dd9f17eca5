//! The front-end driver.
//!
//! `p4c <source.p4>` lexes, parses, and type-checks one source file.
//! Diagnostics print one line each, `<file>:<line>:<col>: error:
//! <message>`, to stderr; the process exits 0 on success and 1 on the
//! first diagnostic.

mod dump;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use p4_arena::MemoryPool;
use p4_common::{Diagnostic, Interner, SourceText};

/// Front end for the P4-16 data-plane language.
#[derive(Parser)]
#[command(name = "p4c", version, about)]
struct Cli {
    /// The source file to compile.
    source: PathBuf,

    /// Print the parsed tree to stdout.
    #[arg(long)]
    dump_ast: bool,

    /// Render diagnostics as annotated source snippets.
    #[arg(long)]
    pretty: bool,

    /// Emit diagnostics as JSON lines on stderr.
    #[arg(long)]
    json_diagnostics: bool,

    /// Keep lexical error tokens in the stream instead of stopping at
    /// the first one.
    #[arg(long)]
    lex_recover: bool,
}

/// The total virtual reservation backing the compiler's arenas.
const RESERVATION_BYTES: usize = 256 << 20;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let text = match std::fs::read_to_string(&cli.source) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{}: error: {e}.", cli.source.display());
            return ExitCode::FAILURE;
        }
    };
    let name = cli.source.display().to_string();
    match compile(&name, &text, &cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(diag) => {
            emit(&cli, &text, &diag);
            ExitCode::FAILURE
        }
    }
}

fn compile(name: &str, text: &str, cli: &Cli) -> Result<(), Diagnostic> {
    let src = SourceText::new(name, text);
    let pool = MemoryPool::reserve(RESERVATION_BYTES);
    let mut interner = Interner::new(pool);

    let tokens = p4_lexer::tokenize(&src, cli.lex_recover)?;
    let parse = p4_parser::parse(&src, &tokens, &mut interner)?;
    if cli.dump_ast {
        print!("{}", dump::render(&parse, &interner));
    }
    p4_typeck::analyze(&src, &parse, &mut interner)?;
    Ok(())
}

fn emit(cli: &Cli, text: &str, diag: &Diagnostic) {
    if cli.json_diagnostics {
        match serde_json::to_string(diag) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{diag}"),
        }
        return;
    }
    if cli.pretty {
        pretty(text, diag);
        return;
    }
    eprintln!("{diag}");
}

/// Annotated-snippet rendering behind `--pretty`; the plain one-line
/// format stays canonical.
fn pretty(text: &str, diag: &Diagnostic) {
    use ariadne::{Label, Report, ReportKind, Source};

    let file = diag.file.clone();
    let range = diag.span.start as usize..(diag.span.end as usize).max(diag.span.start as usize);
    let report = Report::build(ReportKind::Error, file.clone(), diag.span.start as usize)
        .with_message(&diag.message)
        .with_label(Label::new((file.clone(), range)).with_message(&diag.message))
        .finish();
    if report.eprint((file, Source::from(text))).is_err() {
        eprintln!("{diag}");
    }
}
