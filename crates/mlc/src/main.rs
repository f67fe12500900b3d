use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use mlc::diagnostics::{diagnostic_from_anyhow, diagnostic_from_frontend_error, DiagnosticStage};
use mlc::{FrontendError, Program, Token};
use tracing::{debug, info, trace};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

fn main() -> anyhow::Result<()> {
    initialize_logging();

    let mlc = Mlc::parse();

    let result = match mlc.subcmd {
        MlcSubcommand::Tokens(opts) => print_tokens(opts),
        MlcSubcommand::Check(opts) => {
            let current_dir = std::env::current_dir()?;
            check(&current_dir, opts)
        }
    };
    if result.as_ref().is_err_and(|err| err.downcast_ref::<Rendered>().is_some()) {
        std::process::exit(1);
    }
    result
}

/// Context of an error whose diagnostic has already been written to stderr.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Rendered(String);

fn read_source(path: &Path) -> anyhow::Result<String> {
    let source = std::fs::read_to_string(path)
        .with_context(|| Rendered(format!("failed to read {}", path.display())))
        .inspect_err(|err| {
            let diagnostic = diagnostic_from_anyhow(
                DiagnosticStage::Io,
                "MLC-IO-001",
                "cannot read source",
                err,
                Some(path),
            );
            eprintln!("{}", diagnostic.render_terminal_auto());
        })?;
    trace!(source_len = source.len(), "Read input file");
    Ok(source)
}

fn report(source: &str, path: &Path, err: FrontendError) -> anyhow::Error {
    let diagnostic = diagnostic_from_frontend_error(source, Some(path), &err);
    eprintln!("{}", diagnostic.render_terminal_auto());
    anyhow::Error::new(err).context(Rendered(format!("{} was rejected", path.display())))
}

fn print_tokens(opts: TokensOpts) -> anyhow::Result<()> {
    let source_path = Path::new(&opts.source);
    let source = read_source(source_path)?;
    let tokens = mlc::tokenize(&source).map_err(|err| report(&source, source_path, err.into()))?;
    for token in &tokens {
        println!("{:<24} {:<12} {}", token.kind.describe(), format!("{:?}", token.text), token.line);
    }
    Ok(())
}

fn run_frontend(source: &str) -> Result<(Vec<Token>, Program), FrontendError> {
    let tokens = mlc::tokenize(source)?;
    debug!(count = tokens.len(), "Tokenized source file");
    let program = mlc::parse(&tokens)?;
    debug!("Parsed source file");
    let program = mlc::analyze(program)?;
    Ok((tokens, program))
}

fn check(current_dir: &Path, opts: CheckOpts) -> anyhow::Result<()> {
    let source_path = Path::new(&opts.source);
    let source = read_source(source_path)?;
    let (tokens, program) =
        run_frontend(&source).map_err(|err| report(&source, source_path, err))?;

    let out_dir = opts
        .out_dir
        .unwrap_or_else(|| current_dir.join("target").join("mlc"));
    write_artifacts(&out_dir, &tokens, &program)?;

    println!("{}: ok", source_path.display());
    Ok(())
}

fn write_artifacts(out_dir: &Path, tokens: &[Token], program: &Program) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let tokens_path = out_dir.join("tokens.json");
    std::fs::write(&tokens_path, serde_json::to_string_pretty(tokens)?)
        .with_context(|| format!("failed to write {}", tokens_path.display()))?;
    info!(tokens_path = %tokens_path.display(), "Tokens written");

    let dump_path = out_dir.join("ast.txt");
    let mut dump = mlc::dump(program);
    dump.push('\n');
    std::fs::write(&dump_path, dump)
        .with_context(|| format!("failed to write {}", dump_path.display()))?;
    info!(dump_path = %dump_path.display(), "Typed tree dump written");

    let ast_path = out_dir.join("ast.json");
    std::fs::write(&ast_path, serde_json::to_string_pretty(program)?)
        .with_context(|| format!("failed to write {}", ast_path.display()))?;
    info!(ast_path = %ast_path.display(), "Typed tree written");

    Ok(())
}

fn initialize_logging() {
    let env_filter = env::var("RUST_LOG").unwrap_or_default();
    let filter = EnvFilter::from_str(&env_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(filter))
        .init();
}

#[derive(clap::Parser)]
#[clap(name = "mlc", about = "Checks programs written in the dim model language.")]
struct Mlc {
    #[clap(subcommand)]
    subcmd: MlcSubcommand,
}

#[derive(clap::Subcommand)]
enum MlcSubcommand {
    /// Print the token stream of a source file
    Tokens(TokensOpts),
    /// Parse and type-check a source file
    Check(CheckOpts),
}

#[derive(clap::Parser)]
struct TokensOpts {
    source: String,
}

#[derive(clap::Parser)]
struct CheckOpts {
    source: String,

    /// Directory for tokens.json, ast.txt and ast.json (default: target/mlc)
    #[clap(short, long)]
    out_dir: Option<PathBuf>,
}
