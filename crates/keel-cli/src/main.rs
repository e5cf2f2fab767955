//! # keel-cli
//!
//! Command-line interface for the keel resource definition language.
//!
//! Parses `.keel` files and reports every lexical and syntax error with a
//! source excerpt. Also dumps token streams and syntax trees for debugging.

mod config;
mod errors;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use keel_syntax::{Diagnostic, LexOptions, ParseOutput, parse_source_with, tokenize_with};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use config::Config;
use errors::Report;

/// Parser recursion is bounded by `max_depth`, not by the thread's stack.
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Parser and checker for keel resource definitions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Read configuration from this file instead of .keelrc
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum nesting depth accepted by the parser
    #[arg(long, global = true, value_name = "N")]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Parse files and report every diagnostic")]
    Check {
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,
        /// Show at most N diagnostics per file (0 = all)
        #[arg(long, value_name = "N")]
        max_errors: Option<usize>,
    },
    #[command(about = "Print the token stream of a file")]
    Tokens {
        file: PathBuf,
        /// Keep comments and newlines
        #[arg(long)]
        trivia: bool,
    },
    #[command(about = "Print the syntax tree of a file")]
    Ast { file: PathBuf },
    #[command(about = "Print the effective configuration")]
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    let max_errors = match &cli.command {
        Commands::Check { max_errors, .. } => *max_errors,
        _ => None,
    };
    config.merge_cli_args(cli.no_color, cli.verbose, cli.max_depth, max_errors);

    if !config.colored {
        colored::control::set_override(false);
    }

    tracing_subscriber::fmt()
        .with_max_level(config.level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    debug!("Effective config: {:?}", config);

    let clean = match cli.command {
        Commands::Check { files, .. } => check_files(&files, &config)?,
        Commands::Tokens { file, trivia } => print_tokens(&file, trivia)?,
        Commands::Ast { file } => print_ast(&file, &config)?,
        Commands::Config => {
            print!("{}", config.to_toml()?);
            true
        }
    };

    if !clean {
        std::process::exit(1);
    }
    Ok(())
}

struct Checked {
    path: PathBuf,
    source: String,
    output: ParseOutput,
}

fn parse_file(path: &Path, config: &Config) -> Result<Checked> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let output = parse_source_with(&source, &path.display().to_string(), config.parse_options());
    debug!(
        "Parsed {}: {} resources, {} diagnostics",
        path.display(),
        output.program.resources.len(),
        output.diagnostics.len()
    );
    Ok(Checked {
        path: path.to_path_buf(),
        source,
        output,
    })
}

fn check_files(files: &[PathBuf], config: &Config) -> Result<bool> {
    let pool = rayon::ThreadPoolBuilder::new()
        .stack_size(WORKER_STACK_SIZE)
        .build()
        .context("Failed to start worker threads")?;

    info!("Checking {} files", files.len());
    let results: Vec<Result<Checked>> =
        pool.install(|| files.par_iter().map(|path| parse_file(path, config)).collect());

    let mut total_diagnostics = 0;
    let mut failed_files = 0;

    for result in results {
        let checked = match result {
            Ok(checked) => checked,
            Err(e) => {
                eprintln!("{} {:#}", "error:".red().bold(), e);
                failed_files += 1;
                continue;
            }
        };

        let diagnostics = &checked.output.diagnostics;
        if diagnostics.is_empty() {
            println!(
                "{} {}",
                "ok".green().bold(),
                checked.path.display().to_string().dimmed()
            );
            continue;
        }

        failed_files += 1;
        total_diagnostics += diagnostics.len();
        render_diagnostics(diagnostics, &checked.source, config.max_errors);
    }

    println!();
    if failed_files == 0 {
        println!(
            "{} {}",
            "Passed".green().bold(),
            format!("{} files checked", files.len()).dimmed()
        );
        Ok(true)
    } else {
        println!(
            "{} {}",
            "Failed".red().bold(),
            format!(
                "{} diagnostics in {} of {} files",
                total_diagnostics,
                failed_files,
                files.len()
            )
            .dimmed()
        );
        Ok(false)
    }
}

fn render_diagnostics(diagnostics: &[Diagnostic], source: &str, max_errors: usize) {
    let shown = if max_errors == 0 {
        diagnostics.len()
    } else {
        max_errors.min(diagnostics.len())
    };

    for diagnostic in &diagnostics[..shown] {
        eprintln!("{}", Report::new(diagnostic, source).render());
    }

    if shown < diagnostics.len() {
        eprintln!(
            "{}",
            format!("... and {} more", diagnostics.len() - shown).dimmed()
        );
    }
}

fn print_tokens(path: &Path, trivia: bool) -> Result<bool> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file = path.display().to_string();
    let output = tokenize_with(
        &source,
        &file,
        LexOptions {
            preserve_trivia: trivia,
        },
    );

    for token in &output.tokens {
        let position = format!("{}:{}", token.line(), token.column());
        println!("{:>8}  {:?}", position.dimmed(), token.token);
    }

    let file: Arc<str> = Arc::from(file);
    let diagnostics: Vec<Diagnostic> = output
        .errors
        .into_iter()
        .map(|e| Diagnostic::lex(file.clone(), e))
        .collect();
    render_diagnostics(&diagnostics, &source, 0);

    Ok(diagnostics.is_empty())
}

fn print_ast(path: &Path, config: &Config) -> Result<bool> {
    let checked = parse_file(path, config)?;

    println!("{:#?}", checked.output.program);
    render_diagnostics(&checked.output.diagnostics, &checked.source, config.max_errors);

    Ok(checked.output.diagnostics.is_empty())
}
