//! sass-render CLI - Main entry point

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sass_render::{CompileError, CompileRequest, render_sync};

mod config;

#[derive(Parser, Debug)]
#[command(name = "sass-render")]
#[command(version)]
#[command(about = "Compile Sass/SCSS stylesheets to CSS", long_about = None)]
struct Cli {
    /// Entry stylesheet (with --stdin: only used to label the entry and
    /// anchor relative imports)
    input: Option<PathBuf>,

    /// Read the stylesheet source from standard input
    #[arg(long)]
    stdin: bool,

    /// Output style (nested, expanded, compact, compressed)
    #[arg(short = 't', long)]
    style: Option<String>,

    /// Indentation character (space, tab)
    #[arg(long)]
    indent_type: Option<String>,

    /// Indentation characters per nesting level (0-10)
    #[arg(long)]
    indent_width: Option<String>,

    /// Line ending (lf, cr, crlf, lfcr)
    #[arg(long)]
    linefeed: Option<String>,

    /// Directory to search for imports (repeatable)
    #[arg(short = 'I', long = "include-path")]
    include_paths: Vec<PathBuf>,

    /// Parse the entry with the indented syntax
    #[arg(long)]
    indented: bool,

    /// Suppress compiler warnings
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Never emit @charset or a byte-order mark
    #[arg(long)]
    no_charset: bool,

    /// YAML or JSON file with compile options
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write CSS to FILE instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Print timing and included files as JSON to stderr
    #[arg(long)]
    stats: bool,
}

impl Cli {
    /// Merge the config file, flags and `SASS_PATH` into one request.
    /// Flags override config values; include roots accumulate.
    fn to_request(
        &self,
        stdin_text: Option<String>,
        sass_path: Option<OsString>,
    ) -> Result<CompileRequest> {
        let mut request = match &self.config {
            Some(path) => config::load_config(path)?,
            None => CompileRequest::default(),
        };

        if let Some(text) = stdin_text {
            request.source_text = Some(text);
        }
        if let Some(input) = &self.input {
            request.source_path = Some(input.clone());
        }
        if let Some(style) = &self.style {
            request.output_style = Some(style.clone());
        }
        if let Some(indent_type) = &self.indent_type {
            request.indent_type = Some(indent_type.clone());
        }
        if let Some(width) = &self.indent_width {
            request.indent_width = Some(width.as_str().into());
        }
        if let Some(linefeed) = &self.linefeed {
            request.line_ending = Some(linefeed.clone());
        }
        if self.indented {
            request.indented_syntax = Some(true);
        }
        if self.quiet {
            request.quiet = true;
        }
        if self.no_charset {
            request.charset = Some(false);
        }

        request.include_roots.extend(self.include_paths.iter().cloned());
        request
            .include_roots
            .extend(config::sass_path_roots(sass_path.as_deref()));

        if request.source_text.is_none() && request.source_path.is_none() {
            anyhow::bail!("No input: pass a stylesheet path or --stdin");
        }
        Ok(request)
    }
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read stylesheet from stdin")?;
    Ok(text)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sass_render=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    debug!(?cli, "Parsed arguments");

    let stdin_text = if cli.stdin { Some(read_stdin()?) } else { None };
    let request = cli.to_request(stdin_text, std::env::var_os(config::SASS_PATH))?;

    let result = match render_sync(&request) {
        Ok(result) => result,
        Err(CompileError::Diagnostic(diagnostic)) => {
            eprintln!("{}", diagnostic.formatted());
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    match &cli.output {
        Some(path) => {
            let mut css = result.css.clone();
            css.push('\n');
            std::fs::write(path, css)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(output = %path.display(), "Wrote stylesheet");
        }
        None => println!("{}", result.css),
    }

    if cli.stats {
        let stats = serde_json::json!({
            "stats": result.stats,
            "includedFiles": result.included_files,
        });
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}
