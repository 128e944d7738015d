//! `pagepress` command line.
//!
//! Reads an inlined HTML document (or stdin with `-`) and writes either the
//! document itself, optionally minified, or its self-extracting replacement
//! when `--inject-compiled-page` is given.

use std::error::Error;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use pagepress::html_minify::minify_html_document;
use pagepress::{compile, CompileLimits, CompileOptions, HtmlMinifyOptions, JsMinifyOptions};

/// Compile a self-contained HTML page into a self-extracting one
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Replace the document with a compressed self-extracting script
    #[arg(long, action = ArgAction::SetTrue)]
    inject_compiled_page: bool,

    /// Minify the HTML before compiling or writing it
    #[arg(long, action = ArgAction::SetTrue)]
    minify_html: bool,

    /// Minify the generated bootstrap script
    #[arg(long, action = ArgAction::SetTrue)]
    minify_js: bool,

    /// Keep HTML comments when minifying
    #[arg(long, action = ArgAction::SetTrue)]
    keep_comments: bool,

    /// Reject documents larger than this many bytes
    #[arg(long, value_name = "N")]
    max_input_bytes: Option<usize>,

    /// Rebuild the compiled page in-process and compare with the source
    #[arg(long, action = ArgAction::SetTrue)]
    verify: bool,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Input HTML file, or `-` for stdin
    input: PathBuf,
}

impl Cli {
    fn options(&self) -> CompileOptions {
        let mut options = CompileOptions::default();
        if self.minify_html {
            options = options.with_minify_html(HtmlMinifyOptions {
                keep_comments: self.keep_comments,
                ..HtmlMinifyOptions::default()
            });
        }
        if self.minify_js {
            options = options.with_minify_js(JsMinifyOptions::default());
        }
        if let Some(max_input_bytes) = self.max_input_bytes {
            options = options.with_limits(CompileLimits {
                max_input_bytes,
                ..CompileLimits::default()
            });
        }
        options
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("pagepress: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let html = read_input(&cli.input)?;
    let options = cli.options();

    if !cli.inject_compiled_page {
        let out = if options.minify_html {
            minify_html_document(&html, options.html_minify)?
        } else {
            html
        };
        return write_output(cli.output.as_deref(), &out);
    }

    let compiled = compile(&html, &options)?;
    if cli.verify {
        let expected = if options.minify_html {
            minify_html_document(&html, options.html_minify)?
        } else {
            html
        };
        if compiled.page.reconstruct()? != expected {
            return Err("verification failed: rebuilt page differs from source".into());
        }
        log::info!("verified {} bytes", expected.len());
    }

    eprintln!("{}", compiled.report);
    write_output(cli.output.as_deref(), &compiled.to_document()?)
}

fn read_input(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut html = String::new();
        io::stdin().read_to_string(&mut html)?;
        Ok(html)
    } else {
        fs::read_to_string(path)
    }
}

fn write_output(path: Option<&Path>, document: &str) -> Result<(), Box<dyn Error>> {
    match path {
        Some(path) => fs::write(path, document)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
