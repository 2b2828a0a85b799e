//! WebTeX CLI - repair and render LaTeX math found in plain text

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::sync::Arc;
use webtex::{
    diagnostics::{DiagnosticSink, LogSink, MemorySink},
    extract::find_matches,
    normalize::{simplify, simplify_with_trace},
    pipeline::MathRenderer,
    renderer::LintRenderer,
    Document, Engine, EngineConfig,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "webtex")]
#[command(version)]
#[command(about = "WebTeX - detect, repair and render LaTeX math embedded in text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Engine configuration file (TOML)
    #[cfg(feature = "config-file")]
    #[arg(long, global = true)]
    config: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Normalize a single math expression (without delimiters)
    Simplify {
        /// Expression; reads stdin if omitted
        tex: Option<String>,

        /// Print the output of every normalizer pass
        #[arg(long)]
        passes: bool,
    },

    /// List the math spans found in a text file as JSON
    Extract {
        /// Input file path (reads from stdin if not provided)
        input: Option<String>,
    },

    /// Render a text file to an HTML fragment
    Render {
        /// Input file path (reads from stdin if not provided)
        input: Option<String>,

        /// Output file path (writes to stdout if not provided)
        #[arg(short, long)]
        output: Option<String>,

        /// Write renderer failures as JSON to this path
        #[arg(long)]
        diagnostics: Option<String>,

        /// Typeset with KaTeX instead of the lint renderer
        #[cfg(feature = "katex")]
        #[arg(long)]
        katex: bool,
    },
}

// =============================================================================
// Logging
// =============================================================================

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => log::LevelFilter::Error,
        (false, 0) => log::LevelFilter::Warn,
        (false, 1) => log::LevelFilter::Info,
        (false, 2) => log::LevelFilter::Debug,
        (false, _) => log::LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// =============================================================================
// Input / output
// =============================================================================

fn read_input(path: Option<&str>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, content),
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(content.as_bytes())?;
            stdout.write_all(b"\n")
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message.to_string())
}

/// One `<p>` per blank-line separated block.
fn document_from_text(text: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    for block in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let p = doc.create_element("p");
        let t = doc.create_text(block);
        doc.append_child(p, t);
        doc.append_child(root, p);
    }
    doc
}

#[cfg(feature = "cli")]
fn load_config(cli: &Cli) -> io::Result<EngineConfig> {
    #[cfg(feature = "config-file")]
    if let Some(path) = &cli.config {
        let text = fs::read_to_string(path)?;
        return EngineConfig::from_toml_str(&text).map_err(invalid);
    }
    let _ = cli;
    let config = EngineConfig::from_env();
    config.validate().map_err(invalid)?;
    Ok(config)
}

// =============================================================================
// Commands
// =============================================================================

#[cfg(feature = "cli")]
fn main() -> io::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Simplify { tex, passes } => {
            let tex = match tex {
                Some(tex) => tex,
                None => read_input(None)?,
            };
            let tex = tex.trim();
            if passes {
                for step in simplify_with_trace(tex) {
                    let mark = if step.changed { '*' } else { ' ' };
                    println!("{} {:<22} {}", mark, step.pass, step.output);
                }
            }
            write_output(None, &simplify(tex))
        }
        Commands::Extract { input } => {
            let text = read_input(input.as_deref())?;
            let matches = find_matches(&text, &config);
            let json = serde_json::to_string_pretty(&matches).map_err(invalid)?;
            write_output(None, &json)
        }
        #[cfg(feature = "katex")]
        Commands::Render {
            input,
            output,
            diagnostics,
            katex,
        } => {
            let renderer: Box<dyn MathRenderer> = if katex {
                Box::new(webtex::renderer::KatexRenderer)
            } else {
                Box::new(LintRenderer)
            };
            render(renderer, config, input, output, diagnostics)
        }
        #[cfg(not(feature = "katex"))]
        Commands::Render {
            input,
            output,
            diagnostics,
        } => render(
            Box::new(LintRenderer) as Box<dyn MathRenderer>,
            config,
            input,
            output,
            diagnostics,
        ),
    }
}

#[cfg(feature = "cli")]
fn render(
    renderer: Box<dyn MathRenderer>,
    config: EngineConfig,
    input: Option<String>,
    output: Option<String>,
    diagnostics: Option<String>,
) -> io::Result<()> {
    let text = read_input(input.as_deref())?;
    let mut doc = document_from_text(&text);

    let memory = Arc::new(MemorySink::new());
    let sink: Box<dyn DiagnosticSink> = if diagnostics.is_some() {
        Box::new(Arc::clone(&memory))
    } else {
        Box::new(LogSink)
    };
    let mut engine = Engine::with_sink(renderer, config, sink).map_err(invalid)?;
    let root = doc.root();
    let summary = engine.render(&mut doc, root);

    write_output(output.as_deref(), &doc.inner_html(root))?;
    if let Some(path) = diagnostics {
        fs::write(path, memory.to_json())?;
    }

    let state = summary.state;
    eprintln!(
        "{} span(s): {} strict, {} fallback, {} text",
        state.total_attempts,
        state.strict_successes,
        state.fallback_successes,
        state.failures()
    );
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
}
