//! sandcalc - evaluate calculator commands from the terminal.
//!
//! Runs the same command handler a chat bot would: either once for an
//! expression given on the command line, or interactively where every
//! line is treated as an incoming chat message.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use sandcalc::{CalcConfig, Calculator, Message, Mode};

/// Sandboxed Python-subset calculator.
#[derive(Parser, Debug)]
#[command(name = "sandcalc", version, about)]
struct Cli {
    /// Expression to evaluate once; `-` reads it from stdin.
    /// Without it, an interactive session starts.
    expr: Option<String>,

    /// Use native int/float literals instead of precision decimals
    #[arg(short, long)]
    native: bool,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bot prefix placed before the trigger word
    #[arg(long)]
    prefix: Option<String>,

    /// Evaluation timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Result characters shown before truncation
    #[arg(long)]
    length_limit: Option<usize>,

    /// Newlines a result may contain
    #[arg(long)]
    newline_limit: Option<usize>,
}

impl Cli {
    /// File settings first, then command-line overrides.
    fn load_config(&self) -> Result<CalcConfig> {
        let mut config = match &self.config {
            Some(path) => CalcConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => CalcConfig::default(),
        };
        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        if let Some(n) = self.length_limit {
            config.length_limit = n;
        }
        if let Some(n) = self.newline_limit {
            config.newline_limit = n;
        }
        Ok(config)
    }

    fn mode(&self) -> Mode {
        if self.native {
            Mode::Native
        } else {
            Mode::Precision
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sandcalc=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let calculator = Calculator::new(cli.load_config()?);

    match cli.expr.as_deref() {
        Some("-") => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("reading stdin")?;
            println!("{}", calculator.run(cli.mode(), source.trim()).await);
        }
        Some(expr) => println!("{}", calculator.run(cli.mode(), expr).await),
        None => interactive(&calculator).await?,
    }
    Ok(())
}

/// Treat each entered line as a chat message.
///
/// A line ending in `:` opens a block; the block ends at the first empty
/// line and is sent as one multi-line message.
async fn interactive(calculator: &Calculator) -> Result<()> {
    let mut editor = DefaultEditor::new().context("starting line editor")?;
    let prefix = calculator.config().prefix.clone();
    tracing::info!(%prefix, "sandcalc {} ready", sandcalc::VERSION);
    println!(
        "Type `{p}= <expr>` (decimal) or `{p}== <expr>` (native). Ctrl-D quits.",
        p = prefix
    );

    let mut pending: Vec<String> = Vec::new();
    loop {
        let prompt = if pending.is_empty() { "> " } else { "... " };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("reading input"),
        };
        let _ = editor.add_history_entry(line.as_str());

        if !pending.is_empty() {
            if !line.trim().is_empty() {
                pending.push(line);
                continue;
            }
        } else if line.trim_end().ends_with(':') {
            pending.push(line);
            continue;
        } else {
            pending.push(line);
        }

        let text = pending.join("\n");
        pending.clear();
        let message = Message {
            channel: "terminal".to_string(),
            text,
            ..Message::default()
        };
        match calculator.handle(&message).await {
            Some(reply) => println!("{}", reply.text),
            None if message.text.trim().is_empty() => {}
            None => println!("(not a calculator command)"),
        }
    }
    Ok(())
}
