//! stet: edit text inline, right below the shell prompt.
//!
//! Editing happens on the controlling terminal, so stet also works in the
//! middle of a pipeline: `cmd | stet | cmd2`.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, File};
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use stet_config::{CliOverrides, StetConfig};
use stet_terminal::{
    CrosstermDriver, DisplayOptions, EditResult, GapBuffer, InlineEditor, TtyDriver,
};
use stet_types::StetError;

#[derive(Parser)]
#[command(name = "stet", version, about = "Edit text inline in the terminal")]
struct Cli {
    /// File to edit; created on save if it does not exist
    file: Option<PathBuf>,

    /// Draw a border around the editing area
    #[arg(long)]
    border: bool,

    /// Write the saved text here (defaults to FILE)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append trace logs to this file
    #[arg(long)]
    debug_log: Option<PathBuf>,

    /// Enable verbose/debug logging (only with --debug-log)
    #[arg(long)]
    verbose: bool,
}

/// Where saved text goes.
#[derive(Debug, PartialEq, Eq)]
enum Destination {
    File(PathBuf),
    /// Stdout is a pipe or a file.
    Stdout,
    /// Stdout is the terminal the text was edited on; it is already there.
    Screen,
}

impl Destination {
    fn pick(output: Option<&Path>, file: Option<&Path>, stdout_is_tty: bool) -> Self {
        match output.or(file) {
            Some(path) => Destination::File(path.to_path_buf()),
            None if stdout_is_tty => Destination::Screen,
            None => Destination::Stdout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The terminal is the editing surface, so logs only go to a file.
    if let Some(path) = &cli.debug_log {
        init_logging(path, cli.verbose)?;
    }

    let initial = initial_content(cli.file.as_deref())?;

    // No controlling terminal: behave like cat.
    let term = match CrosstermDriver::open_tty() {
        Ok(term) => term,
        Err(e) => {
            tracing::debug!(error = %e, "no terminal, passing content through");
            io::stdout().lock().write_all(&initial)?;
            return Ok(());
        }
    };

    let overrides = CliOverrides {
        border: cli.border.then_some(true),
    };
    let outcome = edit(overrides, term, initial)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    match outcome {
        EditResult::Saved(buf) => {
            let destination = Destination::pick(
                cli.output.as_deref(),
                cli.file.as_deref(),
                io::stdout().is_terminal(),
            );
            deliver(buf, &destination)
        }
        EditResult::Aborted => std::process::exit(1),
    }
}

fn init_logging(path: &Path, verbose: bool) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open debug log {}", path.display()))?;

    let log_level = if verbose { "trace" } else { "debug" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

/// Existing file content, else piped stdin, else nothing.
fn initial_content(file: Option<&Path>) -> Result<Vec<u8>> {
    if let Some(path) = file {
        return match fs::read(path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "new file");
                Ok(Vec::new())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
    }

    let mut content = Vec::new();
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        stdin
            .lock()
            .read_to_end(&mut content)
            .context("Failed to read stdin")?;
    }
    Ok(content)
}

async fn edit(
    overrides: CliOverrides,
    term: TtyDriver,
    initial: Vec<u8>,
) -> Result<EditResult, StetError> {
    let config = StetConfig::load(overrides)?;
    let options = DisplayOptions {
        border: config.border,
        glyphs: config.glyphs,
    };
    let editor = InlineEditor::new(options, config.buffer_capacity).with_content(initial);
    Ok(editor.run(term).await?)
}

fn deliver(mut buf: GapBuffer, destination: &Destination) -> Result<()> {
    match destination {
        Destination::File(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_text(&mut buf, &mut file)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Destination::Stdout => {
            write_text(&mut buf, &mut io::stdout().lock()).context("Failed to write stdout")?;
        }
        Destination::Screen => {}
    }
    tracing::info!(?destination, bytes = buf.len(), "saved");
    Ok(())
}

fn write_text<W: Write>(buf: &mut GapBuffer, out: &mut W) -> io::Result<u64> {
    let n = io::copy(buf, out)?;
    out.flush()?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stet_terminal::Whence;
    use tempfile::TempDir;

    fn buffer_with(text: &str) -> GapBuffer {
        let mut buf = GapBuffer::new();
        buf.insert(text.as_bytes());
        buf.seek(0, Whence::Start).unwrap();
        buf
    }

    #[test]
    fn cli_parses_file_and_flags() {
        let cli = Cli::parse_from(["stet", "notes.txt", "--border", "-o", "out.txt"]);
        assert_eq!(cli.file, Some(PathBuf::from("notes.txt")));
        assert!(cli.border);
        assert_eq!(cli.output, Some(PathBuf::from("out.txt")));
        assert!(cli.debug_log.is_none());
    }

    #[test]
    fn file_is_saved_even_when_stdout_is_redirected() {
        let file = Path::new("notes.txt");
        assert_eq!(
            Destination::pick(None, Some(file), false),
            Destination::File(file.to_path_buf())
        );
        assert_eq!(
            Destination::pick(None, Some(file), true),
            Destination::File(file.to_path_buf())
        );
    }

    #[test]
    fn output_flag_wins_over_file() {
        let out = Path::new("out.txt");
        assert_eq!(
            Destination::pick(Some(out), Some(Path::new("in.txt")), false),
            Destination::File(out.to_path_buf())
        );
    }

    #[test]
    fn pipeline_writes_to_stdout() {
        assert_eq!(Destination::pick(None, None, false), Destination::Stdout);
        assert_eq!(Destination::pick(None, None, true), Destination::Screen);
    }

    #[test]
    fn deliver_writes_the_whole_buffer_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved.txt");
        deliver(buffer_with("one\ntwo\n"), &Destination::File(path.clone())).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn write_text_streams_from_the_start() {
        let mut out = Vec::new();
        let n = write_text(&mut buffer_with("piped text"), &mut out).unwrap();
        assert_eq!(n, 10);
        assert_eq!(out, b"piped text");
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let content = initial_content(Some(&dir.path().join("new.txt"))).unwrap();
        assert!(content.is_empty());
    }
}
