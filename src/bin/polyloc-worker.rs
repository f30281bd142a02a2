//! Serves one layer over stdin/stdout.
//!
//! Reads one JSON command per line from stdin and writes one JSON event per line to stdout.
//! Logs go to stderr, filtered with `RUST_LOG` (`info` by default).
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use polyloc::{Command, Event, Worker, WorkerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    info!(?config, "worker started");

    let mut worker = Worker::new(config);
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut line = Vec::new();
    loop {
        line.clear();
        if stdin
            .read_until(b'\n', &mut line)
            .context("failed to read from stdin")?
            == 0
        {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let event = match Command::from_slice(&line) {
            Ok(command) => worker.handle(command),
            Err(err) => {
                warn!(%err, "invalid command");
                Event::Error {
                    message: format!("invalid command: {err}"),
                }
            }
        };

        writeln!(stdout, "{}", event.to_line()?).context("failed to write to stdout")?;
        stdout.flush()?;
    }

    info!("stdin closed, exiting");
    Ok(())
}
