// Tracing setup for embedding applications.
//
// The library itself only emits events; an embedder calls this once to
// route them to a log file.

use std::path::Path;

use anyhow::Context;

/// Initialize tracing to log to `mapban.log` under `log_dir` (not the
/// terminal, which an embedding UI usually owns). Honors `RUST_LOG`,
/// defaulting to `mapban=info,warn`.
pub fn init_tracing(log_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("mapban.log"))
        .context("failed to create log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mapban=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_the_log_file_and_rejects_a_second_global() {
        let dir = std::env::temp_dir().join("mapban_logging_test");
        let _ = std::fs::remove_dir_all(&dir);

        init_tracing(&dir).expect("first init should succeed");
        assert!(dir.join("mapban.log").exists());

        // The global subscriber slot is single-use per process.
        assert!(init_tracing(&dir).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
