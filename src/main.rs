#![cfg_attr(windows, windows_subsystem = "windows")]

use anyhow::Context;
use mic_volume_enforcer::EnforcerConfig;
use tracing_subscriber::EnvFilter;

fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}

/// Rebuild an error and its sources as an `anyhow::Error`.
///
/// `eframe::Error` is not `Send + Sync`, so it cannot be wrapped directly.
#[cfg_attr(not(windows), allow(dead_code))]
fn error_chain(e: &dyn std::error::Error) -> anyhow::Error {
    let mut messages: Vec<String> = std::iter::successors(Some(e), |e| e.source())
        .map(ToString::to_string)
        .collect();
    let root = anyhow::Error::msg(messages.pop().unwrap_or_default());
    messages
        .into_iter()
        .rev()
        .fold(root, |chain, message| chain.context(message))
}

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use mic_volume_enforcer::{app, config::WINDOW_TITLE, platform::dialog};

    let config = match EnforcerConfig::from_env().context("invalid configuration") {
        Ok(config) => config,
        Err(e) => {
            dialog::show_error(WINDOW_TITLE, &format!("{:#}", e));
            return Err(e);
        }
    };
    init_logging(&config.log_filter);
    tracing::info!(?config, "starting");

    if let Err(e) = app::run(config) {
        let e = error_chain(&e).context("application failed");
        dialog::show_error(WINDOW_TITLE, &format!("{:#}", e));
        return Err(e);
    }

    Ok(())
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    let config = EnforcerConfig::from_env().context("invalid configuration")?;
    init_logging(&config.log_filter);
    anyhow::bail!("the microphone enforcer needs the Windows Core Audio API")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum WindowError {
        #[error("window creation failed")]
        Create(#[source] std::io::Error),
    }

    #[test]
    fn test_error_chain_keeps_sources() {
        let e = WindowError::Create(std::io::Error::new(
            std::io::ErrorKind::Other,
            "no GL context",
        ));

        let chained = error_chain(&e).context("application failed");

        assert_eq!(
            format!("{:#}", chained),
            "application failed: window creation failed: no GL context"
        );
        assert_eq!(chained.chain().count(), 3);
    }
}
