//! # marathon-tail
//!
//! Attach one listener to a Marathon cluster and print every matching event
//! to stdout as a JSON line until interrupted.

#![deny(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use marathon_core::events::{EVENT_ID_ALL, EVENT_ID_APPLICATIONS, EVENT_ID_SUBSCRIPTIONS, EventKind};
use marathon_events::EventHub;
use marathon_settings::{MarathonSettings, load_settings_from_path};
use tracing::info;

/// Tail a Marathon cluster's event bus.
#[derive(Parser, Debug)]
#[command(name = "marathon-tail", about = "Print Marathon events as JSON lines")]
struct Cli {
    /// Settings file (JSON). Missing file means defaults.
    #[arg(long, default_value = "marathon.json")]
    settings: PathBuf,

    /// Comma-separated member URLs (overrides settings).
    #[arg(long)]
    url: Option<String>,

    /// `callback` or `sse` (overrides settings).
    #[arg(long)]
    transport: Option<String>,

    /// Event tags or groups (`all`, `applications`, `subscriptions`) to print.
    #[arg(long, value_delimiter = ',', default_value = "all")]
    events: Vec<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, settings: &mut MarathonSettings) {
        if let Some(url) = &self.url {
            settings.cluster.url.clone_from(url);
        }
        if let Some(transport) = &self.transport {
            settings.events.transport = transport.to_lowercase();
        }
        if self.json_logs {
            settings.logging.json = true;
        }
    }
}

/// Build a listener filter from event tags and group names.
fn parse_filter(names: &[String]) -> Result<u32> {
    let mut filter = 0;
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        filter |= match name {
            "all" => EVENT_ID_ALL,
            "applications" => EVENT_ID_APPLICATIONS,
            "subscriptions" => EVENT_ID_SUBSCRIPTIONS,
            tag => EventKind::from_tag(tag)
                .with_context(|| format!("unknown event '{tag}'"))?
                .id(),
        };
    }
    if filter == 0 {
        bail!("no events selected");
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings_from_path(&cli.settings)
        .with_context(|| format!("failed to load settings from {}", cli.settings.display()))?;
    cli.apply(&mut settings);

    if settings.logging.json {
        marathon_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        marathon_core::logging::init_subscriber(&settings.logging.level);
    }

    let filter = parse_filter(&cli.events)?;
    let hub = EventHub::new(&settings).context("failed to create event hub")?;
    let mut listener = hub
        .add_events_listener(filter)
        .await
        .context("failed to attach listener")?;
    let callback = hub.subscription_url().await;
    info!(
        transport = %settings.events.transport,
        filter = format_args!("{filter:#x}"),
        callback = callback.as_deref(),
        "tailing events"
    );

    let mut stdout = std::io::stdout().lock();
    loop {
        tokio::select! {
            event = listener.recv() => {
                let Some(event) = event else { break };
                let line = serde_json::to_string(&event.payload).context("failed to encode event")?;
                writeln!(stdout, "{line}").context("failed to write to stdout")?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("shutting down");
                break;
            }
        }
    }

    let _ = hub.remove_events_listener(listener.id()).await;
    Ok(())
}
