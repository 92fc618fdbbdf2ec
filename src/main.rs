//! Scoutix binary entrypoint wiring configuration, modules, and a console
//! transport standing in for the chat network.

use std::sync::Arc;

use anyhow::Context;
use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scoutix::access::AllowAll;
use scoutix::bot::Bot;
use scoutix::config::BotConfig;
use scoutix::transport::{ChatSink, TransportResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = BotConfig::load().context("loading bot configuration")?;
    let sink: Arc<dyn ChatSink> = Arc::new(ConsoleTransport);
    let bot = Bot::from_config(&config, sink, Arc::new(AllowAll))
        .context("building configured modules")?;

    info!(
        server = %config.connection.server,
        port = config.connection.port,
        nick = %config.connection.nick,
        "scoutix starting"
    );
    bot.on_connect().await;

    run_console(&bot).await?;

    info!("scoutix exiting");
    Ok(())
}

/// Read `<channel> <sender> <text>` lines from stdin and dispatch them as
/// channel messages until EOF or a shutdown signal.
async fn run_console(bot: &Bot) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => match line.context("reading console input")? {
                Some(line) => dispatch_line(bot, &line).await,
                None => break,
            },
        }
    }

    Ok(())
}

/// Parse one console line into an inbound event and fan it out.
async fn dispatch_line(bot: &Bot, line: &str) {
    let mut parts = line.splitn(3, ' ');
    let (Some(channel), Some(sender), Some(text)) = (parts.next(), parts.next(), parts.next())
    else {
        if !line.trim().is_empty() {
            warn!(%line, "expected `<channel> <sender> <text>`");
        }
        return;
    };

    bot.on_message(sender, text).await;
    bot.on_channel_message(channel, sender, text).await;
}

/// Transport that prints outbound messages to stdout.
struct ConsoleTransport;

impl ChatSink for ConsoleTransport {
    fn message<'a>(&'a self, channel: &'a str, text: &'a str) -> BoxFuture<'a, TransportResult<()>> {
        Box::pin(async move {
            println!("[{channel}] {text}");
            Ok(())
        })
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
