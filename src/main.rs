use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use alexa_hass::protocol::new_message_id;
use alexa_hass::{Config, Dispatcher, server};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "alexa-hass")]
#[command(about = "Alexa smart home directives for Home Assistant")]
#[command(version)]
struct Cli {
    /// JSON or YAML configuration file
    #[arg(long, env = "ALEXA_HASS_CONFIG")]
    config: Option<PathBuf>,

    /// Home Assistant URL (e.g., http://localhost:8123), overrides the file
    #[arg(long, env = "HASS_URL")]
    url: Option<String>,

    /// Home Assistant long-lived access token, overrides the file
    #[arg(long, env = "HASS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one directive read from stdin (or a file) and print the response
    Handle {
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Print the discovery response
    Discover,
    /// Accept directives over HTTP
    Serve {
        #[arg(long, env = "ALEXA_HASS_LISTEN", default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match (&cli.config, &cli.url) {
        (Some(path), _) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        (None, Some(url)) => Config::new(url, cli.token.as_deref().unwrap_or_default())?,
        (None, None) => anyhow::bail!("either --config or --url is required"),
    };

    // command line values win over the file
    let config = match (&cli.config, &cli.url) {
        (Some(_), Some(url)) => Config {
            url: alexa_hass::config::normalize_url(url)?,
            ..config
        },
        _ => config,
    };
    Ok(match cli.token.as_deref() {
        Some(token) if !token.is_empty() => config.with_token(token),
        _ => config,
    })
}

fn read_event(path: Option<&PathBuf>) -> anyhow::Result<Value> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    serde_json::from_str(&text).context("directive is not valid JSON")
}

fn discover_directive() -> Value {
    json!({
        "directive": {
            "header": {
                "namespace": "Alexa.Discovery",
                "name": "Discover",
                "payloadVersion": "3",
                "messageId": new_message_id(),
            },
            "payload": {}
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(url = %config.url, proxy = config.proxy, "configuration loaded");
    let dispatcher = Arc::new(Dispatcher::new(config)?);

    match cli.command {
        Command::Handle { event } => {
            let directive = read_event(event.as_ref())?;
            let response = dispatcher.handle(&directive).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Discover => {
            let response = dispatcher.handle(&discover_directive()).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Serve { listen } => {
            tracing::info!(hub = %dispatcher.hub().base_url(), "starting directive server");
            server::serve(dispatcher.clone(), listen)
                .await
                .inspect_err(|error| tracing::error!(%error, "server stopped"))?;
        }
    }

    // unconfirmed writes must not be dropped with the runtime
    dispatcher.hub().flush().await;
    Ok(())
}
