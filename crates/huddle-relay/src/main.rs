use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "huddle-relay", about = "WebSocket relay for huddle voice rooms")]
struct Args {
    /// Config file (defaults to the platform config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind, overriding the config file.
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on, overriding the config file.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match huddle_config::load_config_from(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("huddle-relay: {e}");
            std::process::exit(1);
        }
    };

    let default_filter = format!("huddle_relay={}", config.logging.level.as_directive());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let mut relay = config.relay;
    if let Some(bind) = args.bind {
        relay.bind = bind;
    }
    if let Some(port) = args.port {
        relay.port = port;
    }

    if let Err(e) = huddle_relay::serve(&relay).await {
        tracing::error!(error = %e, "Failed to start relay");
        std::process::exit(1);
    }
}
