use clap::Parser;

use accordclient::gateway::intents::Intents;
use accordclient::models::presence::Status;
use accordclient::{GatewayClient, GatewayConfig, GatewayEvent};

/// Connect to an Accord gateway and log what happens.
#[derive(Debug, Parser)]
#[command(name = "accord-gateway", version)]
struct Args {
    /// Gateway address; overrides ACCORD_GATEWAY_URL.
    #[arg(long)]
    url: Option<String>,

    /// Comma-separated intent names; overrides ACCORD_INTENTS.
    #[arg(long, value_delimiter = ',')]
    intents: Option<Vec<String>>,

    /// Status to announce once the session is ready.
    #[arg(long)]
    status: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accordclient=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("  \x1b[31m{e}\x1b[0m");
            std::process::exit(2);
        }
    };
    let status = match args.status.as_deref().map(Status::parse) {
        Some(None) => {
            eprintln!("  \x1b[31munknown status {:?}\x1b[0m", args.status);
            std::process::exit(2);
        }
        Some(Some(status)) => Some(status),
        None => None,
    };
    print_banner(&config);

    let client = match GatewayClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("  \x1b[31m{e}\x1b[0m");
            std::process::exit(2);
        }
    };
    let mut events = client.subscribe();

    if let Err(e) = client.connect().await {
        tracing::error!("connect failed: {e}");
        std::process::exit(1);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, disconnecting");
                break;
            }
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("dropped {n} events");
                        continue;
                    }
                    Err(_) => break,
                };
                match event {
                    GatewayEvent::Ready { .. } => {
                        let session = client.session_info();
                        tracing::info!("ready, session {:?}", session.session_id);
                        if let Some(status) = status {
                            if let Err(e) = client.set_status(status).await {
                                tracing::warn!("failed to set status: {e}");
                            }
                        }
                    }
                    GatewayEvent::Dispatch { event_type, message } => {
                        tracing::info!("{event_type} (seq {:?})", message.seq);
                    }
                    GatewayEvent::Error { error } if error.is_fatal() => {
                        tracing::error!("{error}");
                        break;
                    }
                    other => tracing::debug!("{other:?}"),
                }
            }
        }
    }

    let health = client.connection_health();
    if !health.healthy {
        for issue in &health.issues {
            tracing::warn!("{issue}");
        }
    }
    let _ = client.shutdown().await;
}

fn load_config(args: &Args) -> Result<GatewayConfig, accordclient::GatewayError> {
    let mut config = GatewayConfig::from_env()?;
    if let Some(url) = &args.url {
        config.address = url.clone();
    }
    if let Some(names) = &args.intents {
        config.intents = Intents::from_names(names.as_slice())?;
    }
    config.validate()?;
    Ok(config)
}

fn print_banner(config: &GatewayConfig) {
    let version = env!("CARGO_PKG_VERSION");

    eprintln!();
    eprintln!("  \x1b[1;36maccord gateway\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2maddress\x1b[0m      {}", config.address);
    eprintln!("  \x1b[2mintents\x1b[0m      {}", config.intents);
    eprintln!("  \x1b[2mreconnects\x1b[0m   {}", config.max_reconnects);

    if config.intents.is_privileged() {
        eprintln!();
        eprintln!("  \x1b[33m! privileged intents requested\x1b[0m");
    }

    eprintln!();
}
