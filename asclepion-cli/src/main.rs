use asclepion_core::{
    AppConfig, Content, EhrClient, HttpTokenProvider, LiveClient, LiveEvent, LiveEventKind,
    SessionConfig, ToolDispatcher, ToolRegistry, WsConnector,
};
use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "asclepion",
    version,
    about = "Voice-capable clinical assistant over a live agent session"
)]
struct Cli {
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    system: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!("Starting asclepion client");
    let cli = Cli::parse();
    debug!(config = ?cli.config, system = ?cli.system, "CLI arguments parsed");

    let config_path = cli.config.as_deref().map(Path::new);
    let mut config = AppConfig::load(config_path)?;
    if let Some(system) = cli.system {
        config.system_instruction = Some(system);
    }
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration using default path");
    }

    let registry = Arc::new(ToolRegistry::standard());
    let client = Arc::new(LiveClient::new(Arc::new(WsConnector), config.live_url()));

    let tokens = Arc::new(HttpTokenProvider::new(config.token_url.clone()));
    let clinical = Arc::new(EhrClient::new(config.records_base_url.clone()));

    let (chart_tx, mut chart_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(graph) = chart_rx.recv().await {
            println!("[chart] {graph}");
        }
    });

    let dispatcher = Arc::new(
        ToolDispatcher::new(registry.clone(), tokens, clinical, client.clone())
            .with_chart_sink(chart_tx),
    );
    let _tool_calls = dispatcher.attach(&client);

    let _content = client.subscribe(LiveEventKind::Content, |event| {
        if let LiveEvent::Content(content) = event {
            let Some(turn) = &content.model_turn else {
                return;
            };
            for part in &turn.parts {
                if let Some(text) = &part.text {
                    println!("{text}");
                }
            }
        }
    });
    let _turns = client.subscribe(LiveEventKind::TurnComplete, |_| {
        debug!("agent turn complete");
    });
    let _errors = client.subscribe(LiveEventKind::Error, |event| {
        if let LiveEvent::Error(message) = event {
            warn!(message = message.as_str(), "session error");
        }
    });
    let _closes = client.subscribe(LiveEventKind::Closed, |event| {
        if let LiveEvent::Closed(info) = event {
            info!(code = info.code, clean = info.clean, reason = info.reason.as_str(), "session closed");
        }
    });

    let session = SessionConfig::from_app_config(&config, registry.declarations().to_vec());
    client.connect(&session).await?;
    info!(model = session.model.as_str(), "Session open; type a message, /quit to exit");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        client.send(vec![Content::user_text(line)], true).await?;
    }

    client.disconnect().await?;
    info!("Client execution finished");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
