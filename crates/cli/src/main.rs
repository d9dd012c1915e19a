mod config_commands;
mod invoke_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    chatrelay_channels::ChannelPlugin,
    chatrelay_chatbot::Chatbot,
    chatrelay_config::{ChatrelayConfig, schema::DEFAULT_SERVICE_HOST},
    chatrelay_whatsapp::WhatsAppPlugin,
};

#[derive(Parser)]
#[command(name = "chatrelay", about = "Chatrelay: chat commands to a remote service and back")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Root URL of the command service (overrides config value).
    #[arg(long, global = true, env = "SERVICE_HOSTNAME")]
    service_host: Option<String>,

    /// Platform tag sent with every invocation (overrides config value).
    #[arg(long, global = true)]
    platform: Option<String>,

    /// WebSocket URL of the WhatsApp Web sidecar (overrides config value).
    #[arg(long, global = true)]
    sidecar_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bridge WhatsApp Web to the command service (default).
    Run,
    /// Run a single invocation and print the replies.
    Invoke {
        #[arg(short, long)]
        message: String,
        /// Group id sent to the command service.
        #[arg(short, long, default_value = "console")]
        group: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config file, then let command-line flags win.
fn resolve_config(cli: &Cli) -> anyhow::Result<ChatrelayConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = chatrelay_config::load_config(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            chatrelay_config::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
            config
        },
        None => chatrelay_config::discover_and_load(),
    };
    apply_cli_overrides(cli, &mut config);
    Ok(config)
}

fn apply_cli_overrides(cli: &Cli, config: &mut ChatrelayConfig) {
    if let Some(host) = &cli.service_host {
        config.chatbot.service_host = Some(host.clone());
    }
    if let Some(platform) = &cli.platform {
        config.chatbot.platform = platform.clone();
    }
    if let Some(url) = &cli.sidecar_url {
        config.whatsapp.sidecar_url = url.clone();
    }
}

/// Build the chatbot, defaulting to a local command service when no host
/// was configured anywhere.
fn build_chatbot(config: &ChatrelayConfig) -> anyhow::Result<Chatbot> {
    let mut chatbot_config = config.chatbot.clone();
    if chatbot_config.service_host.is_none() {
        info!(
            service_host = DEFAULT_SERVICE_HOST,
            "no service host configured, using default"
        );
        chatbot_config.service_host = Some(DEFAULT_SERVICE_HOST.to_string());
    }
    Ok(Chatbot::new(&chatbot_config)?)
}

async fn run(config: ChatrelayConfig) -> anyhow::Result<()> {
    let chatbot = Arc::new(build_chatbot(&config)?);
    let plugin = WhatsAppPlugin::new(config.whatsapp, chatbot);
    info!(channel = plugin.id(), "starting channel");

    tokio::select! {
        result = plugin.run() => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, shutting down");
            Ok(())
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chatrelay starting");

    let config = resolve_config(&cli)?;

    match cli.command {
        None | Some(Commands::Run) => run(config).await,
        Some(Commands::Invoke { message, group }) => {
            let chatbot = build_chatbot(&config)?;
            invoke_commands::invoke(&chatbot, &message, &group).await
        },
        Some(Commands::Config { action }) => config_commands::handle_config(action, &config),
    }
}
