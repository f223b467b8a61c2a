use clap::{Parser, Subcommand};
use std::sync::Arc;

use steambot_plugins::domain::entities::SteamId;
use steambot_plugins::domain::traits::Responder;
use steambot_plugins::infrastructure::adapters::ConsoleAdapter;
use steambot_plugins::infrastructure::config::Config;
use steambot_plugins::plugins;
use steambot_plugins::Host;

#[derive(Parser)]
#[command(name = "steambot")]
#[command(about = "Steam chat bot plugin host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// SteamID64 console commands are issued as (defaults to the first owner)
    #[arg(long = "as")]
    caller: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the host and its plugins
    Run,
    /// Show version
    Version,
    /// Print the default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let config = load_config(&cli.config);
            init_logging(&config.logging.level);
            if let Err(e) = run_bot(config, cli.caller) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("steambot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

fn load_config(path: &str) -> Config {
    let mut config = if std::path::Path::new(path).exists() {
        Config::load(path).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };
    config.apply_env();
    config
}

fn run_bot(config: Config, caller: Option<String>) -> Result<(), String> {
    let caller = caller
        .map(|raw| raw.parse::<SteamId>().map_err(|e| e.to_string()))
        .transpose()?;

    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start runtime: {}", e))?;
    rt.block_on(async move {
        tracing::info!("Starting {}", config.bot.name);

        let console = Arc::new(ConsoleAdapter::new(config.bot.name.clone()));
        let host = Host::new(config, console.clone());
        plugins::register_builtin(&host.plugins).map_err(|e| e.to_string())?;

        host.start().await;
        host.login_all(Some(Arc::clone(&console))).await.map_err(|e| e.to_string())?;
        host.ready().await;

        let caller = match caller {
            Some(id) => Some(id),
            None => host.data.first_owner().await,
        };
        run_console(&host, &console, caller).await;

        host.shutdown().await;
        Ok::<(), String>(())
    })
}

async fn run_console(host: &Host, console: &Arc<ConsoleAdapter>, caller: Option<SteamId>) {
    let prefix = host.commands.prefix().to_string();
    tracing::info!(
        "Console ready. Type {}help, 'plugins', 'reload <name>' or 'exit'. Start a line with '#' to send it as group chat.",
        prefix
    );

    while let Some(line) = console.read_line("").await {
        if line.is_empty() {
            continue;
        }

        let (line, group_chat) = match line.strip_prefix('#') {
            Some(rest) => (rest.trim_start(), true),
            None => (line.as_str(), false),
        };

        let mut parts = line.split_whitespace();
        let Some(first) = parts.next() else { continue };
        let args: Vec<String> = parts.map(str::to_string).collect();

        match first {
            "exit" | "quit" => break,
            "plugins" => {
                for info in host.plugins.list_plugins().await {
                    println!("{} [{:?}] {}", info.name, info.state, info.description);
                }
            }
            "reload" => {
                let Some(name) = args.first() else {
                    println!("Usage: reload <plugin>");
                    continue;
                };
                match host.plugins.reload(name).await {
                    Ok(state) => println!("Reloaded {} ({:?})", name, state),
                    Err(e) => println!("Reload failed: {}", e),
                }
            }
            _ => {
                let name = first.strip_prefix(prefix.as_str()).unwrap_or(first);
                let responder: Arc<dyn Responder> = console.clone();
                let mut res_info = host.response_info(caller);
                if group_chat {
                    res_info = res_info.from_chat();
                }
                let result = host.commands.run_command(name, args, responder, res_info).await;
                if !result.success {
                    println!("{}", result.message.unwrap_or_else(|| "Command refused".to_string()));
                }
            }
        }
    }
}

fn init_config() {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => eprintln!("{}", e),
    }
}
