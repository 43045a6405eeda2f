use blackhouse_bot::app::{App, shutdown_channel};
use blackhouse_bot::config::BotConfig;
use blackhouse_bot::version::VERSION;

use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: Option<&str>) {
    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Optionally log to a file: JSON format, daily rotation
    let file_layer = log_dir.map(|dir| {
        fmt::layer()
            .with_writer(rolling::daily(dir, "bot.log"))
            .with_ansi(false)
            .json()
            .boxed()
    });

    // Default to `info` for the bot and quieter HTTP internals if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Manually check for --version before full parsing to keep the simple output.
    if std::env::args().any(|arg| arg == "--version") {
        println!("Bot version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    // Config comes first so the log directory is known before logging starts.
    let config = BotConfig::load(args.config.as_deref())?;
    init_logging(config.log_dir.as_deref());
    info!("Starting Black House Bot, version: {}", VERSION);

    let app = match App::build(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start bot: {}", e);
            return Err(e.into());
        }
    };

    app.run(shutdown_channel()).await;
    Ok(())
}
