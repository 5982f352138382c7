use agni::assist::{self, CodeAction};
use agni::config::Config;
use agni::gateway::{ChatMessage, CompletionGateway, CompletionRequest, HttpGateway};
use agni::{proxy, runtime};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agni")]
#[command(author, version, about = "AGNI - floating AI assistant widget core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy server exposing /chat and /research
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8787")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Run the widget runtime headless (background worker, injector,
    /// reminder scheduler) until Ctrl-C
    Widget,

    /// One-shot chat round trip against the gateway
    Chat {
        /// The message to send
        message: String,
    },

    /// One-shot code-assist action against the gateway
    Assist {
        /// Language of the code (e.g. rust, python, javascript)
        #[arg(short, long)]
        language: String,

        /// Action to run over the code
        #[arg(short, long, value_enum)]
        action: CodeAction,

        /// File holding the code; stdin when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "agni=debug" } else { "agni=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Serve { port, host } => {
            proxy::run_proxy_server(&host, port, &config).await?;
        }
        Commands::Widget => {
            runtime::run_widget(&config).await?;
        }
        Commands::Chat { message } => {
            let gateway = HttpGateway::from_env(&config.gateway)?;
            let request = CompletionRequest::new(vec![ChatMessage::user(message)]);
            let response = gateway.complete(request).await?;
            println!("{}", response);
        }
        Commands::Assist {
            language,
            action,
            file,
        } => {
            let code = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => std::io::read_to_string(std::io::stdin())?,
            };
            let gateway = HttpGateway::from_env(&config.gateway)?;
            let request = CompletionRequest::new(assist::request_messages(&language, action, &code));
            let response = gateway.complete(request).await?;
            println!("{}", response);
        }
    }

    Ok(())
}
