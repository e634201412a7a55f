//! relay CLI: run the server, or talk to a running one.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use prompt_relay::api;
use prompt_relay::client::{RelayClient, Reply};
use prompt_relay::config::{Config, DEFAULT_PORT};
use prompt_relay::engine::Relay;
use prompt_relay::model::Submission;
use prompt_relay::telemetry::relay::truncate;
use prompt_relay::telemetry::{TelemetryConfig, init_telemetry};
use tracing::info;

#[derive(Parser)]
#[command(name = "relay", about = "HTTP relay for a browser-side AI worker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server
    Serve {
        /// TOML config file; environment variables override it
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Submit a prompt to a running relay and print the answer
    Submit {
        /// Prompt text
        prompt: String,
        /// Model the worker should use
        #[arg(long, default_value = "claude")]
        model: String,
        /// Relay base URL
        #[arg(long, default_value_t = default_url())]
        url: String,
    },
    /// Show a running relay's status
    Status {
        /// Relay base URL
        #[arg(long, default_value_t = default_url())]
        url: String,
    },
}

fn default_url() -> String {
    format!("http://localhost:{DEFAULT_PORT}")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config } => cmd_serve(config).await,
        Command::Submit { prompt, model, url } => cmd_submit(&url, prompt, model).await,
        Command::Status { url } => cmd_status(&url).await,
    }
}

async fn cmd_serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = Config::load(config_path.as_deref())?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "prompt-relay".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let relay = Relay::new(config.relay_config());

    let sweeper = relay.sweeper().clone();
    let sweep_handle = tokio::spawn({
        let sweeper = sweeper.clone();
        async move { sweeper.run().await }
    });

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        timeout = ?config.request_timeout,
        poll_interval = ?config.poll_interval,
        "starting prompt relay"
    );

    api::serve(listener, relay, async {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown requested");
    })
    .await?;

    sweeper.shutdown();
    let _ = tokio::time::timeout(Duration::from_secs(2), sweep_handle).await;
    Ok(())
}

async fn cmd_submit(url: &str, prompt: String, model: String) -> anyhow::Result<()> {
    let client = RelayClient::new(url);
    println!("Sending prompt to {model}: {}", truncate(&prompt, 50));

    let started = Instant::now();
    let reply = client.submit(&Submission::new(prompt).model(model)).await?;
    let elapsed = started.elapsed();

    match reply {
        Reply::Ok(reply) => {
            println!("Success (took {:.2}s)", elapsed.as_secs_f64());
            println!("Request ID: {}", reply.answer.request_id);
            println!("Result:");
            println!("{}", reply.answer.result);
            Ok(())
        }
        Reply::Err { code, message } => {
            anyhow::bail!("relay answered {code}: {message}")
        }
    }
}

async fn cmd_status(url: &str) -> anyhow::Result<()> {
    let status = RelayClient::new(url).status().await?;
    println!("Status:    {}", status.status);
    println!("Pending:   {}", status.pending_requests);
    println!("Completed: {}", status.completed_results);
    println!("Workers:   {}", status.connected_workers);
    Ok(())
}
