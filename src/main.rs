//! Hermes CLI
//!
//! Thin command-line surface over the library: list a server's tool
//! catalog, invoke a single tool, or run one bounded tool-calling turn.
//! Endpoints and credentials come from the environment; see
//! [`hermes_core::Settings`].

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hermes_core::config::redact;
use hermes_core::mcp::client::{extract_text, normalize_items};
use hermes_core::{
    provider_from_settings, Channel, ChatSession, Endpoint, HttpChannel, McpClient, Result,
    Settings, StdioChannel, ToolContent,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// How long the readiness probe keeps retrying an unreachable endpoint
const PROBE_ATTEMPTS: u32 = 10;
const PROBE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "hermes", version, about = "MCP client harness with LLM tool calling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the server's tool catalog (and resources, where supported)
    Tools,

    /// Invoke one tool with a JSON argument object
    Call {
        /// Tool name from the catalog
        tool: String,

        /// JSON argument object (defaults to {})
        arguments: Option<String>,
    },

    /// Ask a question, letting the model call MCP tools
    Ask {
        /// The question (words are joined with spaces)
        question: Vec<String>,
    },

    /// Check whether the HTTP MCP endpoint is reachable
    Probe,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Probe => {
            let url = match settings.endpoint()? {
                Endpoint::Http { url } => url,
                Endpoint::Stdio { .. } => {
                    bail!("probe only applies to HTTP endpoints; unset HERMES_MCP_CMD")
                }
            };
            let channel = HttpChannel::new(&url, settings.mcp_token.clone());
            channel.probe_ready(PROBE_ATTEMPTS, PROBE_INTERVAL).await?;
            println!("{url} is reachable");
        }

        Commands::Tools => {
            let client = connect(&settings).await?;

            let tools = client.list_tools().await?;
            println!("{} tool(s):", tools.len());
            for tool in &tools {
                println!("  {}  {}", tool.name, tool.description);
            }

            match client.list_resources().await? {
                Some(resources) => println!("{} resource(s)", resources.len()),
                None => println!("resources/list not supported by this server"),
            }
        }

        Commands::Call { tool, arguments } => {
            let arguments = match arguments.as_deref() {
                Some(raw) => {
                    serde_json::from_str(raw).context("arguments are not a valid JSON object")?
                }
                None => serde_json::json!({}),
            };

            let client = connect(&settings).await?;
            let result = client.call_tool(&tool, arguments).await?;

            match normalize_items(&result) {
                ToolContent::Items(items) => {
                    println!("{} item(s):", items.len());
                    for item in items {
                        println!("  {item}");
                    }
                }
                ToolContent::Unrecognized(_) => println!("{}", extract_text(&result)),
            }
        }

        Commands::Ask { question } => {
            let question = question.join(" ");
            if question.trim().is_empty() {
                bail!("no question given");
            }

            // Credential validation happens before any connection is opened
            let provider = provider_from_settings(&settings)?;
            let client = connect(&settings).await?;

            let mut session =
                ChatSession::start(provider, client, settings.system_prompt.as_deref()).await?;
            let answer = session.ask(&question).await?;
            println!("{answer}");
        }
    }

    Ok(())
}

/// Open the configured transport and perform the MCP handshake
async fn connect(settings: &Settings) -> Result<McpClient> {
    if let Some(token) = &settings.mcp_token {
        debug!(token = %redact(token), "using bearer token");
    }

    let channel: Arc<dyn Channel> = match settings.endpoint()? {
        Endpoint::Stdio { program, args } => {
            info!(%program, "spawning stdio MCP server");
            Arc::new(StdioChannel::spawn(&program, &args)?)
        }
        Endpoint::Http { url } => {
            let channel = HttpChannel::new(&url, settings.mcp_token.clone());
            channel.probe_ready(PROBE_ATTEMPTS, PROBE_INTERVAL).await?;
            Arc::new(channel)
        }
    };

    let client = McpClient::new(channel);
    client.initialize().await?;
    Ok(client)
}
