//! Uber Code Generator command line.
//!
//! Results and SSE frames go to stdout, logs to stderr.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use uber_codegen::services::protocol::{to_sse, ProtocolEvent};
use uber_codegen::utils::init_logging;
use uber_codegen::{AppConfig, EditRequest, GenerateRequest, Pipeline, RegenerateRequest};
use uber_codegen_agents::{agent_catalog, workflow_graph};
use uber_codegen_core::PipelineMode;

#[derive(Parser, Debug)]
#[command(name = "uber-codegen", version, about = "Streaming multi-agent code generator")]
struct Cli {
    /// TOML file overriding environment settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Credential override for this invocation
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate code from a prompt
    Generate {
        prompt: String,
        /// Previously generated code to revise
        #[arg(long)]
        context_file: Option<PathBuf>,
        #[arg(long)]
        session_id: Option<String>,
        /// Print protocol events as SSE frames instead of the final result
        #[arg(long)]
        stream: bool,
    },
    /// Rework existing code according to instructions
    Regenerate {
        #[arg(long)]
        instructions: String,
        #[arg(long, default_value = "")]
        original_prompt: String,
        #[arg(long)]
        code_file: Option<PathBuf>,
        #[arg(long)]
        stream: bool,
    },
    /// Run validator, tester and security over a source file
    Analyze { file: PathBuf },
    /// List agents and the stage graph
    Agents,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(config.log_format, &config.log_level)?;

    let pipeline = Pipeline::from_config(&config)?;
    match cli.command {
        Commands::Generate {
            prompt,
            context_file,
            session_id,
            stream,
        } => {
            let request = GenerateRequest {
                prompt,
                session_id,
                api_key: cli.api_key,
                context_code: read_optional(context_file.as_ref())?,
            };
            if stream {
                print_events(pipeline.run_streaming(request)?).await?;
            } else {
                print_json(&pipeline.run(request).await?)?;
            }
        }
        Commands::Regenerate {
            instructions,
            original_prompt,
            code_file,
            stream,
        } => {
            let request = RegenerateRequest {
                original_prompt,
                edit_instructions: instructions,
                current_code: read_optional(code_file.as_ref())?.unwrap_or_default(),
                api_key: cli.api_key,
            };
            if stream {
                print_events(pipeline.regenerate_streaming(request)?).await?;
            } else {
                print_json(&pipeline.regenerate(request).await?)?;
            }
        }
        Commands::Analyze { file } => {
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let request = EditRequest {
                original_code: code,
                updates: Vec::new(),
                api_key: cli.api_key,
            };
            print_json(&pipeline.run_agents_on_code(request).await?)?;
        }
        Commands::Agents => {
            print_json(&serde_json::json!({
                "agents": agent_catalog(),
                "workflows": {
                    "single": workflow_graph(PipelineMode::Single),
                    "multi": workflow_graph(PipelineMode::Multi),
                },
            }))?;
        }
    }
    Ok(())
}

fn read_optional(path: Option<&PathBuf>) -> anyhow::Result<Option<String>> {
    path.map(|p| {
        std::fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display()))
    })
    .transpose()
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_events(mut events: ReceiverStream<ProtocolEvent>) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    while let Some(event) = events.next().await {
        stdout.write_all(to_sse(&event)?.as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}
