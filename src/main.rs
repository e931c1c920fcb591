use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::net::IpAddr;

use flowline_rs::config::ServerConfig;
use flowline_rs::engine::{state, Graph, State};
use flowline_rs::flow::builder::GraphBuilder;
use flowline_rs::flow::registry::StepRegistry;
use flowline_rs::flow::server;
use flowline_rs::flow::workflows::code_review::create_code_review_graph;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind (overrides FLOWLINE_HOST)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on (overrides FLOWLINE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a graph once and print the result
    Run {
        /// Path to a YAML or JSON graph definition
        #[arg(short, long, conflicts_with = "sample")]
        file: Option<String>,

        /// Run the built-in code review graph
        #[arg(long)]
        sample: bool,

        /// Initial state as a JSON object
        #[arg(short, long, default_value = "{}")]
        state: String,
    },
    /// List registered steps
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = ServerConfig::from_env()?;

    match args.command {
        Commands::Serve { host, port } => {
            let config = config.with_host(host).with_port(port);
            server::serve(config).await?;
        }
        Commands::Run {
            file,
            sample,
            state: raw_state,
        } => {
            let initial = parse_state(&raw_state)?;

            let graph: Graph = match (file, sample) {
                (Some(path), _) => {
                    let registry = StepRegistry::with_builtin_steps().await;
                    GraphBuilder::new(registry)
                        .with_default_max_steps(config.max_steps)
                        .build_file(&path)
                        .await
                        .with_context(|| format!("Failed to build graph from {}", path))?
                }
                (None, true) => create_code_review_graph()?,
                (None, false) => bail!("Pass --file <PATH> or --sample"),
            };

            log::info!("Running graph from {:?}", graph.start_node());
            let result = tokio::task::spawn_blocking(move || graph.run(&initial)).await??;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Tools => {
            let registry = StepRegistry::with_builtin_steps().await;
            for (name, description) in registry.list().await {
                println!("{:<24} {}", name, description);
            }
        }
    }

    Ok(())
}

fn parse_state(raw: &str) -> anyhow::Result<State> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("Initial state is not valid JSON")?;
    match state::from_value(value) {
        Some(state) => Ok(state),
        None => bail!("Initial state must be a JSON object"),
    }
}
