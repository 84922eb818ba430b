// SPDX-License-Identifier: MIT

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use pausegraph_rs::adk::model::ModelConfig;
use pausegraph_rs::pausegraph::catalog::{default_registry, GraphCatalog};
use pausegraph_rs::pausegraph::server::{self, AppState};
use pausegraph_rs::pausegraph::workflow::checkpoint::{Checkpointer, FileCheckpointer};
use pausegraph_rs::pausegraph::workflow::graph::{
    EngineConfig, GraphEngine, ResumeInput, RunResult,
};
use pausegraph_rs::pausegraph::workflow::state::{ThreadId, WorkflowState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding one JSON checkpoint per thread
    #[arg(long, global = true, default_value = ".pausegraph/checkpoints")]
    store: PathBuf,

    /// Directory searched for YAML graph definitions
    #[arg(long, global = true, default_value = "graphs")]
    graphs_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a run of a demo or YAML graph
    Run {
        /// Demo name, YAML file, or graph name in --graphs-dir
        #[arg(short, long)]
        graph: String,

        /// Initial state as a JSON object
        #[arg(short, long, default_value = "{}")]
        input: String,

        /// Thread id (defaults to the current timestamp)
        #[arg(short, long)]
        thread: Option<String>,

        /// Prompt on stdin at every pause until the run completes
        #[arg(long)]
        interactive: bool,

        /// Stop with an error after this many steps
        #[arg(long)]
        max_steps: Option<u64>,
    },
    /// Answer the pause a thread is waiting on
    Resume {
        #[arg(short, long)]
        thread: String,

        /// `true`/`false` approve or reject, anything else is text
        #[arg(short, long)]
        value: String,

        /// Graph to resume with (defaults to the one in the checkpoint)
        #[arg(short, long)]
        graph: Option<String>,

        #[arg(long)]
        interactive: bool,
    },
    /// Retry the node that failed on a thread
    Continue {
        #[arg(short, long)]
        thread: String,
    },
    /// Print a thread's checkpoint
    State {
        #[arg(short, long)]
        thread: String,
    },
    /// Delete a thread's checkpoint
    Clear {
        #[arg(short, long)]
        thread: String,
    },
    /// List threads with a checkpoint
    Threads,
    /// List runnable graphs
    Graphs,
    /// Serve the HTTP API
    Serve {
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    if matches!(args.command, Commands::Serve { .. }) {
        tracing_subscriber::fmt::init();
    } else {
        env_logger::init();
    }

    let checkpointer: Arc<dyn Checkpointer> = Arc::new(
        FileCheckpointer::new(args.store.clone())
            .await
            .with_context(|| format!("opening checkpoint store {}", args.store.display()))?,
    );
    let catalog = build_catalog(&args).await;

    match args.command {
        Commands::Run {
            graph,
            input,
            thread,
            interactive,
            max_steps,
        } => {
            let state: Value = serde_json::from_str(&input).context("--input must be JSON")?;
            let state = WorkflowState::from_value(state)
                .ok_or_else(|| anyhow!("--input must be a JSON object"))?;
            let thread_id = thread.map(ThreadId::new).unwrap_or_else(ThreadId::from_timestamp);

            let mut engine = GraphEngine::new(catalog.build(&graph).await?, checkpointer);
            if let Some(max_steps) = max_steps {
                engine = engine.with_config(EngineConfig::default().with_max_steps(max_steps));
            }

            println!("Thread: {}", thread_id);
            let result = engine.run(state, &thread_id).await?;
            drive(&engine, &thread_id, result, interactive).await?;
        }
        Commands::Resume {
            thread,
            value,
            graph,
            interactive,
        } => {
            let thread_id = ThreadId::new(thread);
            let engine = engine_for_thread(&catalog, checkpointer, &thread_id, graph).await?;
            let result = engine.resume(&thread_id, ResumeInput::parse(&value)).await?;
            drive(&engine, &thread_id, result, interactive).await?;
        }
        Commands::Continue { thread } => {
            let thread_id = ThreadId::new(thread);
            let engine = engine_for_thread(&catalog, checkpointer, &thread_id, None).await?;
            let result = engine.continue_run(&thread_id).await?;
            drive(&engine, &thread_id, result, false).await?;
        }
        Commands::State { thread } => {
            let thread_id = ThreadId::new(thread);
            match checkpointer.load(&thread_id).await? {
                Some(checkpoint) => println!("{}", serde_json::to_string_pretty(&checkpoint)?),
                None => bail!("no checkpoint for thread '{}'", thread_id),
            }
        }
        Commands::Clear { thread } => {
            let thread_id = ThreadId::new(thread);
            checkpointer.clear(&thread_id).await?;
            println!("Cleared {}", thread_id);
        }
        Commands::Threads => {
            for thread_id in checkpointer.list().await? {
                match checkpointer.load(&thread_id).await? {
                    Some(cp) => println!("{}\t{}\t{}\t{}", thread_id, cp.graph, cp.status, cp.updated_at),
                    None => println!("{}", thread_id),
                }
            }
        }
        Commands::Graphs => {
            for graph in catalog.list() {
                println!("{:<16} {}", graph.name, graph.description);
            }
        }
        Commands::Serve { port } => {
            server::serve(AppState::new(catalog, checkpointer), port).await?;
        }
    }

    Ok(())
}

async fn build_catalog(args: &Args) -> GraphCatalog {
    let catalog = GraphCatalog::new(default_registry().await, args.graphs_dir.clone());
    match ModelConfig::from_env() {
        Ok(config) => {
            log::info!("Using {} model {}", config.provider, config.model);
            catalog.with_model(config.build())
        }
        Err(e) => {
            log::warn!("No model configured ({}); only model-free graphs will run", e);
            catalog
        }
    }
}

async fn engine_for_thread(
    catalog: &GraphCatalog,
    checkpointer: Arc<dyn Checkpointer>,
    thread_id: &ThreadId,
    graph: Option<String>,
) -> anyhow::Result<GraphEngine> {
    let graph = match graph {
        Some(graph) => graph,
        None => {
            checkpointer
                .load(thread_id)
                .await?
                .ok_or_else(|| anyhow!("no checkpoint for thread '{}'", thread_id))?
                .graph
        }
    };
    Ok(GraphEngine::new(catalog.build(&graph).await?, checkpointer))
}

/// Print the result; in interactive mode keep answering pauses from stdin
async fn drive(
    engine: &GraphEngine,
    thread_id: &ThreadId,
    mut result: RunResult,
    interactive: bool,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match &result {
            RunResult::Completed { state } => {
                println!("Completed:\n{}", serde_json::to_string_pretty(state)?);
                return Ok(());
            }
            RunResult::Paused(pause) => {
                let prompt = match &pause.payload {
                    Value::String(text) => text.clone(),
                    other => serde_json::to_string_pretty(other)?,
                };
                println!("\n[{}] {}", pause.node, prompt);
                if !interactive {
                    println!(
                        "\nPaused. Resume with: pausegraph resume --thread {} --value <{}>",
                        thread_id, pause.expects
                    );
                    return Ok(());
                }

                print!(">>> Enter feedback (text or True): ");
                std::io::Write::flush(&mut std::io::stdout())?;
                let Some(line) = lines.next_line().await? else {
                    println!("\nInput closed; thread {} stays paused", thread_id);
                    return Ok(());
                };
                result = engine.resume(thread_id, ResumeInput::parse(&line)).await?;
            }
        }
    }
}
