//! SwarmRoute binary
//!
//! Wires environment configuration into the core components and renders
//! their outcomes for each subcommand.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use swarmroute::{
    cli::{Cli, Command},
    client::CompletionClient,
    config::SwarmConfig,
    consensus::ConsensusEngine,
    handlers::{self, AppState},
    health::HealthMonitor,
    pipeline::{Pipeline, PipelineOptions},
    router::AutoRouter,
    swarm::SwarmCaller,
    telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init("info");

    let config = match SwarmConfig::from_env() {
        Ok(config) => Arc::new(config.with_default_model()),
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::from(2);
        }
    };

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Command,
    config: Arc<SwarmConfig>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Command::Query { prompt, tier, system } => {
            let client = CompletionClient::new()?;
            let router = AutoRouter::new(config.clone(), client);
            let health = HealthMonitor::for_config(&config)?;

            let outcome = router
                .route(&prompt, system.as_deref(), tier, Some(&health))
                .await?;
            println!(
                "\n[Model: {} | Tier: {} | {}s]\n",
                outcome.model, outcome.tier, outcome.latency_s
            );
            println!("{}", outcome.response);
            Ok(ExitCode::SUCCESS)
        }

        Command::Consensus { prompt } => {
            let client = CompletionClient::new()?;
            let engine = ConsensusEngine::new(config.clone(), client);
            let health = HealthMonitor::for_config(&config)?;

            let outcome = engine.run(&prompt, None, None, Some(&health)).await?;
            println!("\n[Consensus from {} models]\n", outcome.model_count);
            println!("{}", outcome.merged);
            Ok(ExitCode::SUCCESS)
        }

        Command::Swarm {
            prompt,
            tier,
            max_models,
            timeout,
            first,
        } => {
            let client = CompletionClient::new()?;
            let swarm = SwarmCaller::new(config, client);
            let timeout = Duration::from_secs(timeout);

            if first {
                match swarm.first(&prompt, tier, max_models, timeout).await {
                    Some(winner) => {
                        println!(
                            "\n[First response: {} | {}s]\n",
                            winner.model, winner.elapsed_s
                        );
                        println!("{}", winner.content.unwrap_or_default());
                        Ok(ExitCode::SUCCESS)
                    }
                    None => {
                        eprintln!("ERROR: all models failed");
                        Ok(ExitCode::FAILURE)
                    }
                }
            } else {
                let results = swarm.call(&prompt, tier, max_models, timeout).await;
                println!("\n[Swarm | tier={tier} | {} model(s)]", results.len());
                for (i, result) in results.iter().enumerate() {
                    println!(
                        "\n[{}] {} | {:?} | {}s",
                        i + 1,
                        result.model,
                        result.status,
                        result.elapsed_s
                    );
                    if let Some(content) = &result.content {
                        println!("{content}");
                    } else if let Some(error) = &result.error {
                        println!("Error: {error}");
                    }
                }
                Ok(ExitCode::SUCCESS)
            }
        }

        Command::Pipeline {
            prompt,
            enrich,
            store,
            consensus,
            tier,
        } => {
            let client = CompletionClient::new()?;
            let pipeline = Pipeline::new(config.clone(), client)?;
            let health = HealthMonitor::for_config(&config)?;

            let options = PipelineOptions {
                enrich,
                store,
                use_consensus: consensus,
                tier,
            };
            let outcome = pipeline.run(&prompt, &options, Some(&health)).await?;
            println!(
                "\n[Pipeline | context={} | latency={}s | stored={}]\n",
                outcome.context_results_count, outcome.total_latency_s, outcome.stored
            );
            println!("{}", outcome.answer);
            Ok(ExitCode::SUCCESS)
        }

        Command::Health => {
            println!("\n--- Service Health Check ---");
            let health = HealthMonitor::for_config(&config)?;
            let status = health.refresh().await;

            let mut names: Vec<&String> = status.keys().collect();
            names.sort();
            let mut all_ok = true;
            for name in names {
                let up = status[name];
                let (icon, color) = if up {
                    ("UP  ", "\x1b[32m")
                } else {
                    all_ok = false;
                    ("DOWN", "\x1b[31m")
                };
                println!("  {color}{icon}\x1b[0m  {name}");
            }
            println!();
            Ok(if all_ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }

        Command::Serve { port } => {
            let state = AppState::new(config)?;
            let app = handlers::app(state);

            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
            tracing::info!("SwarmRoute API listening on {addr}");
            println!("\nSwarmRoute API running on http://0.0.0.0:{port}");

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Bridge => {
            swarmroute::bridge::run(config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
