use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use dotenv::dotenv;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use content_crew::agent::build_provider;
use content_crew::config::AppConfig;
use content_crew::pipeline::{self, PipelineDefinition};

struct CliArgs {
    config_path: Option<PathBuf>,
    pipeline_path: Option<PathBuf>,
}

fn print_usage() {
    println!("Content Crew");
    println!();
    println!("Usage: content-crew [OPTIONS] [PIPELINE.toml]");
    println!();
    println!("Runs the built-in content-marketing crew, or the task graph in PIPELINE.toml.");
    println!();
    println!("Options:");
    println!("  -c, --config <FILE>   Configuration file (default: ./crew.toml if present)");
    println!("  -h, --help            Print this help");
    println!();
    println!("Environment:");
    println!("  GROQ_API_KEY / OPENAI_API_KEY / OPENROUTER_API_KEY   model credentials, per provider");
    println!("  TAVILY_API_KEY                                       web search credentials");
    println!("  CREW__<SECTION>__<KEY>                               configuration overrides");
    println!("  RUST_LOG                                             log filter");
}

/// `None` means help was requested
fn parse_args() -> anyhow::Result<Option<CliArgs>> {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        pipeline_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = args.get(i + 1).context("--config needs a file path")?;
                cli.config_path = Some(PathBuf::from(path));
                i += 1;
            }
            "--help" | "-h" => return Ok(None),
            other if other.starts_with('-') => anyhow::bail!("unknown option '{other}'"),
            other => {
                if cli.pipeline_path.is_some() {
                    anyhow::bail!("only one pipeline file may be given");
                }
                cli.pipeline_path = Some(PathBuf::from(other));
            }
        }
        i += 1;
    }

    Ok(Some(cli))
}

async fn run(cli: CliArgs) -> anyhow::Result<String> {
    let mut config = AppConfig::load(cli.config_path.as_deref())?;
    config.load_credentials()?;

    let provider = build_provider(&config.llm)?;
    let tools = pipeline::default_tools(&config)?;

    let crew = match &cli.pipeline_path {
        Some(path) => PipelineDefinition::load(path)?.build(provider, &tools, &config)?,
        None => pipeline::content_marketing_crew(provider, tools, &config)?,
    };
    tracing::info!(?crew, model = %config.model.model_name, "Crew assembled");

    let cancel = crew.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling crew");
            cancel.cancel();
        }
    });

    Ok(crew.kickoff().await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,content_crew=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = match parse_args() {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
