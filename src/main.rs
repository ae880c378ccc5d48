// src/main.rs

use clap::Parser;
use colored::Colorize;
use plan_compiler::render::render_graphs;
use plan_compiler::{AgentConfig, Planner};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plan-compiler")]
#[command(about = "Compile an automation instruction into validated plan graphs")]
struct Cli {
    /// TOML config file (defaults are used when omitted)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Skip the model and use the pattern planner
    #[arg(long)]
    deterministic: bool,

    /// Print graphs as JSON instead of a tree
    #[arg(long)]
    json: bool,

    /// Instruction to compile
    #[arg(required = true, num_args = 1..)]
    instruction: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };
    if cli.deterministic {
        config.planner.use_llm = false;
    }

    let planner = Planner::from_config(config)?;
    let instruction = cli.instruction.join(" ");
    let graphs = planner.create_plan_graph(&instruction, &[])?;

    if graphs.is_empty() {
        eprintln!("{} instruction was rejected, nothing to execute", "✗".red());
        return Ok(ExitCode::from(2));
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&graphs)?);
    } else {
        println!("{}", render_graphs(&graphs));
    }
    Ok(ExitCode::SUCCESS)
}
