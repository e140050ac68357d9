use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use corical::query::{run_batch, run_query};
use corical::{Fact, InferenceBackend, Query};
use serde_json::json;

use corical_cli::config::ServiceConfig;
use corical_cli::facts::{build_query, parse_assignment, parse_override};
use corical_cli::logging::init_logging;

/// Risk estimates from the configured Bayesian network models.
#[derive(Debug, Parser)]
#[command(
    name = "corical",
    author,
    version,
    about = "Personalised risk estimates from Bayesian network models"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "corical.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load every configured model and print a summary.
    Check,
    /// Print the nodes of a model with their states and parents.
    Describe {
        #[arg(short, long)]
        model: String,
    },
    /// Evaluate one query.
    Query {
        #[arg(short, long)]
        model: String,
        /// NODE=STATE, NODE=STATE:W,STATE:W or NODE=[P,P,...]
        #[arg(short, long = "fact", value_name = "FACT", value_parser = parse_assignment)]
        facts: Vec<(String, Fact)>,
        /// Node whose marginal is reported.
        #[arg(short, long = "target", value_name = "NODE", required = true)]
        targets: Vec<String>,
        /// SCENARIO:NODE=VALUE, an override evaluated on a copy of the base facts.
        #[arg(short, long = "scenario", value_name = "OVERRIDE", value_parser = parse_override)]
        scenarios: Vec<(String, String, Fact)>,
    },
    /// Evaluate a JSON array of queries in parallel.
    Batch {
        #[arg(short, long)]
        model: String,
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServiceConfig::from_path(&cli.config)?;
    init_logging(&config.logging);

    let catalog = config
        .load_catalog()
        .context("loading configured models")?;

    let output = match cli.command {
        Command::Check => json!(catalog
            .iter()
            .map(|(name, model)| {
                let net = model.network();
                json!({
                    "model": name,
                    "nodes": net.len(),
                    "roots": net
                        .nodes()
                        .filter(|(_, n)| n.is_root())
                        .map(|(n, _)| n)
                        .collect::<Vec<_>>(),
                    "cyclic": net.is_cyclic(),
                })
            })
            .collect::<Vec<_>>()),
        Command::Describe { model } => {
            let model = catalog.get(&model)?;
            let net = model.network();
            let nodes = net
                .nodes()
                .enumerate()
                .map(|(id, (name, node))| {
                    json!({
                        "name": name,
                        "states": node.states(),
                        "parents": net.parent_names(id).collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>();
            json!({ "nodes": nodes })
        }
        Command::Query {
            model,
            facts,
            targets,
            scenarios,
        } => {
            let backend: &dyn InferenceBackend = catalog.get(&model)?;
            let query = build_query(facts, scenarios, targets);
            serde_json::to_value(run_query(backend, &query)?)?
        }
        Command::Batch { model, input } => {
            let backend: &dyn InferenceBackend = catalog.get(&model)?;
            let file = File::open(&input)
                .with_context(|| format!("opening query file {}", input.display()))?;
            let queries: Vec<Query> = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing query file {}", input.display()))?;
            tracing::info!(model = %model, queries = queries.len(), "running batch");
            let results = run_batch(backend, &queries)
                .into_iter()
                .map(|res| match res {
                    Ok(r) => serde_json::to_value(r),
                    Err(e) => Ok(json!({
                        "error": e.to_string(),
                        "invalid_argument": e.is_invalid_argument(),
                    })),
                })
                .collect::<Result<Vec<_>, _>>()?;
            json!(results)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
