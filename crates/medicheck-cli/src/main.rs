use anyhow::Result;
use clap::{Parser, Subcommand};
use medicheck_execution::{LogConfig, init_logging};
use medicheck_infrastructure::ConfigService;
use medicheck_interaction::MonarchApiClient;
use std::path::PathBuf;
use std::sync::Arc;

mod commands;

#[derive(Parser)]
#[command(name = "medicheck")]
#[command(about = "MediCheck CLI - phenotype refinement and disease matching", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search ontology terms by name
    Search {
        query: String,
        /// Restrict results to a Biolink category
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List the direct children of a term
    Children {
        term_id: String,
        /// Defaults to the configured children limit
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Rank diseases matching a set of phenotype terms
    Match {
        #[arg(required = true)]
        term_ids: Vec<String>,
    },
    /// Run a full decision graph session over the given terms
    Run {
        #[arg(required = true)]
        term_ids: Vec<String>,
        /// Select the first child of every question instead of skipping
        #[arg(long)]
        answer_all: bool,
        /// Do not persist the completed consultation
        #[arg(long)]
        no_save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LogConfig {
        verbose: cli.verbose,
        ..Default::default()
    })?;

    let config_service = match cli.config {
        Some(path) => ConfigService::new(path),
        None => ConfigService::default_location()?,
    };
    let config = config_service.get_config()?;
    tracing::debug!("[CLI] Ontology service at {}", config.ontology.base_url);
    let client = Arc::new(MonarchApiClient::from_config(&config));

    match cli.command {
        Commands::Search {
            query,
            category,
            limit,
        } => commands::lookup::search(client.as_ref(), &query, category.as_deref(), limit).await?,
        Commands::Children { term_id, limit } => {
            let limit = limit.unwrap_or(config.ontology.children_limit);
            commands::lookup::children(client.as_ref(), &term_id, limit).await?
        }
        Commands::Match { term_ids } => commands::lookup::match_diseases(client.as_ref(), &term_ids).await?,
        Commands::Run {
            term_ids,
            answer_all,
            no_save,
        } => {
            let options = commands::run::RunOptions {
                answer_all,
                save: !no_save,
            };
            commands::run::run(client, &config, &term_ids, options).await?
        }
    }

    Ok(())
}
