//! riskgraph CLI: import risk data, run the guideline wizard, inspect the graph.
//!
//! Usage:
//!   riskgraph import <FILE> [--db path]
//!   riskgraph wizard [--db path]
//!   riskgraph query <lookup> [--db path]

use clap::{Parser, Subcommand};
use riskgraph::config::Settings;
use riskgraph::wizard::console::{Console, EditorInput};
use riskgraph::{open_store, GraphStore, Importer, NodeLabel, OllamaClient, Relationship, WizardSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "riskgraph",
    version,
    about = "Risk-governance knowledge graph and AI acquisition guideline wizard"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file (ignored when NEO4J_URI is set)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV or spreadsheet of risk-governance rows
    Import {
        /// File to import (.csv, .xlsx, .xlsm, .xls or .ods)
        file: PathBuf,
    },
    /// Walk Context → Risk → Countermeasure → Guidelines interactively
    Wizard,
    /// Run a single read-only lookup
    Query {
        #[command(subcommand)]
        action: QueryAction,
    },
}

#[derive(Subcommand)]
enum QueryAction {
    /// List every application context
    Applications,
    /// List risks affecting an application
    Risks {
        application: String,
    },
    /// List treatments for a risk that also relate to an application
    Treatments {
        risk: String,
        application: String,
    },
    /// Lifecycle phase of a treatment that modifies a risk
    Phase {
        risk: String,
        treatment: String,
    },
    /// Stakeholder responsible for a treatment
    Stakeholder {
        treatment: String,
    },
    /// Node and edge counts per kind
    Stats,
}

async fn cmd_import(store: Arc<dyn GraphStore>, file: &Path) -> i32 {
    let importer = Importer::new(store);
    let report = match importer.import_path(file).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", file.display(), e);
            return 1;
        }
    };

    for failure in &report.failures {
        eprintln!("  line {}: {}", failure.line, failure.reason);
    }
    println!(
        "Imported {} row(s) from {} ({} failed)",
        report.merged,
        file.display(),
        report.failures.len()
    );
    if report.is_clean() {
        0
    } else {
        2
    }
}

async fn cmd_wizard(store: Arc<dyn GraphStore>, settings: &Settings) -> i32 {
    let model = OllamaClient::new(&settings.model);
    tracing::info!(model = model.model(), url = %settings.model.base_url, "using chat model");
    let input = match EditorInput::new() {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error: cannot open terminal: {}", e);
            return 1;
        }
    };

    let session = WizardSession::new(store, Arc::new(model));
    let mut console = Console::new(session, input, std::io::stdout());
    match console.run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn print_list(values: Vec<String>, empty: &str) {
    if values.is_empty() {
        println!("{}", empty);
    }
    for value in values {
        println!("{}", value);
    }
}

async fn cmd_query(store: Arc<dyn GraphStore>, action: QueryAction) -> i32 {
    let result = match action {
        QueryAction::Applications => store
            .list_applications()
            .await
            .map(|apps| print_list(apps, "No applications found.")),
        QueryAction::Risks { application } => store
            .list_risks(&application)
            .await
            .map(|risks| print_list(risks, &format!("No risks affect '{}'.", application))),
        QueryAction::Treatments { risk, application } => store
            .list_treatments(&risk, &application)
            .await
            .map(|ts| {
                print_list(
                    ts,
                    &format!("No treatments for '{}' relate to '{}'.", risk, application),
                )
            }),
        QueryAction::Phase { risk, treatment } => store
            .treatment_phase(&risk, &treatment)
            .await
            .map(|phase| match phase {
                Some(phase) => println!("{}", phase),
                None => println!("'{}' does not modify '{}'.", treatment, risk),
            }),
        QueryAction::Stakeholder { treatment } => store
            .stakeholder(&treatment)
            .await
            .map(|owner| match owner {
                Some(owner) => println!("{}", owner),
                None => println!("No stakeholder is responsible for '{}'.", treatment),
            }),
        QueryAction::Stats => store.stats().await.map(|stats| {
            for label in NodeLabel::ALL {
                println!("{:<16} {}", label.as_str(), stats.node_count(label));
            }
            for relationship in Relationship::ALL {
                println!("{:<16} {}", relationship.as_str(), stats.edge_count(relationship));
            }
        }),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("riskgraph=info")),
        )
        .init();

    let cli = Cli::parse();

    let settings = match Settings::from_env(cli.db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let store = match open_store(&settings.store).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open graph store: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Import { file } => cmd_import(store, &file).await,
        Commands::Wizard => cmd_wizard(store, &settings).await,
        Commands::Query { action } => cmd_query(store, action).await,
    };
    std::process::exit(code);
}
