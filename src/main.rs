use clap::{Parser, Subcommand};
use tracing::info;
use vault_assistant::{config::Settings, logger, KnowledgeAssistant, Result};

#[derive(Parser)]
#[command(name = "vault-assistant")]
#[command(about = "RAG assistant over a personal markdown note vault")]
struct Cli {
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Rebuild the vector index on startup even if a saved one exists.
    #[arg(long)]
    force_rebuild: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question against the vault
    Ask {
        question: String,

        /// Deduplicate citations per file instead of listing every chunk
        #[arg(long)]
        no_scores: bool,
    },
    /// Retrieve matching chunks without answer synthesis
    Search {
        query: String,

        #[arg(short, default_value_t = 5)]
        k: usize,
    },
    /// Drop the vector index and rebuild it from the vault
    Rebuild,
    /// Show assistant status as JSON
    Status,
    /// Show vault file statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load(&cli.config)?;

    // Initialize logging
    logger::init(&settings.logging)?;

    info!("Starting vault-assistant v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", cli.config);

    let assistant = KnowledgeAssistant::new(&settings)?;

    match cli.command {
        Command::Ask { question, no_scores } => {
            assistant.initialize(cli.force_rebuild).await?;
            let response = assistant.ask(&question, !no_scores).await?;
            println!("{}", response.answer);
            if !response.sources.is_empty() {
                println!("\nSources:");
                for source in &response.sources {
                    match source.score {
                        Some(score) => println!("  {} (score: {:.4})", source.source, score),
                        None => println!("  {}", source.source),
                    }
                }
            }
        }
        Command::Search { query, k } => {
            assistant.initialize(cli.force_rebuild).await?;
            let matches = assistant.search_documents(&query, k).await?;
            for m in &matches {
                println!("{} (score: {:.4})", m.source, m.score);
                println!("{}\n", m.content);
            }
        }
        Command::Rebuild => {
            assistant.initialize(true).await?;
            println!("Vector index rebuilt");
        }
        Command::Status => {
            assistant.initialize(cli.force_rebuild).await?;
            let status = assistant.get_status().await;
            println!("{}", serde_json::to_string_pretty(&status).unwrap_or_default());
        }
        Command::Stats => {
            let stats = assistant.get_vault_stats()?;
            println!("Vault: {}", stats.vault_path);
            println!("Files: {}", stats.total_files);
            println!("Size: {} bytes", stats.total_size_bytes);
        }
    }

    Ok(())
}
