use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sift::config::{Config, LabelerMode};
use sift::corpus::models::{decode_categories, CategoryScores, NewReview, Sentiment, Subjectivity};
use sift::corpus::sqlite::SqliteCorpus;
use sift::corpus::traits::CorpusStore;
use sift::labeling::chat::ChatLabeler;
use sift::labeling::traits::TopicLabeler;
use sift::pipeline::modeler::ModelerConfig;
use sift::pipeline::sample::{SamplerConfig, SampleSummary};
use sift::topics::cluster::DensityClusterer;
use sift::topics::embeddings::SentenceEmbedder;
use sift::topics::keywords::TfIdfKeywords;
use sift::topics::reduce::PcaReducer;

/// Sift: adaptive topic discovery and representative sampling for reviews.
///
/// Discovers what customers actually talk about in each category of a review
/// corpus, labels the themes, and compresses thousands of reviews into a
/// small sample that still covers every sentiment, category, and topic.
#[derive(Parser)]
#[command(name = "sift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Import reviews (and optionally classifier scores) from JSON files
    Import {
        /// Path to a JSON array of review objects
        file: String,

        /// Path to a JSON object mapping review ids to per-category scores
        #[arg(long)]
        scores: Option<String>,
    },

    /// Download the ONNX sentence-embedding model (~90 MB)
    DownloadModel,

    /// Discover and label topics for every review category
    Topics {
        /// Re-model even if topics were already assigned
        #[arg(long)]
        force: bool,

        /// Minimum reviews a category needs to be modeled (default: 50)
        #[arg(long, default_value = "50")]
        min_volume: u32,

        /// Number of categories to model in parallel (default: 4)
        #[arg(long, default_value = "4")]
        concurrency: u32,
    },

    /// Select a representative sample from the labeled corpus
    Sample {
        /// Topics to keep per category (default: 3)
        #[arg(long, default_value = "3")]
        top_subtopics: u32,

        /// Sample neutral-sentiment reviews as well
        #[arg(long)]
        include_neutral: bool,

        /// Rebuild even if a sample is already stored
        #[arg(long)]
        force: bool,
    },

    /// Run the full pipeline: topic discovery, then sampling
    Run {
        /// Re-run stages even if their results are already stored
        #[arg(long)]
        force: bool,

        /// Minimum reviews a category needs to be modeled (default: 50)
        #[arg(long, default_value = "50")]
        min_volume: u32,

        /// Number of categories to model in parallel (default: 4)
        #[arg(long, default_value = "4")]
        concurrency: u32,

        /// Topics to keep per category (default: 3)
        #[arg(long, default_value = "3")]
        top_subtopics: u32,

        /// Sample neutral-sentiment reviews as well
        #[arg(long)]
        include_neutral: bool,
    },

    /// Show corpus, topic, and sample status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sift=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let config = Config::load()?;
            info!(db_path = %config.db_path, "Initializing database");

            let store = init_store(&config)?;
            let table_count = store.table_count().await?;

            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext steps:");
            println!("  1. sift download-model");
            println!("  2. sift import <reviews.json>");
            println!("  3. sift run");
        }

        Commands::Import { file, scores } => {
            let config = Config::load()?;
            let store = open_store(&config)?;

            println!("Importing reviews from {file}...");
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {file}"))?;
            let records: Vec<ImportRecord> = serde_json::from_str(&raw)
                .context("Import file is not a JSON array of review objects")?;

            let mut imported = 0usize;
            let mut blank = 0usize;
            for record in &records {
                if record.text.trim().is_empty() {
                    blank += 1;
                    continue;
                }
                store.insert_review(&to_new_review(record)).await?;
                imported += 1;
            }

            store
                .set_state("last_import_at", &Utc::now().to_rfc3339())
                .await?;

            println!("  {imported} reviews imported");
            if blank > 0 {
                println!("  {blank} skipped (empty text)");
            }

            if let Some(scores_file) = scores {
                println!("Importing category scores from {scores_file}...");
                let raw = std::fs::read_to_string(&scores_file)
                    .with_context(|| format!("Failed to read {scores_file}"))?;
                let parsed: HashMap<String, CategoryScores> = serde_json::from_str(&raw)
                    .context("Scores file is not a JSON object keyed by review id")?;

                let mut stored = 0usize;
                for (key, score_map) in &parsed {
                    match key.parse::<i64>() {
                        Ok(review_id) => {
                            store.upsert_category_scores(review_id, score_map).await?;
                            stored += 1;
                        }
                        Err(_) => {
                            warn!(key = %key, "Skipping score entry with non-numeric review id");
                        }
                    }
                }
                println!("  {stored} score entries stored");
            }

            println!("\n{}", "Import complete.".bold());
            println!("Next: run `sift topics` to discover what reviewers talk about.");
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            println!("Downloading sentence embedding model...");
            println!("  Destination: {}", config.model_dir.display());

            sift::topics::download::download_model(&config.model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `sift topics`.");
        }

        Commands::Topics {
            force,
            min_volume,
            concurrency,
        } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            discover_topics(
                &config,
                &store,
                force,
                min_volume as usize,
                concurrency as usize,
            )
            .await?;
        }

        Commands::Sample {
            top_subtopics,
            include_neutral,
            force,
        } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            build_sample(&store, top_subtopics as usize, include_neutral, force).await?;
        }

        Commands::Run {
            force,
            min_volume,
            concurrency,
            top_subtopics,
            include_neutral,
        } => {
            let config = Config::load()?;
            let store = open_store(&config)?;

            discover_topics(
                &config,
                &store,
                force,
                min_volume as usize,
                concurrency as usize,
            )
            .await?;
            build_sample(&store, top_subtopics as usize, include_neutral, force).await?;
        }

        Commands::Status => {
            let config = Config::load()?;
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `sift init` to set up the database.");
                return Ok(());
            }
            let store = open_store(&config)?;
            sift::status::show(&store, &config.db_path).await?;
        }
    }

    Ok(())
}

/// One review as it appears in the import file. Categories may arrive as a
/// JSON array or as comma-separated text; classifier exports produce both.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    #[serde(default)]
    id: Option<i64>,
    text: String,
    #[serde(default)]
    stay_date: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    subjectivity: Option<String>,
    #[serde(default)]
    categories: Option<serde_json::Value>,
}

/// Convert an import record into a row, parsing annotations leniently — a
/// malformed field becomes `None` instead of failing the whole import.
fn to_new_review(record: &ImportRecord) -> NewReview {
    let stay_date = record.stay_date.as_deref().and_then(|raw| {
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                warn!(date = raw, "Ignoring unparseable stay date");
                None
            }
        }
    });

    let categories = match &record.categories {
        Some(value @ serde_json::Value::Array(_)) => decode_categories(&value.to_string()),
        Some(serde_json::Value::String(raw)) => decode_categories(raw),
        _ => Vec::new(),
    };

    NewReview {
        id: record.id,
        text: record.text.clone(),
        stay_date,
        rating: record.rating,
        sentiment: record.sentiment.as_deref().and_then(Sentiment::parse),
        subjectivity: record.subjectivity.as_deref().and_then(Subjectivity::parse),
        categories,
    }
}

/// Discover and label topics for every category, then persist the per-review
/// topic maps. Skipped when topics are already assigned unless `force` is set.
async fn discover_topics(
    config: &Config,
    store: &Arc<dyn CorpusStore>,
    force: bool,
    min_volume: usize,
    concurrency: usize,
) -> Result<()> {
    if !force {
        if let Some(completed_at) = store.get_state("topics_completed_at").await? {
            println!("Topics already assigned (completed {completed_at}).");
            println!("{}", "To re-model, run: sift topics --force".dimmed());
            return Ok(());
        }
    }

    config.require_embedder()?;
    config.require_labeler()?;

    let reviews = store.load_reviews().await?;
    if reviews.is_empty() {
        bail!("No reviews imported. Run `sift import <file>` first.");
    }

    if force {
        store.clear_topics().await?;
    }

    let embedder = SentenceEmbedder::load(&config.model_dir)?;
    let labeler = create_labeler(config)?;
    let modeler_config = ModelerConfig {
        min_volume,
        ..Default::default()
    };

    let summary = sift::pipeline::aggregate::run(
        &reviews,
        &embedder,
        &PcaReducer,
        &DensityClusterer,
        &TfIdfKeywords,
        labeler.as_ref(),
        &modeler_config,
        concurrency,
    )
    .await;

    store.save_topic_maps(&summary.topic_maps).await?;
    store
        .set_state("topics_completed_at", &Utc::now().to_rfc3339())
        .await?;

    sift::output::terminal::display_topic_summary(&summary);
    println!("{}", "Topic discovery complete.".bold());
    Ok(())
}

/// Select the representative sample and persist it. Shows the stored sample
/// when one exists unless `force` is set.
async fn build_sample(
    store: &Arc<dyn CorpusStore>,
    top_subtopics: usize,
    include_neutral: bool,
    force: bool,
) -> Result<()> {
    if !force && store.count_sample().await? > 0 {
        let selections = store.load_sample().await?;
        let cached = SampleSummary {
            selections,
            total_reviews: store.count_reviews().await? as usize,
            eligible_reviews: 0,
            used_corpus_fallback: false,
        };
        println!("Loading stored sample...");
        sift::output::terminal::display_sample(&cached);
        println!("{}", "To rebuild, run: sift sample --force".dimmed());
        return Ok(());
    }

    let reviews = store.load_reviews().await?;
    if reviews.is_empty() {
        bail!("No reviews imported. Run `sift import <file>` first.");
    }
    if store.topics_assigned_count().await? == 0 {
        println!(
            "{}",
            "Tip: no topics assigned yet — run `sift topics` first for topical sampling.".dimmed()
        );
    }

    let scores = store.load_category_scores().await?;
    let sampler_config = SamplerConfig {
        top_n_subtopics: top_subtopics,
        include_neutral,
        ..Default::default()
    };

    let summary =
        sift::pipeline::sample::select_representatives(&reviews, &scores, &sampler_config);

    store.replace_sample(&summary.selections).await?;
    store
        .set_state("sample_completed_at", &Utc::now().to_rfc3339())
        .await?;

    sift::output::terminal::display_sample(&summary);
    println!("{}", "Sample saved.".bold());
    Ok(())
}

/// Create the database and wrap it in the store interface.
fn init_store(config: &Config) -> Result<Arc<dyn CorpusStore>> {
    let conn = sift::corpus::initialize(&config.db_path)?;
    Ok(Arc::new(SqliteCorpus::new(conn)))
}

/// Open an existing database; fails with a hint when `sift init` hasn't run.
fn open_store(config: &Config) -> Result<Arc<dyn CorpusStore>> {
    let conn = sift::corpus::open(&config.db_path)?;
    Ok(Arc::new(SqliteCorpus::new(conn)))
}

/// Build the topic labeler the configuration selects.
fn create_labeler(config: &Config) -> Result<Box<dyn TopicLabeler>> {
    match config.labeler_mode {
        LabelerMode::Api => {
            info!(model = %config.openai_model, "Labeling through hosted chat API");
        }
        LabelerMode::Local => {
            info!(model = %config.ollama_model, "Labeling through local Ollama");
        }
    }

    let labeler = ChatLabeler::new(
        config.labeler_base_url(),
        config.labeler_api_key(),
        config.labeler_model(),
        config.temperature,
    )?;
    Ok(Box::new(labeler))
}
