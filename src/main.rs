//! Model Judge CLI
//!
//! Compare several LLMs on one question and let a judge model score them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use model_judge::{
    CompetingModel, ComparisonRun, Config, ConversationRun, EvaluationRecord, FileHistoryStore,
    HistoryEntry, HistoryStore, LlmClient, Rubric, ScoreAggregator,
    history::export_json,
    logging::init_tracing,
    report::{to_csv, to_markdown, to_terminal_table},
    rubric::Category,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Model Judge - compare LLM answers and score them with an LLM judge
#[derive(Parser)]
#[command(name = "model-judge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level or filter directive (overrides --verbose)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask every competitor, then let the judge score the answers
    Compare {
        /// The question put to every competitor
        question: String,

        /// Competitor model name (repeatable; defaults to judge.competitors)
        #[arg(short, long = "model")]
        models: Vec<String>,

        /// Judge model (defaults to the configured LLM model)
        #[arg(short, long)]
        judge: Option<String>,

        /// Do not record the run in history
        #[arg(long)]
        no_history: bool,

        /// Also write the records as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the category summary as Markdown
        #[arg(long)]
        markdown: bool,

        /// Print the judge's full response
        #[arg(long)]
        show_judge: bool,
    },

    /// Hold a multi-turn conversation with several models, then judge it
    Converse {
        /// User messages, one per round, sent to every model in order
        #[arg(required = true)]
        turns: Vec<String>,

        /// Model taking part (repeat at least twice; defaults to judge.competitors)
        #[arg(short, long = "model")]
        models: Vec<String>,

        /// Judge model (defaults to the configured LLM model)
        #[arg(short, long)]
        judge: Option<String>,

        /// Print the judge's full response
        #[arg(long)]
        show_judge: bool,

        /// Output the transcripts and verdicts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract scores from a saved judge response
    Score {
        /// File holding the judge's response text
        judge_file: PathBuf,

        /// Competitor model names, in the order the judge saw them
        #[arg(short, long = "model", required = true)]
        models: Vec<String>,

        /// The question the competitors answered (used for the prompt excerpt)
        #[arg(short, long, default_value = "")]
        question: String,

        /// Output records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the scoring rubric
    Criteria,

    /// Inspect or manage evaluation history
    History {
        /// History file (defaults to judge.history_path)
        #[arg(long, global = true)]
        path: Option<PathBuf>,

        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Test LLM connection
    Test,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List stored runs, newest first
    List,

    /// Show one stored run
    Show {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one stored run
    Delete { id: String },

    /// Delete all stored runs
    Clear,

    /// Write all stored runs to a JSON file
    Export { output: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match cli.command {
        Commands::Compare {
            question,
            models,
            judge,
            no_history,
            csv,
            markdown,
            show_judge,
        } => {
            let options = CompareOptions {
                judge,
                no_history,
                csv,
                markdown,
                show_judge,
            };
            cmd_compare(question, models, options).await
        }
        Commands::Converse {
            turns,
            models,
            judge,
            show_judge,
            json,
        } => cmd_converse(turns, models, judge, show_judge, json).await,
        Commands::Score {
            judge_file,
            models,
            question,
            json,
        } => cmd_score(judge_file, models, question, json),
        Commands::Criteria => cmd_criteria(),
        Commands::History { path, action } => cmd_history(path, action),
        Commands::Test => cmd_test().await,
    }
}

struct CompareOptions {
    judge: Option<String>,
    no_history: bool,
    csv: Option<PathBuf>,
    markdown: bool,
    show_judge: bool,
}

async fn cmd_compare(question: String, models: Vec<String>, options: CompareOptions) -> Result<()> {
    println!("Loading configuration...");
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let names = if models.is_empty() {
        config.judge.competitors.clone()
    } else {
        models
    };
    if names.is_empty() {
        anyhow::bail!("No competitors given. Pass --model or set judge.competitors in the config file.");
    }

    let judge_model = options.judge.unwrap_or_else(|| config.llm.model.clone());
    let competitors = CompetingModel::from_names(names);

    println!("Question:    {}", question);
    println!(
        "Competitors: {}",
        competitors
            .iter()
            .map(|m| m.display_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Judge:       {}", judge_model);
    println!("\nCollecting answers and judging...");

    let client = LlmClient::new(config.llm.clone());
    let run = ComparisonRun::new(client, judge_model);
    let outcome = run
        .run(&question, &competitors)
        .await
        .context("Comparison failed")?;

    if options.show_judge {
        println!("\nJudge response:");
        println!("{}", "─".repeat(60));
        println!("{}", outcome.judge_text);
        println!("{}", "─".repeat(60));
    }

    println!();
    print_records(&outcome.records);

    if options.markdown {
        println!("\n{}", to_markdown(&outcome.records));
    }

    if let Some(csv_path) = &options.csv {
        write_file(csv_path, &to_csv(&outcome.records))?;
        println!("\nCSV saved to: {}", csv_path.display());
    }

    if !options.no_history {
        let store = FileHistoryStore::new(&config.judge.history_path, config.judge.history_limit);
        let entry = HistoryEntry::new(
            outcome.question.clone(),
            outcome.judge_model.clone(),
            outcome.records.clone(),
        );
        let id = entry.id.clone();
        store.append(entry).context("Failed to save history")?;
        println!("\nSaved to history as {}", id);
    }

    println!("Finished in {:.2}s", outcome.elapsed_secs);

    Ok(())
}

async fn cmd_converse(
    turns: Vec<String>,
    models: Vec<String>,
    judge: Option<String>,
    show_judge: bool,
    json: bool,
) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let models = if models.is_empty() {
        config.judge.competitors.clone()
    } else {
        models
    };
    let judge_model = judge.unwrap_or_else(|| config.llm.model.clone());

    let client = LlmClient::new(config.llm.clone());
    let mut run = ConversationRun::new(client, judge_model, models)
        .context("Cannot start conversation")?;

    for (round, turn) in turns.iter().enumerate() {
        let replies = run
            .send(turn)
            .await
            .with_context(|| format!("Round {} failed", round + 1))?;

        if !json {
            println!("Round {}: {}", round + 1, turn);
            println!("{}", "─".repeat(60));
            for (conversation, reply) in run.conversations().iter().zip(&replies) {
                println!("[{}]\n{}\n", conversation.model, reply);
            }
        }
    }

    if !json {
        println!("Judging {} rounds with {}...", run.rounds(), run.judge_model());
    }
    let outcome = run.evaluate().await.context("Evaluation failed")?;

    if json {
        let json_str =
            serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?;
        println!("{}", json_str);
        return Ok(());
    }

    if show_judge {
        println!("\nJudge response:");
        println!("{}", "─".repeat(60));
        println!("{}", outcome.judge_text);
        println!("{}", "─".repeat(60));
    }

    println!("\nScores (out of 100):");
    for (i, verdict) in outcome.verdicts.iter().enumerate() {
        let score = verdict
            .score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {}. {:<24} {}", i + 1, verdict.model, score);
    }
    println!("Judged in {:.2}s", outcome.elapsed_secs);

    Ok(())
}

fn cmd_score(judge_file: PathBuf, models: Vec<String>, question: String, json: bool) -> Result<()> {
    let judge_text = std::fs::read_to_string(&judge_file)
        .with_context(|| format!("Failed to read judge response '{}'", judge_file.display()))?;

    let competitors = CompetingModel::from_names(models);
    let start = Instant::now();
    let records = ScoreAggregator::new().build_records(
        &judge_text,
        &competitors,
        &question,
        &HashMap::new(),
    );
    let duration = start.elapsed();

    if json {
        let json_str =
            serde_json::to_string_pretty(&records).context("Failed to serialize records")?;
        println!("{}", json_str);
    } else {
        print_records(&records);
        println!("Extracted in {:.2?}", duration);
    }

    Ok(())
}

fn cmd_criteria() -> Result<()> {
    println!("Scoring Rubric (total {} points)", Rubric::total_ceiling());
    println!("{}", "─".repeat(40));

    for category in Category::ALL {
        println!(
            "{} / {} ({} points)",
            category.label(),
            category.display_name(),
            Rubric::category_ceiling(category)
        );
        for criterion in Rubric::criteria().iter().filter(|c| c.category == category) {
            println!(
                "  - {:<12} {:<8} {}",
                criterion.id, criterion.label, criterion.max_points
            );
        }
    }

    Ok(())
}

fn cmd_history(path: Option<PathBuf>, action: HistoryAction) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let path = path.unwrap_or(config.judge.history_path);
    let store = FileHistoryStore::new(&path, config.judge.history_limit);

    match action {
        HistoryAction::List => {
            let entries = store.list().context("Failed to load history")?;
            if entries.is_empty() {
                println!("No history at {}", path.display());
                return Ok(());
            }

            for entry in &entries {
                let winner = entry
                    .winner()
                    .map(|r| format!("{} ({})", r.model_display_name, r.total_score))
                    .unwrap_or_else(|| "-".to_string());
                let question: String = entry.question.chars().take(40).collect();
                println!(
                    "{}  {}  judge={}  best={}  {}",
                    entry.id,
                    entry.date.format("%Y-%m-%d %H:%M"),
                    entry.judge_model,
                    winner,
                    question
                );
            }
            println!("\n{} entries", entries.len());
        }
        HistoryAction::Show { id, json } => {
            let entry = store.get(&id).context("Failed to load history entry")?;
            if json {
                let json_str =
                    serde_json::to_string_pretty(&entry).context("Failed to serialize entry")?;
                println!("{}", json_str);
            } else {
                println!("Question: {}", entry.question);
                println!("Judge:    {}", entry.judge_model);
                println!("Date:     {}", entry.date.to_rfc3339());
                println!();
                print_records(&entry.records);
            }
        }
        HistoryAction::Delete { id } => {
            store.delete(&id).context("Failed to delete history entry")?;
            println!("Deleted {}", id);
        }
        HistoryAction::Clear => {
            store.clear().context("Failed to clear history")?;
            println!("History cleared");
        }
        HistoryAction::Export { output } => {
            let entries = store.list().context("Failed to load history")?;
            export_json(&entries, &output).context("Failed to export history")?;
            println!("Exported {} entries to {}", entries.len(), output.display());
        }
    }

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!(
        "  API Key:   {}...",
        config.llm.api_key.chars().take(8).collect::<String>()
    );
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => {
            println!("Connection successful!");
        }
        Err(e) => {
            println!("Connection failed: {}", e);
        }
    }

    Ok(())
}

fn print_records(records: &[EvaluationRecord]) {
    print!("{}", to_terminal_table(records));

    println!("\nSuggestions:");
    for record in records {
        println!("  {}: {}", record.model_display_name, record.suggestions);
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create '{}'", parent.display()))?;
        }
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write '{}'", path.display()))
}
