//! Handbook command line
//!
//! Crawls public guidance and company handbooks into Pinecone, answers
//! questions through the conversation engine and mines popular questions.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use handbook::ai::OpenAI;
use handbook::{
    ingest, ingest_manifest, AskRequest, ConversationEngine, CrawlConfig, CrawlTarget, Crawler,
    DocumentIndex, FetcherExt, HttpFetcher, Indexer, MemoryConversationStore, MiningConfig,
    PineconeStore, QuestionArchive, QuestionMiner, SeedManifest, SystemClock, VectorStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

type Index = DocumentIndex<PineconeStore, OpenAI>;
type Engine = ConversationEngine<OpenAI, Index, MemoryConversationStore>;

#[derive(Parser, Debug)]
#[command(name = "handbook", version, about = "Employment handbook retrieval")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site and add its documents to a namespace
    Crawl {
        url: String,

        /// Province, `General` or company namespace
        #[arg(long)]
        namespace: String,

        /// Tag documents as company policy
        #[arg(long)]
        company: Option<String>,

        #[arg(long, default_value_t = 2)]
        depth: usize,
    },

    /// Re-index every public source listed in a seed manifest
    Seed {
        manifest: PathBuf,

        /// Keep every page instead of only employment-related ones
        #[arg(long)]
        all_pages: bool,
    },

    /// Ask one question and print the partitioned answer as JSON
    Ask {
        question: String,

        #[arg(long)]
        province: String,

        #[arg(long, default_value = "")]
        company: String,

        #[arg(long, default_value = "1")]
        thread: String,

        /// Do not store the question for mining
        #[arg(long)]
        no_archive: bool,
    },

    /// Interactive conversation on one thread
    Chat {
        #[arg(long)]
        province: String,

        #[arg(long, default_value = "")]
        company: String,

        #[arg(long, default_value = "cli")]
        thread: String,
    },

    /// Print popular questions from the last week
    Popular {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Mine popular questions on a cron schedule until interrupted
    Schedule {
        /// Six-field cron expression (seconds first)
        #[arg(long, default_value = "0 0 6 * * *")]
        cron: String,
    },

    /// Delete a namespace, or only one source's records in it
    Delete {
        namespace: String,

        #[arg(long)]
        source: Option<String>,
    },

    /// Show per-namespace record counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,handbook=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Crawl {
            url,
            namespace,
            company,
            depth,
        } => {
            let index = build_index(&config);
            let crawler = build_crawler(&config, CrawlConfig::default().with_max_depth(depth))?;
            let target = match company {
                Some(company) => CrawlTarget::for_seed(&parse_url(&url)?, namespace).with_company(company),
                None => CrawlTarget::for_seed(&parse_url(&url)?, namespace),
            };

            let result = ingest(&crawler, &Indexer::new(&index), &url, &target).await;
            print_ingest(&result.namespace, result.chunks, &result.report);
        }

        Command::Seed { manifest, all_pages } => {
            let manifest = SeedManifest::from_path(&manifest)?;
            let mut crawl_config = CrawlConfig::default();
            if !all_pages {
                crawl_config = crawl_config.with_relevance_keywords(CrawlConfig::employment_keywords());
            }

            let index = build_index(&config);
            let crawler = build_crawler(&config, crawl_config)?;
            let results = ingest_manifest(&crawler, &Indexer::new(&index), &manifest).await?;
            for result in &results {
                print_ingest(&result.namespace, result.chunks, &result.report);
            }
        }

        Command::Ask {
            question,
            province,
            company,
            thread,
            no_archive,
        } => {
            let engine = build_engine(&config);
            let request = AskRequest::new(question.as_str(), province.as_str())
                .with_company(company.as_str())
                .with_thread(thread);

            let answer = engine.ask(&request).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);

            if !no_archive {
                archive_question(&engine, &question, &province, &company).await;
            }
        }

        Command::Chat {
            province,
            company,
            thread,
        } => {
            let engine = build_engine(&config);
            run_chat(&engine, &province, &company, &thread).await?;
        }

        Command::Popular { days } => {
            let store = build_store(&config);
            let mining = MiningConfig::default().with_window_days(days);
            let popular = QuestionMiner::new(&store, &SystemClock)
                .with_config(mining)
                .mine()
                .await?;
            println!("{}", serde_json::to_string_pretty(&popular)?);
        }

        Command::Schedule { cron } => {
            let mut scheduler = start_scheduler(config, &cron).await?;
            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutting down scheduler");
            scheduler.shutdown().await?;
        }

        Command::Delete { namespace, source } => {
            let index = build_index(&config);
            match source {
                Some(source) => {
                    index.delete_by_source(&namespace, &source).await?;
                    println!("{} {} from {}", "Deleted".bright_green(), source, namespace);
                }
                None => {
                    index.delete_namespace(&namespace).await?;
                    println!("{} namespace {}", "Deleted".bright_green(), namespace);
                }
            }
        }

        Command::Stats => {
            let stats = build_store(&config).stats().await?;
            for (namespace, count) in &stats.namespaces {
                println!("{:<24} {}", namespace.bright_cyan(), count);
            }
            println!("{:<24} {}", "total".bold(), stats.total());
        }
    }

    Ok(())
}

fn build_ai(config: &Config) -> OpenAI {
    let mut ai = OpenAI::new(&config.openai_api_key)
        .with_model(&config.chat_model)
        .with_embedding_model(&config.embedding_model);
    if let Some(url) = &config.openai_base_url {
        ai = ai.with_base_url(url);
    }
    ai
}

fn build_store(config: &Config) -> PineconeStore {
    PineconeStore::new(&config.pinecone_api_key, &config.pinecone_index_host)
}

fn build_index(config: &Config) -> Index {
    DocumentIndex::new(build_store(config), build_ai(config))
}

fn build_engine(config: &Config) -> Engine {
    ConversationEngine::new(build_ai(config), build_index(config), MemoryConversationStore::new())
}

fn build_crawler(
    config: &Config,
    crawl_config: CrawlConfig,
) -> Result<Crawler<handbook::crawler::RateLimitedFetcher<HttpFetcher>>> {
    let fetcher = HttpFetcher::new(&crawl_config)
        .context("Failed to build HTTP client")?
        .rate_limited(config.crawl_requests_per_second);
    Ok(Crawler::new(fetcher, crawl_config))
}

fn parse_url(url: &str) -> Result<url::Url> {
    url::Url::parse(url).with_context(|| format!("Invalid URL: {}", url))
}

fn print_ingest(namespace: &str, chunks: usize, report: &handbook::IndexReport) {
    let status = if report.is_complete() {
        "ok".bright_green()
    } else {
        "partial".bright_yellow()
    };
    println!(
        "{} {}: {} chunks, {} indexed, {} retries",
        status,
        namespace.bold(),
        chunks,
        report.indexed,
        report.retries
    );
    if !report.failed_batches.is_empty() {
        println!("  failed batches: {:?}", report.failed_batches);
    }
}

/// Archive failures never fail the answer.
async fn archive_question(engine: &Engine, question: &str, province: &str, company: &str) {
    let archive = QuestionArchive::new(
        engine.model(),
        engine.index().embedder(),
        engine.index().store(),
        &SystemClock,
    );
    if let Err(e) = archive.archive(question, province, company).await {
        tracing::warn!(error = %e, "Failed to archive question");
    }
}

async fn run_chat(engine: &Engine, province: &str, company: &str, thread: &str) -> Result<()> {
    println!(
        "{} ({}), empty line to quit",
        "Handbook chat".bright_cyan().bold(),
        province
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bright_blue());
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        let request = AskRequest::new(question, province)
            .with_company(company)
            .with_thread(thread);
        match engine.ask(&request).await {
            Ok(answer) => {
                println!("{}", "Public".bold());
                println!("{}", answer.public_response);
                if !company.is_empty() {
                    println!("{}", company.bold());
                    println!("{}", answer.private_response);
                }
                for source in answer.public_metadata.iter().chain(&answer.private_metadata) {
                    println!("  {} {}", "source:".dimmed(), source.source);
                }
            }
            Err(e) => println!("{} {}", "error:".bright_red(), e),
        }
        archive_question(engine, question, province, company).await;
    }

    Ok(())
}

async fn start_scheduler(config: Config, cron: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let mining_job = Job::new_async(cron, move |_uuid, _lock| {
        let store = build_store(&config);
        Box::pin(async move {
            match QuestionMiner::new(&store, &SystemClock).mine().await {
                Ok(popular) => {
                    for question in &popular {
                        tracing::info!(
                            province = %question.province,
                            company = %question.company,
                            text = %question.text,
                            "Popular question"
                        );
                    }
                }
                Err(e) => tracing::error!("Popular question mining failed: {}", e),
            }
        })
    })
    .with_context(|| format!("Invalid cron expression: {}", cron))?;

    scheduler.add(mining_job).await?;
    scheduler.start().await?;

    tracing::info!(cron = %cron, "Popular question mining scheduled");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_defaults() {
        let cli = Cli::try_parse_from(["handbook", "ask", "Do I get overtime?", "--province", "Ontario"]).unwrap();
        match cli.command {
            Command::Ask {
                question,
                province,
                company,
                thread,
                no_archive,
            } => {
                assert_eq!(question, "Do I get overtime?");
                assert_eq!(province, "Ontario");
                assert_eq!(company, "");
                assert_eq!(thread, "1");
                assert!(!no_archive);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_crawl_requires_namespace() {
        assert!(Cli::try_parse_from(["handbook", "crawl", "https://www.ontario.ca/esa"]).is_err());

        let cli = Cli::try_parse_from([
            "handbook",
            "crawl",
            "https://acme.example/handbook",
            "--namespace",
            "Acme",
            "--company",
            "Acme",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Crawl { depth: 2, company: Some(ref c), .. } if c == "Acme"
        ));
    }

    #[test]
    fn test_delete_source() {
        let cli = Cli::try_parse_from(["handbook", "delete", "Ontario", "--source", "https://www.ontario.ca/esa"]).unwrap();
        assert!(matches!(cli.command, Command::Delete { source: Some(_), .. }));
    }
}
