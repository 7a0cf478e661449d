//! kokkai-rag - main CLI entry point

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use kokkai_rag::api::ExperimentRequest;
use kokkai_rag::cli::{Args, Commands};
use kokkai_rag::config::WorkflowConfig;
use kokkai_rag::corpus::CorpusLoader;
use kokkai_rag::doctor::{Doctor, HealthStatus};
use kokkai_rag::fetch::{CorpusDownloader, DownloadOptions};
use kokkai_rag::generation::OllamaProvider;
use kokkai_rag::server;
use kokkai_rag::workflow::WorkflowOrchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match &args.command {
        Commands::Ask {
            query,
            max_results,
            roles,
        } => cmd_ask(&args, query, *max_results, roles).await,
        Commands::Serve { host, port } => cmd_serve(&args, host, *port).await,
        Commands::Download {
            total,
            batch_size,
            keyword,
            from_date,
            until_date,
            output_dir,
            no_skip_existing,
        } => {
            let options = DownloadOptions {
                total: *total,
                batch_size: *batch_size,
                keyword: keyword.clone(),
                from_date: from_date.clone(),
                until_date: until_date.clone(),
                output_dir: output_dir
                    .clone()
                    .unwrap_or_else(|| args.data_dir.join("corpus")),
                skip_existing: !no_skip_existing,
            };
            cmd_download(options).await
        }
        Commands::Doctor => cmd_doctor(&args).await,
    }
}

/// Structured JSON logs to stdout; RUST_LOG overrides the -v level
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();
}

/// Load config and corpus, wire up the orchestrator
fn build_orchestrator(args: &Args) -> Result<WorkflowOrchestrator> {
    let config = WorkflowConfig::load().unwrap_or_else(|e| {
        tracing::warn!(event = "config_load_failed", error = %e);
        WorkflowConfig::default()
    });

    let documents = CorpusLoader::new(&args.data_dir).load();
    if documents.is_empty() {
        eprintln!(
            "{}",
            "Warning: corpus is empty; retrieval will return no documents".yellow()
        );
    }

    let provider = Arc::new(OllamaProvider::with_config(&args.ollama_url, &args.model)?);
    Ok(WorkflowOrchestrator::new(documents, provider, config))
}

async fn cmd_ask(
    args: &Args,
    query: &str,
    max_results: usize,
    roles: &[String],
) -> Result<()> {
    let orchestrator = build_orchestrator(args)?;
    println!(
        "{} {} documents indexed",
        "Corpus:".dimmed(),
        orchestrator.document_count()
    );

    let request = ExperimentRequest {
        query: query.to_string(),
        max_results,
        user_roles: roles.to_vec(),
    };
    request.validate()?;

    let response = orchestrator.run(&request, None).await?;

    println!();
    println!("{}", "Answer".green().bold());
    println!("{}", response.answer);

    if response.requires_review {
        if let Some(review) = &response.hitl_review {
            println!();
            println!(
                "{} reason: {}, relevant documents: {}",
                "Human review required.".yellow().bold(),
                review.reason.as_str(),
                review.relevant_doc_count
            );
            if !review.sensitive_keywords.is_empty() {
                println!(
                    "Sensitive terms: {}",
                    review.sensitive_keywords.join(", ")
                );
            }
        }
    }

    if !response.sources.is_empty() {
        println!();
        println!("{}", "Evidence".green().bold());
        for (i, doc) in response.sources.iter().enumerate() {
            println!(
                "{}. [{:.3}] {} {} ({} {})",
                i + 1,
                doc.score,
                doc.speaker,
                doc.date,
                doc.house,
                doc.meeting
            );
            let preview: String = doc.content.chars().take(80).collect();
            println!("   {}", preview.dimmed());
        }
    }

    println!();
    println!("{} {:?}", "Steps:".dimmed(), response.workflow_steps);
    println!(
        "{} {:.2} ms",
        "Elapsed:".dimmed(),
        response.processing_time_ms
    );

    Ok(())
}

async fn cmd_serve(args: &Args, host: &str, port: u16) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(args)?);
    println!(
        "{} http://{}:{} ({} documents indexed)",
        "Serving on".green().bold(),
        host,
        port,
        orchestrator.document_count()
    );
    server::serve(orchestrator, host, port).await?;
    Ok(())
}

async fn cmd_download(options: DownloadOptions) -> Result<()> {
    let downloader = CorpusDownloader::new()?;
    let count = downloader.download(&options).await?;
    println!(
        "{} {} records saved under {}",
        "Download complete:".green().bold(),
        count,
        options.output_dir.display()
    );
    Ok(())
}

async fn cmd_doctor(args: &Args) -> Result<()> {
    let doctor = Doctor::new(
        args.ollama_url.clone(),
        args.model.clone(),
        args.data_dir.clone(),
    );
    let checks = doctor.run_diagnostics().await;

    let mut failed = false;
    for check in &checks {
        match &check.status {
            HealthStatus::Pass => println!("{} {}", "✓".green(), check.name),
            HealthStatus::Warn(msg) => {
                println!("{} {}: {}", "⚠".yellow(), check.name, msg)
            }
            HealthStatus::Fail(msg) => {
                failed = true;
                println!("{} {}: {}", "✗".red(), check.name, msg)
            }
        }
    }

    if failed {
        anyhow::bail!("one or more health checks failed");
    }
    Ok(())
}
