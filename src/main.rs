use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use qalign::{
    AlignConfig, AnthropicClient, AnthropicConfig, BatchConfig, ClassifierGateway, GatewayConfig,
    RenderConfig, TableFormat, execute_batch, parse_templates_file, parse_utterance_file,
    process_transcript,
};

#[derive(Parser)]
#[command(name = "qalign")]
#[command(author, version, about = "Interview question/answer alignment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract question/answer pairs from one translated transcript
    Process {
        /// Input transcript table (.csv or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Template questions (.json array or one per line)
        #[arg(short, long)]
        templates: PathBuf,

        /// Output QA table (.csv or .json)
        #[arg(short, long)]
        output: PathBuf,

        /// Override the classifier model
        #[arg(long)]
        model: Option<String>,

        /// Classifier attempts per utterance before treating it as unlabelled
        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Send blank utterances to the classifier too
        #[arg(long)]
        keep_blank: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Extract question/answer pairs from many transcripts concurrently
    Batch {
        /// Input transcript tables (.csv or .json)
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Template questions (.json array or one per line)
        #[arg(short, long)]
        templates: PathBuf,

        /// Directory for `<stem>_qa.<ext>` outputs
        #[arg(long)]
        output_dir: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: TableFormat,

        /// Transcripts processed at once
        #[arg(long, default_value = "4")]
        concurrency: usize,

        /// Override the classifier model
        #[arg(long)]
        model: Option<String>,

        /// Classifier attempts per utterance before treating it as unlabelled
        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Summarize a transcript table without calling the classifier
    Analyze {
        /// Input transcript table (.csv or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Template questions to validate alongside
        #[arg(short, long)]
        templates: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            templates,
            output,
            model,
            max_attempts,
            keep_blank,
            verbose,
        } => {
            setup_logging(verbose);
            let gateway = build_gateway(model, max_attempts)?;
            let templates = parse_templates_file(&templates)
                .with_context(|| format!("Failed to load templates from {:?}", templates))?;
            info!("Loaded {} template questions", templates.len());

            let align = AlignConfig {
                skip_blank_utterances: !keep_blank,
            };
            let summary = process_transcript(
                &gateway,
                &templates,
                &input,
                &output,
                &align,
                &RenderConfig::default(),
            )
            .await?;

            info!(
                "Complete: {} QA records written to {:?}",
                summary.records, summary.output
            );
            Ok(())
        }
        Commands::Batch {
            input,
            templates,
            output_dir,
            format,
            concurrency,
            model,
            max_attempts,
            verbose,
        } => {
            setup_logging(verbose);
            let gateway = Arc::new(build_gateway(model, max_attempts)?);
            let templates = parse_templates_file(&templates)
                .with_context(|| format!("Failed to load templates from {:?}", templates))?;

            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

            let config = BatchConfig {
                output_dir,
                format,
                concurrency,
                ..Default::default()
            };
            let results = execute_batch(gateway, Arc::new(templates), input, &config).await;

            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            for (path, result) in &results {
                if let Ok(summary) = result {
                    info!("{:?}: {} records -> {:?}", path, summary.records, summary.output);
                }
            }

            if failed > 0 {
                anyhow::bail!("{} of {} transcripts failed", failed, results.len());
            }
            info!("Complete: {} transcripts processed", results.len());
            Ok(())
        }
        Commands::Analyze {
            input,
            templates,
            verbose,
        } => {
            setup_logging(verbose);
            analyze_transcript(input, templates)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn build_gateway(
    model: Option<String>,
    max_attempts: u32,
) -> Result<ClassifierGateway<AnthropicClient>> {
    let mut config = AnthropicConfig::from_env()?;
    if let Some(model) = model {
        config.model = model;
    }

    let client = AnthropicClient::new(config);
    info!("Classifying with model {}", client.model());
    Ok(ClassifierGateway::new(client, GatewayConfig { max_attempts }))
}

fn analyze_transcript(input: PathBuf, templates: Option<PathBuf>) -> Result<()> {
    info!("Analyzing transcript from {:?}", input);
    let transcript = parse_utterance_file(&input).context("Failed to parse input transcript")?;

    println!("Transcript Analysis");
    println!("===================");
    println!("Column scheme: {}", transcript.scheme);
    println!("Utterances: {}", transcript.len());
    if let Some((start, end)) = transcript.time_span() {
        println!("Time span: {:.1}s - {:.1}s ({:.1}s)", start, end, end - start);
    }
    println!(
        "Blank utterances: {}",
        transcript.utterances.iter().filter(|u| u.is_blank()).count()
    );

    let non_monotonic = transcript.non_monotonic_count();
    println!("Out-of-order start times: {}", non_monotonic);
    if non_monotonic > 0 {
        warn!(
            "{} utterances start before their predecessor; alignment still follows file order",
            non_monotonic
        );
    }

    if !transcript.is_empty() {
        let avg_duration = transcript.utterances.iter().map(|u| u.duration()).sum::<f64>()
            / transcript.len() as f64;
        println!("Average utterance duration: {:.2}s", avg_duration);
    }

    if let Some(path) = templates {
        let templates = parse_templates_file(&path)
            .with_context(|| format!("Failed to load templates from {:?}", path))?;
        println!();
        println!("Template Questions");
        println!("------------------");
        for (i, question) in templates.questions().iter().enumerate() {
            println!("{}. {}", i + 1, question);
        }
    }

    Ok(())
}
