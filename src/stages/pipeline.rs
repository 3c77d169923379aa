use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::io::{TableFormat, parse_utterance_file};
use crate::llm::{Classifier, ClassifierGateway};
use crate::models::{ColumnScheme, TemplateSet};
use crate::stages::{AlignConfig, AlignmentStats, RenderConfig, execute_alignment, execute_render};

/// Outcome of processing one transcript file
#[derive(Debug)]
pub struct TranscriptSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub scheme: ColumnScheme,
    pub records: usize,
    pub stats: AlignmentStats,
}

/// Load, align and write one transcript.
///
/// Load errors abort before anything is written.
pub async fn process_transcript<C: Classifier>(
    gateway: &ClassifierGateway<C>,
    templates: &TemplateSet,
    input: &Path,
    output: &Path,
    align: &AlignConfig,
    render: &RenderConfig,
) -> Result<TranscriptSummary> {
    info!("Loading transcript from {:?}", input);
    let transcript = parse_utterance_file(input)
        .with_context(|| format!("Failed to load transcript {:?}", input))?;
    info!(
        "Loaded {} utterances ({} column scheme)",
        transcript.len(),
        transcript.scheme
    );

    let alignment = execute_alignment(gateway, &transcript, templates, align).await;
    let rendered = execute_render(
        &alignment.records,
        &alignment.stats,
        input,
        transcript.scheme,
        output,
        render,
    )?;

    Ok(TranscriptSummary {
        input: input.to_path_buf(),
        output: rendered.path,
        scheme: transcript.scheme,
        records: alignment.records.len(),
        stats: alignment.stats,
    })
}

/// Configuration for batch processing
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub output_dir: PathBuf,
    pub format: TableFormat,
    /// Maximum transcripts in flight at once
    pub concurrency: usize,
    pub align: AlignConfig,
    pub render: RenderConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            format: TableFormat::Csv,
            concurrency: 4,
            align: AlignConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl BatchConfig {
    /// `<output_dir>/<input stem>_qa.<ext>`
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "transcript".to_string());
        self.output_dir
            .join(format!("{}_qa.{}", stem, self.format.extension()))
    }
}

/// Process many transcripts concurrently.
///
/// Each transcript gets its own state machine; only the gateway and template
/// set are shared, read-only. Results come back in input order, and a fatal
/// error in one file does not stop the others. An input whose output path is
/// already claimed by an earlier input is rejected before anything runs.
pub async fn execute_batch<C: Classifier + 'static>(
    gateway: Arc<ClassifierGateway<C>>,
    templates: Arc<TemplateSet>,
    inputs: Vec<PathBuf>,
    config: &BatchConfig,
) -> Vec<(PathBuf, Result<TranscriptSummary>)> {
    let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let render = RenderConfig {
        format: Some(config.format),
        ..config.render.clone()
    };

    let mut claimed = HashSet::new();
    let mut handles = Vec::with_capacity(inputs.len());
    for input in inputs {
        let output = config.output_path(&input);
        if !claimed.insert(output.clone()) {
            let rejected = anyhow::anyhow!(
                "Output {:?} is already claimed by another input with the same file stem",
                output
            );
            handles.push((input, Err(rejected)));
            continue;
        }

        let gateway = Arc::clone(&gateway);
        let templates = Arc::clone(&templates);
        let permits = Arc::clone(&permits);
        let align = config.align.clone();
        let render = render.clone();
        let task_input = input.clone();

        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            process_transcript(&gateway, &templates, &task_input, &output, &align, &render).await
        });
        handles.push((input, Ok(handle)));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (input, handle) in handles {
        let result = match handle {
            Ok(handle) => handle
                .await
                .context("Transcript task panicked")
                .and_then(|r| r),
            Err(rejected) => Err(rejected),
        };
        if let Err(e) = &result {
            error!("{:?}: {:#}", input, e);
        }
        results.push((input, result));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GatewayConfig;
    use crate::llm::testing::ScriptedClassifier;
    use crate::models::Verdict;

    const INTERVIEW: &str = "translated_text,original_text,start,end\n\
                             What is your age?,อายุเท่าไหร่,1.0,2.5\n\
                             Thirty,สามสิบ,3.0,3.6\n";

    fn gateway() -> ClassifierGateway<ScriptedClassifier> {
        ClassifierGateway::new(
            ScriptedClassifier::new(&[
                ("What is your age?", Verdict::question()),
                ("Thirty", Verdict::answer()),
            ]),
            GatewayConfig::default(),
        )
    }

    #[test]
    fn test_output_path() {
        let config = BatchConfig {
            output_dir: PathBuf::from("/out"),
            format: TableFormat::Json,
            ..Default::default()
        };
        assert_eq!(
            config.output_path(Path::new("/data/interview_03.csv")),
            PathBuf::from("/out/interview_03_qa.json")
        );
    }

    #[tokio::test]
    async fn test_process_transcript_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("interview.csv");
        let output = dir.path().join("qa.csv");
        std::fs::write(&input, INTERVIEW).unwrap();

        let templates = TemplateSet::new(["What is your age?"]);
        let summary = process_transcript(
            &gateway(),
            &templates,
            &input,
            &output,
            &AlignConfig::default(),
            &RenderConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(summary.records, 1);
        let text = std::fs::read_to_string(&output).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "What is your age?,อายุเท่าไหร่,1.0,2.5,Thirty,สามสิบ,3.0,3.6"
        );
    }

    #[tokio::test]
    async fn test_missing_columns_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.csv");
        let output = dir.path().join("qa.csv");
        std::fs::write(&input, "text,start,end\nhello,0,1\n").unwrap();

        let templates = TemplateSet::new(["What is your age?"]);
        let result = process_transcript(
            &gateway(),
            &templates,
            &input,
            &output,
            &AlignConfig::default(),
            &RenderConfig::default(),
        )
        .await;

        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let good_a = dir.path().join("a.csv");
        let bad = dir.path().join("b.csv");
        let good_c = dir.path().join("c.csv");
        std::fs::write(&good_a, INTERVIEW).unwrap();
        std::fs::write(&bad, "nope\n").unwrap();
        std::fs::write(&good_c, INTERVIEW).unwrap();

        let config = BatchConfig {
            output_dir: out_dir.clone(),
            concurrency: 2,
            ..Default::default()
        };
        let results = execute_batch(
            Arc::new(gateway()),
            Arc::new(TemplateSet::new(["What is your age?"])),
            vec![good_a.clone(), bad.clone(), good_c.clone()],
            &config,
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, good_a);
        assert_eq!(results[0].1.as_ref().unwrap().records, 1);
        assert!(results[1].1.is_err());
        assert_eq!(results[2].1.as_ref().unwrap().records, 1);

        assert!(out_dir.join("a_qa.csv").exists());
        assert!(!out_dir.join("b_qa.csv").exists());
        assert!(out_dir.join("c_qa.csv").exists());
    }

    #[tokio::test]
    async fn test_batch_rejects_colliding_output_names() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        std::fs::create_dir(dir.path().join("x")).unwrap();
        std::fs::create_dir(dir.path().join("y")).unwrap();

        let first = dir.path().join("x").join("interview.csv");
        let second = dir.path().join("y").join("interview.csv");
        std::fs::write(&first, INTERVIEW).unwrap();
        std::fs::write(
            &second,
            "translated_text,original_text,start,end\n\
             Where were you born?,เกิดที่ไหน,0.0,1.0\n\
             Bangkok,กรุงเทพ,1.0,2.0\n",
        )
        .unwrap();

        let config = BatchConfig {
            output_dir: out_dir.clone(),
            ..Default::default()
        };
        let results = execute_batch(
            Arc::new(gateway()),
            Arc::new(TemplateSet::new(["What is your age?"])),
            vec![first.clone(), second.clone()],
            &config,
        )
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, first);
        assert_eq!(results[0].1.as_ref().unwrap().records, 1);
        assert_eq!(results[1].0, second);
        let err = results[1].1.as_ref().unwrap_err();
        assert!(err.to_string().contains("already claimed"));

        // The first transcript's table is intact
        let text = std::fs::read_to_string(out_dir.join("interview_qa.csv")).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("What is your age?"));
        assert!(!text.contains("Bangkok"));
    }
}
