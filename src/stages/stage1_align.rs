use serde::Serialize;
use tracing::{debug, info, warn};

use crate::llm::{Classifier, ClassifierGateway, ClassifyRequest};
use crate::models::{
    AnswerFields, QaRecord, QuestionSlot, TemplateSet, Transcript, Utterance, Verdict, assemble,
};

/// Configuration for Stage 1
#[derive(Debug, Clone)]
pub struct AlignConfig {
    /// Treat blank translated utterances as "neither" without calling the classifier
    pub skip_blank_utterances: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            skip_blank_utterances: true,
        }
    }
}

/// Counters collected over one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentStats {
    pub utterances: usize,
    pub classifier_calls: usize,
    /// Utterances whose classification exhausted the retry budget
    pub classifier_failures: usize,
    pub questions_detected: usize,
    /// Pending questions overwritten before being answered
    pub questions_replaced: usize,
    /// Answer-only verdicts (an utterance flagged as both counts as a question)
    pub answers_detected: usize,
    /// Answers that arrived with no pending question
    pub orphan_answers: usize,
    pub records_emitted: usize,
    /// Emitted records whose answer starts before the question ends
    pub out_of_order_records: usize,
    pub trailing_question_dropped: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum AlignmentState {
    #[default]
    Idle,
    AwaitingAnswer(QuestionSlot),
}

/// Pairs questions with answers over one transcript.
///
/// One instance per transcript; holds at most one pending question.
#[derive(Debug, Default)]
pub struct AlignmentMachine {
    state: AlignmentState,
    stats: AlignmentStats,
}

impl AlignmentMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AlignmentState {
        &self.state
    }

    pub fn pending_question(&self) -> Option<&QuestionSlot> {
        match &self.state {
            AlignmentState::Idle => None,
            AlignmentState::AwaitingAnswer(slot) => Some(slot),
        }
    }

    pub fn stats(&self) -> &AlignmentStats {
        &self.stats
    }

    /// Classify one utterance through the gateway and apply the verdict
    pub async fn process<C: Classifier>(
        &mut self,
        gateway: &ClassifierGateway<C>,
        templates: &TemplateSet,
        utterance: &Utterance,
        config: &AlignConfig,
    ) -> Option<QaRecord> {
        let verdict = if config.skip_blank_utterances && utterance.is_blank() {
            Some(Verdict::NEITHER)
        } else {
            self.stats.classifier_calls += 1;
            let request = ClassifyRequest {
                utterance: &utterance.translated,
                templates,
                pending_question: self.pending_question().map(|slot| slot.translated.as_str()),
            };
            gateway.verdict(&request).await
        };

        self.apply(utterance, verdict)
    }

    /// Advance the state machine. `None` means the classifier gave no verdict.
    ///
    /// Question detection takes precedence over answer detection.
    pub fn apply(&mut self, utterance: &Utterance, verdict: Option<Verdict>) -> Option<QaRecord> {
        self.stats.utterances += 1;

        let verdict = verdict.unwrap_or_else(|| {
            warn!(
                "Utterance {}: no classifier verdict, treating as neither",
                utterance.index
            );
            self.stats.classifier_failures += 1;
            Verdict::NEITHER
        });

        if verdict.is_question {
            self.stats.questions_detected += 1;
            if let AlignmentState::AwaitingAnswer(previous) = &self.state {
                debug!(
                    "Utterance {}: question replaces unanswered question from utterance {}",
                    utterance.index, previous.index
                );
                self.stats.questions_replaced += 1;
            }
            self.state = AlignmentState::AwaitingAnswer(QuestionSlot::from_utterance(utterance));
            return None;
        }

        if !verdict.is_answer {
            return None;
        }

        self.stats.answers_detected += 1;
        match std::mem::take(&mut self.state) {
            AlignmentState::AwaitingAnswer(slot) => {
                debug!(
                    "Utterance {}: answers question from utterance {}",
                    utterance.index, slot.index
                );
                let record = assemble(slot, AnswerFields::from_utterance(utterance));
                if !record.is_temporally_ordered() {
                    debug!("Utterance {}: answer precedes its question in time", utterance.index);
                    self.stats.out_of_order_records += 1;
                }
                self.stats.records_emitted += 1;
                Some(record)
            }
            AlignmentState::Idle => {
                debug!("Utterance {}: answer with no pending question, discarded", utterance.index);
                self.stats.orphan_answers += 1;
                None
            }
        }
    }

    /// End the pass, dropping any unanswered question
    pub fn finish(mut self) -> AlignmentStats {
        if let AlignmentState::AwaitingAnswer(slot) = &self.state {
            debug!("Dropping unanswered trailing question from utterance {}", slot.index);
            self.stats.trailing_question_dropped = true;
        }
        self.stats
    }
}

/// Result of Stage 1 processing
#[derive(Debug)]
pub struct AlignmentResult {
    /// Records in emission order
    pub records: Vec<QaRecord>,
    pub stats: AlignmentStats,
}

/// Execute Stage 1: classify and align.
///
/// Single forward pass in file order. Each classification completes before
/// the next utterance is looked at, since the pending question is part of
/// the classifier's context.
pub async fn execute_alignment<C: Classifier>(
    gateway: &ClassifierGateway<C>,
    transcript: &Transcript,
    templates: &TemplateSet,
    config: &AlignConfig,
) -> AlignmentResult {
    info!(
        "Stage 1: Aligning {} utterances against {} template questions",
        transcript.len(),
        templates.len()
    );

    let mut machine = AlignmentMachine::new();
    let mut records = Vec::new();

    for utterance in &transcript.utterances {
        if let Some(record) = machine.process(gateway, templates, utterance, config).await {
            records.push(record);
        }
    }

    let stats = machine.finish();
    info!(
        "Stage 1: {} records from {} questions and {} answers ({} classifier failures)",
        stats.records_emitted,
        stats.questions_detected,
        stats.answers_detected,
        stats.classifier_failures
    );

    AlignmentResult { records, stats }
}
