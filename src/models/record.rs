use serde::{Deserialize, Serialize};

use super::Utterance;

/// The single pending (unanswered) question held during a pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSlot {
    /// Index of the utterance the question came from
    pub index: usize,
    pub translated: String,
    pub original: String,
    pub start: f64,
    pub end: f64,
}

impl QuestionSlot {
    pub fn from_utterance(utterance: &Utterance) -> Self {
        Self {
            index: utterance.index,
            translated: utterance.translated.clone(),
            original: utterance.original_text().to_string(),
            start: utterance.start,
            end: utterance.end,
        }
    }
}

/// Answer-side fields merged into a slot to finalize a record
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFields {
    pub index: usize,
    pub translated: String,
    pub original: String,
    pub start: f64,
    pub end: f64,
}

impl AnswerFields {
    pub fn from_utterance(utterance: &Utterance) -> Self {
        Self {
            index: utterance.index,
            translated: utterance.translated.clone(),
            original: utterance.original_text().to_string(),
            start: utterance.start,
            end: utterance.end,
        }
    }
}

/// A finalized question/answer row.
///
/// Field names are the output table's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub translated_question: String,
    pub original_question: String,
    pub question_start: f64,
    pub question_end: f64,
    pub translated_answer: String,
    pub original_answer: String,
    pub answer_start: f64,
    pub answer_end: f64,
    /// Index of the answering utterance; not part of the output table
    #[serde(skip)]
    pub answer_index: usize,
}

impl QaRecord {
    /// Whether question precedes answer in time. Classifier misfires can break this.
    pub fn is_temporally_ordered(&self) -> bool {
        self.question_start <= self.question_end && self.question_end <= self.answer_start
    }
}

/// Pair a pending question with its answer
pub fn assemble(slot: QuestionSlot, answer: AnswerFields) -> QaRecord {
    QaRecord {
        translated_question: slot.translated,
        original_question: slot.original,
        question_start: slot.start,
        question_end: slot.end,
        translated_answer: answer.translated,
        original_answer: answer.original,
        answer_start: answer.start,
        answer_end: answer.end,
        answer_index: answer.index,
    }
}
