use serde::{Deserialize, Serialize};

/// Per-utterance classifier output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Utterance resembles one of the template questions
    pub is_question: bool,
    /// Utterance answers the pending question
    pub is_answer: bool,
}

impl Verdict {
    pub const NEITHER: Verdict = Verdict {
        is_question: false,
        is_answer: false,
    };

    pub fn question() -> Self {
        Self {
            is_question: true,
            is_answer: false,
        }
    }

    pub fn answer() -> Self {
        Self {
            is_question: false,
            is_answer: true,
        }
    }

    pub fn both() -> Self {
        Self {
            is_question: true,
            is_answer: true,
        }
    }
}
