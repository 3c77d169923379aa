use anyhow::Result;
use tracing::warn;

use crate::models::{TemplateSet, Verdict};

/// Context handed to the classifier for one utterance
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRequest<'a> {
    /// Translated text of the utterance
    pub utterance: &'a str,
    pub templates: &'a TemplateSet,
    /// Translated text of the pending question, if any
    pub pending_question: Option<&'a str>,
}

/// A backend that labels one utterance
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Verdict>;
}

/// Configuration for the classifier gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Total attempts per utterance before giving up
    pub max_attempts: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Bounded-retry boundary around a classifier.
///
/// Never fails: an exhausted retry budget yields `None`, which callers
/// treat as "neither question nor answer".
pub struct ClassifierGateway<C> {
    classifier: C,
    config: GatewayConfig,
}

impl<C: Classifier> ClassifierGateway<C> {
    pub fn new(classifier: C, config: GatewayConfig) -> Self {
        Self { classifier, config }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub async fn verdict(&self, request: &ClassifyRequest<'_>) -> Option<Verdict> {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.classifier.classify(request).await {
                Ok(verdict) => return Some(verdict),
                Err(e) => {
                    warn!("Classifier attempt {} of {} failed: {:#}", attempt, attempts, e);
                }
            }
        }

        None
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Deterministic classifier keyed on utterance text; unknown text is "neither".
    ///
    /// Records the pending question it was shown on every call, including
    /// calls that fail.
    #[derive(Default)]
    pub struct ScriptedClassifier {
        verdicts: HashMap<String, Verdict>,
        failing: HashSet<String>,
        pub seen_pending: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedClassifier {
        pub fn new(script: &[(&str, Verdict)]) -> Self {
            Self {
                verdicts: script
                    .iter()
                    .map(|(text, verdict)| (text.to_string(), *verdict))
                    .collect(),
                failing: HashSet::new(),
                seen_pending: Mutex::new(Vec::new()),
            }
        }

        /// Fail every call for these utterances
        pub fn failing_on(mut self, texts: &[&str]) -> Self {
            self.failing.extend(texts.iter().map(|t| t.to_string()));
            self
        }

        pub fn calls(&self) -> usize {
            self.seen_pending.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Verdict> {
            self.seen_pending
                .lock()
                .unwrap()
                .push(request.pending_question.map(str::to_string));
            if self.failing.contains(request.utterance) {
                anyhow::bail!("transport error");
            }
            Ok(self
                .verdicts
                .get(request.utterance)
                .copied()
                .unwrap_or(Verdict::NEITHER))
        }
    }

    /// Fails a fixed number of times, then answers with a fixed verdict
    pub struct FlakyClassifier {
        pub failures: u32,
        pub verdict: Verdict,
        pub calls: AtomicU32,
    }

    impl FlakyClassifier {
        pub fn new(failures: u32, verdict: Verdict) -> Self {
            Self {
                failures,
                verdict,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Classifier for FlakyClassifier {
        async fn classify(&self, _request: &ClassifyRequest<'_>) -> Result<Verdict> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                anyhow::bail!("malformed tool response");
            }
            Ok(self.verdict)
        }
    }
}
