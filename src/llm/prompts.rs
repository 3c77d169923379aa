use crate::models::TemplateSet;

/// Name of the forced tool the classifier must call
pub const CLASSIFY_TOOL_NAME: &str = "classify_utterance";

/// Stand-in for the pending question when none is held
pub const NO_PENDING_QUESTION: &str = "None";

/// System prompt for per-utterance classification
pub const SYSTEM_PROMPT: &str = r#"You are labelling utterances from a translated interview transcript, one utterance at a time.

For each utterance decide two things:

1. is_question: the utterance is a question asked by the interviewer that resembles one of the listed template questions. Wording may differ; the intent must match.
2. is_answer: the utterance is a reply to the previously asked question shown to you. If no previous question is given, this is always false.

RULES:
- Short acknowledgements ("okay", "yes", "mm") are answers only if they actually reply to the previous question.
- Follow-up questions that do not match any template are NOT questions for this task.
- Report your decision only through the classify_utterance tool."#;

/// Build the user prompt for a single utterance
pub fn build_classify_prompt(
    utterance: &str,
    templates: &TemplateSet,
    pending_question: Option<&str>,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("## Template Questions\n");
    prompt.push_str(&templates.block());
    prompt.push_str("\n\n");

    prompt.push_str("## Previous Question\n");
    prompt.push_str(pending_question.unwrap_or(NO_PENDING_QUESTION));
    prompt.push_str("\n\n");

    prompt.push_str("## Utterance\n");
    prompt.push_str(utterance);
    prompt.push('\n');

    prompt
}

/// Input schema of the classification tool
pub fn classify_tool_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "is_question": {
                "type": "boolean",
                "description": "True if the utterance is a question resembling one of the template questions"
            },
            "is_answer": {
                "type": "boolean",
                "description": "True if the utterance answers the previous question"
            }
        },
        "required": ["is_question", "is_answer"]
    })
}
