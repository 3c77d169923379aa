use serde::{Deserialize, Serialize};

/// The fixed, ordered set of canonical interview questions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSet {
    questions: Vec<String>,
}

impl TemplateSet {
    /// Build from raw strings, trimming and dropping empties
    pub fn new<I, S>(questions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let questions = questions
            .into_iter()
            .map(Into::into)
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        Self { questions }
    }

    /// Parse the line-oriented format: one question per line, `#` comments skipped
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Newline-joined block handed to the classifier
    pub fn block(&self) -> String {
        self.questions.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lines_skips_comments_and_blanks() {
        let text = "# header\nWhat is your age?\n\n  Where do you live?  \n";
        let set = TemplateSet::from_lines(text);
        assert_eq!(set.len(), 2);
        assert_eq!(set.block(), "What is your age?\nWhere do you live?");
    }

    #[test]
    fn test_json_is_a_plain_array() {
        let set: TemplateSet = serde_json::from_str(r#"["A?", "B?"]"#).unwrap();
        assert_eq!(set.questions(), &["A?".to_string(), "B?".to_string()]);
    }
}
