/// Instruction template for the key-point summary
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    language: String,
    max_points: usize,
}

impl PromptTemplate {
    pub fn new(language: &str, max_points: usize) -> Self {
        Self {
            language: language.to_string(),
            max_points: max_points.max(1),
        }
    }

    /// System instruction carrying the article itself
    pub fn system(&self, title: &str, content: &str) -> String {
        let language = &self.language;
        let max_points = self.max_points;

        format!(
            "Carry out the following steps one at a time.\n\
[P1] Translate the title into {language}.\n\
[P2] Find the important information in the article.\n\
[P3] Classify the important information into key points.\n\
[P4] Condense the key points to at most {max_points}.\n\
[P5] Arrange the key points as a bulleted list.\n\
[P6] Output the result of [P5] and the title translated in [P1] as JSON (format: {{\"points\": [...], \"title\": \"...\"}})\n\n\
[Title]:{title}\n[Content]:{content}\nlang: {language}"
        )
    }

    /// User instruction restricting the reply to the JSON object
    pub fn user(&self) -> String {
        format!(
            "Do not output anything other than the result of [P6].\nlang: {}",
            self.language
        )
    }
}
