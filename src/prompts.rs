//! Prompts for webpage quality evaluation.
//!
//! Every piece of prompt text lives here so that changing the instructions
//! never touches transport or recovery code, and so tests can inspect the
//! exact string a model receives.
//!
//! Callers can override the system instruction via
//! [`crate::config::EvaluatorConfig::system_prompt`]; the user instruction is
//! fixed and always carries the page text and the schema.

use serde_json::Value;

/// Default system instruction.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an intelligent website quality processing model trained to analyse \
the website data and generate quality score and suggestions for improvement based on multiple criteria.";

/// User instruction. `{text}` and `{schema}` are substituted by [`build_prompt`].
pub const USER_PROMPT_TEMPLATE: &str = r#"extract relevant fields from the provided website text.
input:
    website text: {text}
output:
    JSON object strictly following the schema: {schema}

instructions:
- follow the schema exactly.
- if any field is missing, assign null.
- use only actual text information; mark fields as null if missing."#;

// Llama 3 chat-template delimiters.
const BEGIN_OF_TEXT: &str = "<|begin_of_text|>";
const START_HEADER: &str = "<|start_header_id|>";
const END_HEADER: &str = "<|end_header_id|>";
const END_OF_TURN: &str = "<|eot_id|>";

/// A prompt split into its role sections.
///
/// Chat providers receive the sections as separate messages; raw completion
/// endpoints receive [`Prompt::render_llama3`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Render the prompt with Llama 3 role delimiters, leaving the assistant
    /// turn open for the model to complete.
    pub fn render_llama3(&self) -> String {
        let mut out = String::with_capacity(self.system.len() + self.user.len() + 160);
        out.push_str(BEGIN_OF_TEXT);
        push_turn(&mut out, "system", &self.system);
        push_turn(&mut out, "user", &self.user);
        out.push_str(START_HEADER);
        out.push_str("assistant");
        out.push_str(END_HEADER);
        out.push_str("\n\n");
        out
    }
}

fn push_turn(out: &mut String, role: &str, content: &str) {
    out.push_str(START_HEADER);
    out.push_str(role);
    out.push_str(END_HEADER);
    out.push_str("\n\n");
    out.push_str(content);
    out.push_str(END_OF_TURN);
}

/// Build the evaluation prompt for `text` against `schema`.
///
/// The schema is serialised compactly, in its original key order, and
/// inserted verbatim; it is never checked against anything.
pub fn build_prompt(system_prompt: Option<&str>, text: &str, schema: &Value) -> Prompt {
    let schema = schema.to_string();
    // Substitute the schema first so a `{text}` inside the page text is left alone.
    let user = USER_PROMPT_TEMPLATE
        .replace("{schema}", &schema)
        .replacen("{text}", text, 1);
    Prompt {
        system: system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string(),
        user,
    }
}
