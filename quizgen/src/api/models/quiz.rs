use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// A single multiple-choice question.
///
/// Keys beyond the documented ones are carried in `extra` and echoed back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuizQuestion {
    /// Optional identifier of any JSON type, echoed when the model supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub id: Option<Value>,
    pub question: String,
    /// Answer options, four by convention
    pub options: Vec<String>,
    /// Index into `options` of the correct answer
    pub correct: usize,
    /// Why the correct answer is correct
    pub explanation: String,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

impl QuizQuestion {
    pub const OPTION_COUNT: usize = 4;

    /// Check the conventions the prompt asks the model to follow.
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        if self.options.len() != Self::OPTION_COUNT {
            return Err(format!(
                "expected {} options, got {}",
                Self::OPTION_COUNT,
                self.options.len()
            ));
        }
        if self.correct >= self.options.len() {
            return Err(format!("correct index {} is out of range", self.correct));
        }
        Ok(())
    }
}

/// Response body of a successful (or fallback) quiz generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
}

/// Error body returned by every failure response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "No notes provided")]
    pub error: String,
}

/// Multipart form accepted by the quiz endpoint (documentation only).
///
/// `text` takes precedence over `file` when both are present.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct QuizUploadForm {
    /// Pasted notes
    pub text: Option<String>,
    /// Plain-text notes file (UTF-8)
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<Vec<u8>>,
}
