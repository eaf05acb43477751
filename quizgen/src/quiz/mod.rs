//! Quiz generation: prompt, upstream call and best-effort parsing of the answer.
//!
//! [`QuizGenerator::generate`] returns an explicit outcome instead of relying on error control
//! flow:
//!
//! - `Ok(QuizOutcome::Generated(_))` - the model answered with a usable question array
//! - `Ok(QuizOutcome::Fallback(_))` - the model answered, but not with something usable; callers
//!   still get a well-formed list holding the canned [`fallback_questions`]
//! - `Err(UpstreamError)` - the upstream call itself failed

use std::{fmt, sync::Arc, time::Instant};

use crate::api::models::quiz::QuizQuestion;
use crate::config::QuizConfig;
use crate::metrics;
use crate::upstream::{CompletionProvider, CompletionRequest, UpstreamError};

pub mod prompt;

/// Why model output was replaced by the fallback question.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseFailure {
    #[error("output is not a JSON question array: {0}")]
    InvalidJson(String),
    #[error("output contains no questions")]
    Empty,
    #[error("question {index} is invalid: {reason}")]
    InvalidQuestion { index: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuizOutcome {
    Generated(Vec<QuizQuestion>),
    Fallback(ParseFailure),
}

impl QuizOutcome {
    /// Questions to return to the caller; never empty.
    pub fn into_questions(self) -> Vec<QuizQuestion> {
        match self {
            QuizOutcome::Generated(questions) => questions,
            QuizOutcome::Fallback(_) => fallback_questions(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuizOutcome::Generated(_) => "generated",
            QuizOutcome::Fallback(_) => "fallback",
        }
    }
}

impl fmt::Display for QuizOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizOutcome::Generated(questions) => write!(f, "generated {} questions", questions.len()),
            QuizOutcome::Fallback(reason) => write!(f, "fallback ({reason})"),
        }
    }
}

/// The canned single-question list returned when model output cannot be used.
pub fn fallback_questions() -> Vec<QuizQuestion> {
    vec![QuizQuestion {
        id: Some(1.into()),
        question: "Failed to parse AI output".to_string(),
        options: ["A", "B", "C", "D"].map(String::from).to_vec(),
        correct: 0,
        explanation: "Check the notes format or API response".to_string(),
        extra: Default::default(),
    }]
}

/// Strictly parse raw model output as a question array.
///
/// With `validate` set, every question must also pass [`QuizQuestion::validate`].
pub fn parse_questions(raw: &str, validate: bool) -> QuizOutcome {
    let questions: Vec<QuizQuestion> = match serde_json::from_str(raw) {
        Ok(questions) => questions,
        Err(e) => return QuizOutcome::Fallback(ParseFailure::InvalidJson(e.to_string())),
    };

    if questions.is_empty() {
        return QuizOutcome::Fallback(ParseFailure::Empty);
    }

    if validate {
        for (index, question) in questions.iter().enumerate() {
            if let Err(reason) = question.validate() {
                return QuizOutcome::Fallback(ParseFailure::InvalidQuestion { index, reason });
            }
        }
    }

    QuizOutcome::Generated(questions)
}

/// Turns notes into quiz questions through a [`CompletionProvider`].
pub struct QuizGenerator {
    provider: Arc<dyn CompletionProvider>,
    settings: QuizConfig,
}

impl QuizGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: QuizConfig) -> Self {
        Self { provider, settings }
    }

    /// Generate a quiz from notes with exactly one upstream call.
    #[tracing::instrument(skip_all, fields(model = %self.settings.model, notes_bytes = notes.len()))]
    pub async fn generate(&self, notes: &str) -> Result<QuizOutcome, UpstreamError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            prompt: prompt::build_prompt(notes, self.settings.question_count),
            temperature: self.settings.temperature,
        };

        let started = Instant::now();
        let completion = self.provider.complete(&request).await;
        metrics::record_upstream_duration(started.elapsed().as_secs_f64());

        let raw = completion?.content.unwrap_or_default();
        let outcome = parse_questions(&raw, self.settings.validate_questions);

        match &outcome {
            QuizOutcome::Generated(questions) => {
                tracing::info!(question_count = questions.len(), "Quiz generated");
            }
            QuizOutcome::Fallback(reason) => {
                tracing::warn!(%reason, "Model output unusable, returning fallback question");
                tracing::debug!(raw_output = %raw, "Discarded model output");
            }
        }

        Ok(outcome)
    }
}
