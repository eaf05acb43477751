//! Instruction prompt sent upstream.

/// Build the quiz instruction prompt.
///
/// The notes are appended verbatim after the `Notes:` line.
pub fn build_prompt(notes: &str, question_count: usize) -> String {
    format!(
        r#"
You are an AI that creates quizzes.

Create {question_count} multiple-choice questions from the following notes.
Return the result as a JSON array with this structure:

[
  {{
    "question": "Your question here",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correct": 0, // index of the correct answer (0-3)
    "explanation": "Why this answer is correct"
  }}
]

Notes:
{notes}
"#
    )
}
