use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::header,
    response::IntoResponse,
};

use crate::{
    AppState,
    api::models::quiz::{ErrorResponse, QuizResponse, QuizUploadForm},
    errors::{Error, Result},
    metrics,
    notes::{self, Notes},
};

/// Generate a quiz from notes.
#[utoipa::path(
    post,
    path = "/api/generate-quiz",
    tag = "quiz",
    summary = "Generate quiz",
    description = "Generate multiple-choice questions from study notes.

Send either a `text` field with pasted notes or a `file` field with a plain-text (UTF-8) file. Text takes precedence when both are present.

When the model's answer cannot be used, the response holds a single placeholder question instead of failing.",
    request_body(content = QuizUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Generated (or placeholder) questions", body = QuizResponse),
        (status = 400, description = "Neither text nor file was provided", body = ErrorResponse),
        (status = 405, description = "Method other than POST", body = ErrorResponse),
        (status = 413, description = "Notes exceed the configured size limit", body = ErrorResponse),
        (status = 500, description = "Upload could not be parsed, or the upstream call failed", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn generate_quiz(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<QuizResponse>> {
    let notes = read_notes(multipart, state.config.limits.max_notes_bytes)
        .await
        .inspect_err(|e| metrics::record_notes_rejected(e.reason_label()))?;

    tracing::info!(
        notes_source = %notes.source,
        notes_bytes = notes.text.len(),
        "Generating quiz"
    );

    let outcome = match state.generator.generate(&notes.text).await {
        Ok(outcome) => outcome,
        Err(e) => {
            metrics::record_quiz_outcome("error");
            return Err(Error::QuizGeneration(e));
        }
    };

    metrics::record_quiz_outcome(outcome.label());
    tracing::info!(outcome = outcome.label(), "Quiz request complete");

    Ok(Json(QuizResponse {
        questions: outcome.into_questions(),
    }))
}

/// Every method other than POST on the quiz route.
pub async fn method_not_allowed() -> impl IntoResponse {
    ([(header::ALLOW, "POST")], Error::MethodNotAllowed)
}

async fn read_notes(multipart: std::result::Result<Multipart, MultipartRejection>, max_bytes: usize) -> Result<Notes> {
    let multipart = multipart.map_err(|rejection| Error::FileParsing {
        message: rejection.body_text(),
    })?;
    notes::extract_notes(multipart, max_bytes).await
}

#[cfg(test)]
mod tests {
    use crate::config::{OpenAiConfig, UpstreamConfig};
    use crate::quiz::fallback_questions;
    use crate::test_utils::{chat_completion, create_test_app, create_test_config, mount_completion};
    use axum::http::{StatusCode, header};
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::{Value, json};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/api/generate-quiz";

    fn valid_questions() -> Value {
        json!([
            {
                "question": "Which organelle produces ATP?",
                "options": ["Nucleus", "Mitochondria", "Ribosome", "Vacuole"],
                "correct": 1,
                "explanation": "Mitochondria carry out cellular respiration."
            },
            {
                "question": "What encloses the cell?",
                "options": ["Cell membrane", "Nucleolus", "Cytoplasm", "Centriole"],
                "correct": 0,
                "explanation": "The membrane separates the cell from its surroundings."
            }
        ])
    }

    async fn sent_prompt(upstream: &MockServer) -> String {
        let requests = upstream.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1, "exactly one upstream call");
        let body: Value = requests[0].body_json().unwrap();
        body["messages"][0]["content"].as_str().unwrap().to_string()
    }

    #[test_log::test(tokio::test)]
    async fn test_non_post_methods_rejected_without_upstream_call() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let server = create_test_app(create_test_config(&upstream)).await;

        for response in [server.get(ENDPOINT).await, server.put(ENDPOINT).await, server.delete(ENDPOINT).await] {
            response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
            response.assert_json(&json!({ "error": "Method not allowed" }));
            assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_notes_is_bad_request() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let server = create_test_app(create_test_config(&upstream)).await;

        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("title", "Biology"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No notes provided" }));

        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("text", "   \n").add_text("other", "ignored"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No notes provided" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_text_notes_sent_verbatim_in_single_user_message() {
        let upstream = MockServer::start().await;
        mount_completion(&upstream, &valid_questions().to_string()).await;

        let server = create_test_app(create_test_config(&upstream)).await;
        let notes = "Mitochondria are the powerhouse of the cell.\n  Ribosomes build proteins.";

        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("text", notes))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "questions": valid_questions() }));

        let requests = upstream.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = requests[0].body_json().unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"].as_f64().unwrap() as f32, 0.7);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");

        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains(notes));
        assert!(prompt.contains("Create 5 multiple-choice questions"));
    }

    #[test_log::test(tokio::test)]
    async fn test_unparseable_output_returns_fallback() {
        let upstream = MockServer::start().await;
        mount_completion(&upstream, "Sure! Here are some questions about cells: 1. ...").await;

        let server = create_test_app(create_test_config(&upstream)).await;

        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("text", "Cells"))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "questions": [{
                "id": 1,
                "question": "Failed to parse AI output",
                "options": ["A", "B", "C", "D"],
                "correct": 0,
                "explanation": "Check the notes format or API response"
            }]
        }));
    }

    #[test_log::test(tokio::test)]
    async fn test_extra_keys_and_any_id_returned_unchanged() {
        let upstream = MockServer::start().await;
        let output = json!([
            {
                "id": "q1",
                "question": "Which organelle produces ATP?",
                "options": ["Nucleus", "Mitochondria", "Ribosome", "Vacuole"],
                "correct": 1,
                "explanation": "Mitochondria carry out cellular respiration.",
                "topic": "biology"
            },
            {
                "id": 2.5,
                "question": "What encloses the cell?",
                "options": ["Cell membrane", "Nucleolus", "Cytoplasm", "Centriole"],
                "correct": 0,
                "explanation": "The membrane separates the cell from its surroundings.",
                "hints": ["outer layer"]
            }
        ]);
        mount_completion(&upstream, &output.to_string()).await;
        let server = create_test_app(create_test_config(&upstream)).await;

        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("text", "Cells"))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "questions": output }));
    }

    #[test_log::test(tokio::test)]
    async fn test_empty_array_and_invalid_answers_return_fallback() {
        let fallback = json!({ "questions": fallback_questions() });

        for output in [
            json!([]),
            json!([{
                "question": "q",
                "options": ["a", "b", "c", "d"],
                "correct": 4,
                "explanation": "e"
            }]),
            json!([{
                "question": "q",
                "options": ["a", "b"],
                "correct": 0,
                "explanation": "e"
            }]),
        ] {
            let upstream = MockServer::start().await;
            mount_completion(&upstream, &output.to_string()).await;
            let server = create_test_app(create_test_config(&upstream)).await;

            let response = server
                .post(ENDPOINT)
                .multipart(MultipartForm::new().add_text("text", "Cells"))
                .await;
            response.assert_status_ok();
            response.assert_json(&fallback);
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_validation_disabled_passes_output_through() {
        let upstream = MockServer::start().await;
        let output = json!([{
            "question": "q",
            "options": ["a", "b"],
            "correct": 1,
            "explanation": "e"
        }]);
        mount_completion(&upstream, &output.to_string()).await;

        let mut config = create_test_config(&upstream);
        config.quiz.validate_questions = false;
        let server = create_test_app(config).await;

        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("text", "Cells"))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "questions": output }));
    }

    #[test_log::test(tokio::test)]
    async fn test_upstream_failure_is_generic_500_and_service_keeps_serving() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal secret detail"))
            .expect(1)
            .mount(&upstream)
            .await;

        let server = create_test_app(create_test_config(&upstream)).await;

        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("text", "Cells"))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Failed to generate quiz" }));
        assert!(!response.text().contains("secret"));

        server.get("/healthz").await.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_unreachable_upstream_is_generic_500() {
        let mut config = create_test_config(&MockServer::start().await);
        config.upstream = UpstreamConfig::OpenAi(OpenAiConfig {
            base_url: "http://127.0.0.1:9/v1".parse().unwrap(),
            api_key: None,
            timeout: Some(Duration::from_secs(5)),
        });

        let server = create_test_app(config).await;
        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("text", "Cells"))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Failed to generate quiz" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_text_takes_precedence_over_file() {
        let upstream = MockServer::start().await;
        mount_completion(&upstream, &valid_questions().to_string()).await;
        let server = create_test_app(create_test_config(&upstream)).await;

        // File first in the body, text second
        let form = MultipartForm::new()
            .add_part(
                "file",
                Part::bytes(b"FILE CONTENTS".to_vec())
                    .file_name("notes.txt")
                    .mime_type("text/plain"),
            )
            .add_text("text", "PASTED CONTENTS");

        server.post(ENDPOINT).multipart(form).await.assert_status_ok();

        let prompt = sent_prompt(&upstream).await;
        assert!(prompt.contains("PASTED CONTENTS"));
        assert!(!prompt.contains("FILE CONTENTS"));
    }

    #[test_log::test(tokio::test)]
    async fn test_file_notes_used_when_no_text() {
        let upstream = MockServer::start().await;
        mount_completion(&upstream, &valid_questions().to_string()).await;
        let server = create_test_app(create_test_config(&upstream)).await;

        let contents = "Photosynthesis converts light into chemical energy.\n";
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(contents.as_bytes().to_vec())
                .file_name("biology.md")
                .mime_type("text/markdown"),
        );

        let response = server.post(ENDPOINT).multipart(form).await;
        response.assert_status_ok();
        response.assert_json(&json!({ "questions": valid_questions() }));

        assert!(sent_prompt(&upstream).await.contains(contents));
    }

    #[test_log::test(tokio::test)]
    async fn test_blank_text_falls_back_to_file() {
        let upstream = MockServer::start().await;
        mount_completion(&upstream, &valid_questions().to_string()).await;
        let server = create_test_app(create_test_config(&upstream)).await;

        let form = MultipartForm::new().add_text("text", "  ").add_part(
            "file",
            Part::bytes(b"Notes from the file".to_vec()).file_name("notes.txt"),
        );

        server.post(ENDPOINT).multipart(form).await.assert_status_ok();
        assert!(sent_prompt(&upstream).await.contains("Notes from the file"));
    }

    #[test_log::test(tokio::test)]
    async fn test_oversized_notes_rejected_without_upstream_call() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let mut config = create_test_config(&upstream);
        config.limits.max_notes_bytes = 64;
        let server = create_test_app(config).await;

        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("text", "x".repeat(65)))
            .await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        response.assert_json(&json!({ "error": "Notes exceed the maximum size of 64 bytes" }));

        let response = server
            .post(ENDPOINT)
            .multipart(
                MultipartForm::new().add_part("file", Part::bytes(vec![b'y'; 1000]).file_name("big.txt")),
            )
            .await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test_log::test(tokio::test)]
    async fn test_text_wins_over_oversized_file() {
        let upstream = MockServer::start().await;
        mount_completion(&upstream, &valid_questions().to_string()).await;

        let mut config = create_test_config(&upstream);
        config.limits.max_notes_bytes = 64;
        let server = create_test_app(config).await;

        let form = MultipartForm::new()
            .add_part("file", Part::bytes(vec![b'y'; 100]).file_name("big.txt"))
            .add_text("text", "PASTED");

        let response = server.post(ENDPOINT).multipart(form).await;
        response.assert_status_ok();
        response.assert_json(&json!({ "questions": valid_questions() }));

        let prompt = sent_prompt(&upstream).await;
        assert!(prompt.contains("PASTED"));
        assert!(!prompt.contains("yyyy"));
    }

    #[test_log::test(tokio::test)]
    async fn test_non_multipart_body_is_file_parsing_error() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;
        let server = create_test_app(create_test_config(&upstream)).await;

        let response = server.post(ENDPOINT).json(&json!({ "text": "Cells" })).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "File parsing error" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_non_utf8_file_is_file_parsing_error() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;
        let server = create_test_app(create_test_config(&upstream)).await;

        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(vec![0xff, 0xfe, 0xfd, 0x00]).file_name("notes.bin"),
        );

        let response = server.post(ENDPOINT).multipart(form).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "File parsing error" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_content_in_upstream_answer_returns_fallback() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "created": 1_700_000_000,
                "model": "gpt-4o-mini",
                "choices": []
            })))
            .mount(&upstream)
            .await;
        let server = create_test_app(create_test_config(&upstream)).await;

        let response = server
            .post(ENDPOINT)
            .multipart(MultipartForm::new().add_text("text", "Cells"))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "questions": fallback_questions() }));
    }

    #[test]
    fn test_chat_completion_helper_shape() {
        let body = chat_completion("[]");
        assert_eq!(body["choices"][0]["message"]["content"], "[]");
    }
}
