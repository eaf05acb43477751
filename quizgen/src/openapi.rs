//! OpenAPI documentation for the quiz API, served at `/api-docs/openapi.json` and rendered at
//! `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    paths(api::handlers::quiz::generate_quiz),
    components(schemas(
        api::models::quiz::QuizQuestion,
        api::models::quiz::QuizResponse,
        api::models::quiz::ErrorResponse,
        api::models::quiz::QuizUploadForm,
    )),
    tags(
        (name = "quiz", description = "Generate multiple-choice quizzes from study notes"),
    ),
    info(
        title = "quizgen",
        description = "Turns study notes into multiple-choice quizzes using an OpenAI-compatible chat completion API.",
    )
)]
pub struct ApiDoc;
