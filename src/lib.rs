pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::database::AssessmentStore;
use crate::middleware::{auth, rate_limit};
use crate::services::{
    ai_service::QuestionGenerator, assessment_service::AssessmentService,
    attempt_service::AttemptService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub assessment_service: AssessmentService,
    pub attempt_service: AttemptService,
    pub generator_enabled: bool,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn AssessmentStore>,
        generator: Option<Arc<dyn QuestionGenerator>>,
    ) -> Self {
        let generator_enabled = generator.is_some();
        let assessment_service =
            AssessmentService::new(store.clone(), generator, config.max_generated_questions);
        let attempt_service = AttemptService::new(store);

        Self {
            config: Arc::new(config),
            assessment_service,
            attempt_service,
            generator_enabled,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let limiter = rate_limit::RateLimiter::new(state.config.api_rps);

    let instructor_api = Router::new()
        .route(
            "/api/assessments",
            post(routes::assessments::create_assessment).get(routes::assessments::list_assessments),
        )
        .route(
            "/api/assessments/:id",
            get(routes::assessments::get_assessment)
                .patch(routes::assessments::update_assessment)
                .delete(routes::assessments::delete_assessment),
        )
        .route(
            "/api/assessments/:id/publish",
            post(routes::assessments::publish_assessment),
        )
        .route(
            "/api/assessments/:id/unpublish",
            post(routes::assessments::unpublish_assessment),
        )
        .route(
            "/api/assessments/:id/type",
            post(routes::assessments::switch_type),
        )
        .route(
            "/api/assessments/:id/questions",
            post(routes::assessments::add_question),
        )
        .route(
            "/api/assessments/:id/questions/:index",
            delete(routes::assessments::remove_question),
        )
        .route(
            "/api/assessments/:id/reorder",
            post(routes::assessments::reorder),
        )
        .route(
            "/api/assessments/:id/generate",
            post(routes::assessments::generate_questions),
        )
        .route(
            "/api/assessments/:id/submissions",
            get(routes::attempts::list_submissions),
        )
        .route(
            "/api/submissions/:id/grade",
            post(routes::attempts::grade_attempt),
        )
        .route_layer(from_fn_with_state(state.clone(), auth::require_instructor));

    let student_api = Router::new()
        .route(
            "/api/assessments/:id/attempts",
            post(routes::attempts::start_attempt).get(routes::attempts::attempt_history),
        )
        .route(
            "/api/submissions/:id/answers",
            patch(routes::attempts::save_answers),
        )
        .route(
            "/api/submissions/:id/submit",
            post(routes::attempts::submit_attempt),
        )
        .route_layer(from_fn_with_state(state.clone(), auth::require_bearer_auth));

    let api = instructor_api
        .merge(student_api)
        .layer(from_fn_with_state(limiter, rate_limit::rps_middleware));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
}
