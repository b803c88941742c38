pub mod ai_service;
pub mod assessment_service;
pub mod attempt_service;
pub mod grading_service;
pub mod publish_guard;
pub mod retake;
