use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{DomainError, Result, ValidationIssue};
use crate::models::assessment::AssessmentType;
use crate::models::question::{Question, QuestionDraft, QuestionType};

/// Source of question content. Whatever comes back is untrusted and goes
/// through [`revalidate`] before it touches an assessment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(
        &self,
        topic: &str,
        count: usize,
        allowed_types: &[QuestionType],
    ) -> Result<Vec<JsonValue>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedQuestion {
    pub position: usize,
    pub reason: DomainError,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub accepted: Vec<Question>,
    pub rejected: Vec<RejectedQuestion>,
}

/// Turns raw generator output into questions the assessment type accepts.
/// At most `limit` entries are accepted; the rest are dropped silently.
pub fn revalidate(
    raw: Vec<JsonValue>,
    assessment_type: AssessmentType,
    limit: usize,
) -> GenerationOutcome {
    let policy = assessment_type.policy();
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for (position, value) in raw.into_iter().enumerate() {
        if accepted.len() >= limit {
            break;
        }
        let path = format!("generated[{position}]");
        let question = coerce_draft(value)
            .map_err(|reason| DomainError::validation(path.clone(), ValidationIssue::Malformed { reason }))
            .and_then(|draft| {
                Question::new(draft).map_err(|err| match err {
                    DomainError::Validation { issue, .. } => DomainError::validation(path.clone(), issue),
                    other => other,
                })
            })
            .and_then(|q| {
                if policy.allows(q.question_type) {
                    Ok(q)
                } else {
                    Err(DomainError::validation(
                        path.clone(),
                        ValidationIssue::QuestionTypeNotAllowed {
                            question_type: q.question_type,
                            assessment_type,
                        },
                    ))
                }
            });

        match question {
            Ok(q) => accepted.push(q),
            Err(reason) => {
                tracing::debug!(position, ?reason, "generated question rejected");
                rejected.push(RejectedQuestion { position, reason });
            }
        }
    }

    GenerationOutcome { accepted, rejected }
}

// Model output drifts from the schema: `question` instead of
// `question_text`, integer answer indices, numeric options.
fn coerce_draft(mut value: JsonValue) -> std::result::Result<QuestionDraft, String> {
    let obj = value
        .as_object_mut()
        .ok_or_else(|| "entry is not an object".to_string())?;

    if !obj.contains_key("question_text") {
        if let Some(text) = obj.remove("question") {
            obj.insert("question_text".to_string(), text);
        }
    }

    let answer = match obj.get("correct_answer") {
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        Some(JsonValue::Bool(b)) => Some(if *b { "True" } else { "False" }.to_string()),
        _ => None,
    };
    if let Some(answer) = answer {
        obj.insert("correct_answer".to_string(), JsonValue::String(answer));
    }

    if let Some(JsonValue::Array(options)) = obj.get_mut("options") {
        for opt in options.iter_mut() {
            if !opt.is_string() {
                *opt = JsonValue::String(opt.to_string());
            }
        }
    }

    if obj.get("type").and_then(|t| t.as_str()) == Some("true_false")
        && obj.get("options").map_or(true, |o| o.is_null())
    {
        obj.insert(
            "options".to_string(),
            serde_json::json!(["True", "False"]),
        );
    }

    serde_json::from_value(value).map_err(|e| e.to_string())
}

#[derive(Clone)]
pub struct OpenAiQuestionGenerator {
    client: Client,
    api_key: String,
}

impl OpenAiQuestionGenerator {
    pub fn new(api_key: String, client: Client) -> Self {
        Self { client, api_key }
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<JsonValue> {
        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("OpenAI API Error {}: {}", status, text).into());
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response format").into())
    }
}

#[async_trait]
impl QuestionGenerator for OpenAiQuestionGenerator {
    async fn generate(
        &self,
        topic: &str,
        count: usize,
        allowed_types: &[QuestionType],
    ) -> Result<Vec<JsonValue>> {
        let system_prompt = r#"You write assessment questions for online courses.
Return a JSON object with a 'questions' array.

Rules:
1. Generate exactly the requested number of questions.
2. Only use the question types listed in 'allowed_types'.
3. multiple_choice questions have 4 options; correct_answer is the index of the right option.
4. Vary the position of the correct option.
5. true_false questions use options ["True", "False"] and correct_answer "True" or "False".
6. short_answer and essay questions have no options; correct_answer is a model answer.
"#;

        let types: Vec<&str> = allowed_types.iter().map(|t| t.as_str()).collect();
        let user_schema = serde_json::json!({
            "topic": topic,
            "required_count": count,
            "allowed_types": types,
            "schema_example": {
                "questions": [
                    {
                        "type": "multiple_choice",
                        "question_text": "...",
                        "points": 1,
                        "options": ["A", "B", "C", "D"],
                        "correct_answer": 2,
                        "explanation": "..."
                    }
                ]
            }
        });

        let payload = serde_json::json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_schema.to_string()}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.7
        });

        tracing::info!(topic, count, "requesting generated questions");
        let response = self.chat_openai(payload).await?;

        let entries = match response {
            JsonValue::Array(arr) => arr,
            JsonValue::Object(mut obj) => match obj.remove("questions") {
                Some(JsonValue::Array(arr)) => arr,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(entries)
    }
}
