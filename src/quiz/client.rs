use std::time::Duration;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::quiz::health::{HealthPayload, ServiceStatus};
use crate::quiz::{Difficulty, Quiz};

pub const MIN_TOPIC_CHARS: usize = 2;
pub const MAX_TOPIC_CHARS: usize = 80;
pub const MAX_QUESTION_COUNT: u8 = 15;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of `POST /generate-quiz`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GenerateRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub count: u8,
}

impl GenerateRequest {
    /// Builds a request the service will accept, or explains locally why not.
    pub fn new(topic: &str, difficulty: Difficulty, count: u8) -> Result<Self, AcquireError> {
        let topic = topic.trim();
        let chars = topic.chars().count();
        if chars < MIN_TOPIC_CHARS {
            return Err(AcquireError::Validation(format!(
                "Please enter a topic of at least {} characters.",
                MIN_TOPIC_CHARS
            )));
        }
        if chars > MAX_TOPIC_CHARS {
            return Err(AcquireError::Validation(format!(
                "Please keep the topic under {} characters.",
                MAX_TOPIC_CHARS
            )));
        }
        if count == 0 || count > MAX_QUESTION_COUNT {
            return Err(AcquireError::Validation(format!(
                "The number of questions must be between 1 and {}.",
                MAX_QUESTION_COUNT
            )));
        }
        Ok(Self {
            topic: topic.to_string(),
            difficulty,
            count,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("{0}")]
    Validation(String),
    #[error("Could not reach the quiz service. Please try again.")]
    Transport(#[source] reqwest::Error),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("The quiz service sent back a quiz that cannot be played: {0}")]
    InvalidQuiz(String),
    #[error("Quiz generation cancelled.")]
    Cancelled,
}

impl AcquireError {
    /// Uses the service's `detail` text when it sent one.
    pub fn server(status: u16, detail: Option<String>) -> Self {
        let message = detail
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Backend error ({})", status));
        Self::Server { status, message }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Client for the quiz generation service.
pub struct QuizClient {
    http: reqwest::Client,
    base_url: String,
}

impl QuizClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Generates a quiz, giving up as soon as `cancel` fires.
    ///
    /// The token is checked again once the request finished, so a response
    /// that raced a cancellation is still reported as [`AcquireError::Cancelled`].
    pub async fn request_generated_quiz(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<Quiz, AcquireError> {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AcquireError::Cancelled),
            outcome = self.generate(request) => outcome,
        };

        if cancel.is_cancelled() {
            info!("Generation for topic {:?} was cancelled", request.topic);
            return Err(AcquireError::Cancelled);
        }
        outcome
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Quiz, AcquireError> {
        info!(
            "Requesting a {} quiz on {:?} with {} questions",
            request.difficulty, request.topic, request.count
        );

        let response = self
            .http
            .post(self.url("generate-quiz"))
            .json(request)
            .send()
            .await
            .map_err(AcquireError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            // FastAPI validation errors carry a list here, only plain strings are shown
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(str::to_string));
            warn!("Quiz service answered {} ({:?})", status, detail);
            return Err(AcquireError::server(status.as_u16(), detail));
        }

        let quiz: Quiz = response
            .json()
            .await
            .map_err(|e| AcquireError::InvalidQuiz(e.to_string()))?;
        quiz.validate()
            .map_err(|e| AcquireError::InvalidQuiz(e.to_string()))?;

        debug!("Received {} questions on {:?}", quiz.len(), quiz.topic);
        Ok(quiz)
    }

    /// Probes `GET /health`. Every failure is reported as unreachable.
    pub async fn check_service_availability(&self) -> ServiceStatus {
        let response = match self
            .http
            .get(self.url("health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Health probe answered {}", response.status());
                return ServiceStatus::Unreachable;
            }
            Err(e) => {
                debug!("Health probe failed: {}", e);
                return ServiceStatus::Unreachable;
            }
        };

        match response.json::<HealthPayload>().await {
            Ok(payload) => ServiceStatus::from(payload),
            Err(e) => {
                debug!("Health probe returned an unexpected body: {}", e);
                ServiceStatus::Unreachable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> QuizClient {
        QuizClient::new(&server.uri(), Duration::from_secs(5)).expect("Failed to build client")
    }

    fn quiz_body() -> serde_json::Value {
        json!({
            "topic": "space exploration",
            "difficulty": "easy",
            "questions": [
                {
                    "question": "Sample question 1",
                    "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
                    "answer_index": 0,
                    "explanation": "Sample explanation."
                },
                {
                    "question": "Sample question 2",
                    "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
                    "answer_index": 1,
                    "explanation": "Sample explanation."
                }
            ]
        })
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new("space exploration", Difficulty::Easy, 2).unwrap()
    }

    #[test]
    fn validation_happens_before_any_request() {
        for topic in ["", " ", "a", "  b  "] {
            let err = GenerateRequest::new(topic, Difficulty::Easy, 5).unwrap_err();
            assert!(matches!(err, AcquireError::Validation(_)), "{topic:?}");
        }
        let long = "x".repeat(MAX_TOPIC_CHARS + 1);
        assert!(GenerateRequest::new(&long, Difficulty::Easy, 5).is_err());
        assert!(GenerateRequest::new("rust", Difficulty::Easy, 0).is_err());
        assert!(GenerateRequest::new("rust", Difficulty::Easy, 16).is_err());

        let ok = GenerateRequest::new("  rust  ", Difficulty::Hard, 15).unwrap();
        assert_eq!(ok.topic, "rust");
    }

    #[test]
    fn server_message_prefers_detail() {
        let err = AcquireError::server(500, Some("Backend error: boom".into()));
        assert_eq!(err.to_string(), "Backend error: boom");
        assert_eq!(
            AcquireError::server(502, None).to_string(),
            "Backend error (502)"
        );
        assert_eq!(
            AcquireError::server(500, Some("   ".into())).to_string(),
            "Backend error (500)"
        );
    }

    #[tokio::test]
    async fn test_generate_quiz_posts_json_and_parses_quiz() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate-quiz"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "topic": "space exploration",
                "difficulty": "easy",
                "count": 2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(quiz_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let quiz = client(&mock_server)
            .request_generated_quiz(&request(), &CancellationToken::new())
            .await
            .expect("Request failed");

        assert_eq!(quiz.topic, "space exploration");
        assert_eq!(quiz.len(), 2);
        assert_eq!(quiz.questions[1].correct_option_index, 1);
    }

    #[tokio::test]
    async fn test_error_status_surfaces_detail() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate-quiz"))
            .respond_with(
                ResponseTemplate::new(502)
                    .set_body_json(json!({"detail": "AI returned invalid JSON"})),
            )
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .request_generated_quiz(&request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::Server { status: 502, .. }));
        assert_eq!(err.to_string(), "AI returned invalid JSON");
    }

    #[tokio::test]
    async fn test_error_status_without_string_detail() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate-quiz"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"detail": [{"loc": ["body", "topic"], "msg": "too short"}]})),
            )
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .request_generated_quiz(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Backend error (422)");

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .request_generated_quiz(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Backend error (500)");
    }

    #[tokio::test]
    async fn test_malformed_quiz_is_rejected() {
        let mock_server = MockServer::start().await;

        let mut body = quiz_body();
        body["questions"][0]["answer_index"] = json!(7);
        Mock::given(method("POST"))
            .and(path("/generate-quiz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .request_generated_quiz(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::InvalidQuiz(_)));

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"topic": "x"})))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .request_generated_quiz(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::InvalidQuiz(_)));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let client = QuizClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = client
            .request_generated_quiz(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::Transport(_)));
    }

    #[tokio::test]
    async fn test_cancel_mid_flight() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate-quiz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(quiz_body())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let err = client(&mock_server)
            .request_generated_quiz(&request(), &token)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_cancelled_token_sends_nothing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quiz_body()))
            .expect(0)
            .mount(&mock_server)
            .await;

        let token = CancellationToken::new();
        token.cancel();
        let err = client(&mock_server)
            .request_generated_quiz(&request(), &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_health_modes() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"status": "ok", "mock": false, "model": "gpt-4o-mini", "mode": "ai"}),
            ))
            .mount(&mock_server)
            .await;
        assert_eq!(
            client(&mock_server).check_service_availability().await,
            ServiceStatus::Live {
                model: Some("gpt-4o-mini".to_string())
            }
        );

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "mock": true})))
            .mount(&mock_server)
            .await;
        assert_eq!(
            client(&mock_server).check_service_availability().await,
            ServiceStatus::Demo
        );
    }

    #[tokio::test]
    async fn test_health_failures_are_unreachable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"mock": false})))
            .mount(&mock_server)
            .await;
        assert_eq!(
            client(&mock_server).check_service_availability().await,
            ServiceStatus::Unreachable
        );

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;
        assert_eq!(
            client(&mock_server).check_service_availability().await,
            ServiceStatus::Unreachable
        );

        let offline = QuizClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        assert_eq!(
            offline.check_service_availability().await,
            ServiceStatus::Unreachable
        );
    }
}
