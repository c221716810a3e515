use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::errors::CoreError;
use super::extraction_client::ExtractionClient;
use super::models::{
    ExtractionResult, JobRequirements, RuntimeSettings, MAX_RETRY_DELAY_SECONDS,
    MIN_RETRY_DELAY_SECONDS,
};
use super::response_parser::parse_extraction;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<ResponseCandidate>>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .as_ref()?
            .iter()
            .filter_map(|candidate| candidate.content.as_ref()?.parts.as_ref())
            .flatten()
            .filter_map(|part| part.text.as_deref())
            .find(|text| !text.trim().is_empty())
    }
}

/// Gemini `generateContent` client that asks for JSON matching the extraction schema.
pub struct GeminiExtractionClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: usize,
    retry_delay_seconds: f64,
    request_timeout: Option<Duration>,
}

impl GeminiExtractionClient {
    pub fn new(client: Client, api_key: String, settings: &RuntimeSettings) -> Self {
        Self {
            client,
            api_key,
            model: settings.gemini_model.clone(),
            base_url: settings.gemini_base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries.max(1),
            retry_delay_seconds: settings.retry_delay_seconds,
            request_timeout: settings.request_timeout_seconds.map(Duration::from_secs),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn generate_once(&self, body: &GenerateContentRequest<'_>) -> anyhow::Result<String> {
        let mut request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body);

        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::GeminiApi {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let text = response.text().await?;

        let payload = serde_json::from_str::<GenerateContentResponse>(&text)
            .map_err(|err| CoreError::ResponseShape(err.to_string()))?;

        payload
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| CoreError::EmptyModelResponse.into())
    }
}

#[async_trait]
impl ExtractionClient for GeminiExtractionClient {
    async fn screen_resume(
        &self,
        resume_text: &str,
        job_requirements: &JobRequirements,
    ) -> Result<ExtractionResult, CoreError> {
        let prompt = build_prompt(resume_text, job_requirements);
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        let mut last_error: Option<anyhow::Error> = None;
        for attempt in 0..self.max_retries {
            match self.generate_once(&body).await {
                Ok(text) => {
                    debug!(model = %self.model, attempt, "gemini extraction succeeded");
                    return parse_extraction(&text);
                }
                Err(err) => {
                    let retryable = is_retryable_error(&err);
                    let is_last_attempt = attempt + 1 >= self.max_retries;
                    if retryable && !is_last_attempt {
                        let backoff = backoff_delay(self.retry_delay_seconds, attempt);
                        warn!(
                            attempt,
                            backoff_seconds = backoff.as_secs_f64(),
                            "gemini call failed, retrying: {err}"
                        );
                        tokio::time::sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }

                    return Err(into_core_error(err));
                }
            }
        }

        Err(last_error
            .map(into_core_error)
            .unwrap_or(CoreError::EmptyModelResponse))
    }
}

/// Exponential backoff from `base_seconds`, clamped to the configured retry-delay bounds.
fn backoff_delay(base_seconds: f64, attempt: usize) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let seconds = (base_seconds * 2_f64.powi(exponent))
        .min(MAX_RETRY_DELAY_SECONDS)
        .max(MIN_RETRY_DELAY_SECONDS);
    Duration::try_from_secs_f64(seconds)
        .unwrap_or(Duration::from_secs(MAX_RETRY_DELAY_SECONDS as u64))
}

fn into_core_error(error: anyhow::Error) -> CoreError {
    match error.downcast::<CoreError>() {
        Ok(core_error) => core_error,
        Err(other) => match other.downcast::<reqwest::Error>() {
            Ok(http_error) => CoreError::GeminiApi {
                status: http_error.status().map(|s| s.as_u16()).unwrap_or(0),
                body: http_error.to_string(),
            },
            Err(other) => CoreError::ResponseShape(other.to_string()),
        },
    }
}

fn is_retryable_error(error: &anyhow::Error) -> bool {
    if let Some(core_error) = error.downcast_ref::<CoreError>() {
        return core_error.is_retryable();
    }

    if let Some(reqwest_error) = error.downcast_ref::<reqwest::Error>() {
        if reqwest_error.is_timeout()
            || reqwest_error.is_connect()
            || reqwest_error.is_body()
            || reqwest_error.is_decode()
        {
            return true;
        }

        if let Some(status) = reqwest_error.status() {
            let code = status.as_u16();
            return code == 429 || code >= 500;
        }
    }

    false
}

pub fn build_prompt(resume_text: &str, job_requirements: &JobRequirements) -> String {
    format!(
        "Act as a senior recruitment lead at TGC Global.\n\
         Analyze the provided HSE (Health, Safety, and Environment) resume.\n\
         \n\
         CRITICAL VERIFICATION:\n\
         1. NEBOSH: Identify NEBOSH IGC, NGC, or higher.\n\
         2. ADOSH/OSHAD: Identify Abu Dhabi OSH practitioner registrations.\n\
         3. LEVEL 6: Identify NVQ Level 6, OTHM Level 6, or NEBOSH International Diploma (IDip).\n\
         \n\
         NATURE OF EXPERIENCE:\n\
         Check if the candidate has worked in: {}.\n\
         \n\
         Resume Content:\n\
         {}\n",
        job_requirements.nature_of_experience.join(", "),
        resume_text
    )
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "fullName": { "type": "STRING" },
            "email": { "type": "STRING" },
            "phone": { "type": "STRING" },
            "technicalSkills": { "type": "ARRAY", "items": { "type": "STRING" } },
            "yearsOfExperience": { "type": "NUMBER" },
            "highestDegree": { "type": "STRING" },
            "hasNebosh": { "type": "BOOLEAN" },
            "hasLevel6": { "type": "BOOLEAN" },
            "hasAdosh": { "type": "BOOLEAN" },
            "natureOfExperienceFound": { "type": "ARRAY", "items": { "type": "STRING" } },
            "summary": { "type": "STRING", "description": "A 2-sentence executive summary" },
            "recommendation": {
                "type": "STRING",
                "description": "One of: 'Highly Recommended', 'Recommended', 'Review Required', 'Not Suitable'"
            },
            "keyStrengths": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Top 3 standout qualities"
            }
        },
        "required": [
            "fullName",
            "email",
            "yearsOfExperience",
            "hasNebosh",
            "hasLevel6",
            "hasAdosh",
            "recommendation"
        ]
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    #[test]
    fn prompt_lists_nature_of_experience_and_resume() {
        let prompt = build_prompt("Jane Doe, NEBOSH IGC", &JobRequirements::default());
        assert!(prompt.contains(
            "Check if the candidate has worked in: Rail, Infrastructure, Bridges, Villa, Building, Offshore, Onshore, Facility Management."
        ));
        assert!(prompt.ends_with("Jane Doe, NEBOSH IGC\n"));
    }

    #[test]
    fn schema_requires_core_fields() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required.len(), 7);
        assert!(required.contains(&"recommendation"));
        assert!(required.contains(&"yearsOfExperience"));
    }

    #[test]
    fn first_text_skips_empty_parts() {
        let payload: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "  " }, { "text": "{\"a\":1}" } ] } }
            ]
        }))
        .unwrap();
        assert_eq!(payload.first_text(), Some("{\"a\":1}"));

        let empty: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert_eq!(empty.first_text(), None);
    }

    #[test]
    fn request_body_uses_gemini_field_names() {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: json!({}),
            },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn endpoint_targets_configured_model() {
        let settings = RuntimeSettings {
            gemini_base_url: "http://localhost:9000/".to_string(),
            ..RuntimeSettings::default()
        };
        let client = GeminiExtractionClient::new(Client::new(), "key".to_string(), &settings);
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn wrapped_core_errors_survive_conversion() {
        let err = into_core_error(
            CoreError::GeminiApi {
                status: 503,
                body: "overloaded".to_string(),
            }
            .into(),
        );
        assert!(matches!(err, CoreError::GeminiApi { status: 503, .. }));
    }

    #[test]
    fn backoff_doubles_and_stays_bounded() {
        assert_eq!(backoff_delay(1.0, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1.0, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(0.0, 0), Duration::from_secs_f64(MIN_RETRY_DELAY_SECONDS));
        assert_eq!(backoff_delay(1e20, 0), Duration::from_secs(60));
        assert_eq!(backoff_delay(f64::INFINITY, 3), Duration::from_secs(60));
        assert_eq!(backoff_delay(1.0, usize::MAX), Duration::from_secs(60));
    }

    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let read = stream.read(&mut chunk).await.unwrap_or(0);
            if read == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..read]);

            let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }

    /// Answers every request with a 200 whose body is cut short.
    async fn truncated_body_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                read_request(&mut stream).await;
                let _ = stream
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 512\r\n\r\n{\"candidates\"",
                    )
                    .await;
                let _ = stream.shutdown().await;
            }
        });

        (base_url, connections)
    }

    #[tokio::test]
    async fn truncated_success_body_is_retried_as_transport_error() {
        let (base_url, connections) = truncated_body_server().await;
        let settings = RuntimeSettings {
            gemini_base_url: base_url,
            max_retries: 2,
            retry_delay_seconds: 0.1,
            ..RuntimeSettings::default()
        };
        let http = Client::builder().no_proxy().build().unwrap();
        let client = GeminiExtractionClient::new(http, "key".to_string(), &settings);

        let err = client
            .screen_resume("Jane Doe", &JobRequirements::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::GeminiApi { status: 0, .. }), "{err:?}");
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }
}
