//! GeminiAnalysisAgent - Direct REST API implementation of the analysis
//! service.
//!
//! Calls the Gemini REST API with a structured JSON response schema, so
//! the outcome deserializes straight into [`AnalysisResult`]. The agent
//! touches no session state; from the workflow's point of view the call
//! is idempotent and a failure surfaces as the retryable
//! `AnalysisUnavailable`.

use accord_core::analysis::{
    AnalysisRequest, AnalysisResult, AnalysisService, PartnerAnalysis, Resolution,
};
use accord_core::error::{AccordError, Result};
use accord_core::profile::ParticipantProfile;
use accord_core::session::ConflictReport;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_INSTRUCTION: &str = "\
You are a Relationship Conflict Engine based on Cognitive Behavioral Therapy (CBT).
Your goal is to be brutally honest, identifying cognitive distortions, validating \
fair points, and pointing out uncomfortable truths for both partners.

You do not sugarcoat. You are neutral but firm.
You must identify if abuse is present.

You will be given the profiles of two partners (A and B) including their triggers \
and core beliefs.
You will be given the conflict reports from both sides.

Your output must be JSON adhering to the schema provided.

Analyze:
1. Cognitive Distortions (Mind reading, Catastrophizing, Labelling, etc.)
2. How their Core Beliefs triggered the reaction.
3. The \"Hard Truth\" - the blunt reality they need to hear about their behavior.
4. Fair Points - what they actually got right.
5. Constructive Resolution.";

/// Analysis agent that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiAnalysisAgent {
    client: Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiAnalysisAgent {
    /// Creates a new agent with the provided API key and the default
    /// model and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Loads the API key from the `GEMINI_API_KEY` environment variable.
    pub fn try_from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AccordError::config("GEMINI_API_KEY is not set"))?;
        if api_key.is_empty() {
            return Err(AccordError::config("GEMINI_API_KEY is empty"));
        }
        Ok(Self::new(api_key))
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the request timeout after construction.
    ///
    /// When the timeout elapses the call fails with the retryable
    /// `AnalysisUnavailable` and the session stays in `analyzing`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            BASE_URL,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() || err.is_connect() {
                    AccordError::analysis_unavailable(format!("Gemini API request failed: {err}"))
                } else {
                    AccordError::internal(format!("Gemini API request failed: {err}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            AccordError::internal(format!("Failed to parse Gemini response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl AnalysisService for GeminiAnalysisAgent {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: build_prompt(&request),
                }],
            }],
            system_instruction: Some(Content {
                role: "system".to_string(),
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };

        tracing::debug!(model = %self.model, "Requesting conflict analysis");
        let text = self.send_request(&body).await?;
        let wire: AnalysisResponseDto = serde_json::from_str(&text).map_err(|err| {
            AccordError::internal(format!("Gemini returned malformed analysis JSON: {err}"))
        })?;
        Ok(wire.into())
    }
}

fn describe_profile(label: &str, profile: &ParticipantProfile) -> String {
    format!(
        "PARTNER {label} PROFILE:\n\
         Name: {}\n\
         Triggers: {}\n\
         Core Beliefs: {}\n\
         Conflict Style: {:?}\n\
         Attachment: {:?}",
        profile.display_name,
        profile.triggers.join(", "),
        profile.core_beliefs.join(", "),
        profile.conflict_style,
        profile.attachment_style,
    )
}

fn describe_report(label: &str, report: &ConflictReport) -> String {
    format!(
        "CONFLICT REPORT PARTNER {label}:\n\
         Happened: \"{}\"\n\
         Reaction: \"{}\"\n\
         Feeling: \"{}\"\n\
         Triggered By: \"{}\"",
        report.what_happened, report.reaction, report.feelings, report.trigger,
    )
}

/// Builds the user prompt from both profiles and both reports.
fn build_prompt(request: &AnalysisRequest) -> String {
    let amendment = match request.amendment_a.as_deref() {
        Some(text) if !text.trim().is_empty() => text,
        _ => "None",
    };

    format!(
        "{}\n\n{}\n\n{}\n\n{}\n\n\
         AMENDMENTS BY PARTNER A (After reading B's side):\n\"{}\"\n\n\
         Generate the CBT Analysis.",
        describe_profile("A", &request.initiator_profile),
        describe_profile("B", &request.responder_profile),
        describe_report("A", &request.report_a),
        describe_report("B", &request.report_b),
        amendment,
    )
}

/// The structured response schema sent to the API.
///
/// Keys follow the wire format of [`AnalysisResponseDto`].
fn response_schema() -> serde_json::Value {
    let partner_analysis = json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "distortions": { "type": "ARRAY", "items": { "type": "STRING" } },
            "hardTruth": { "type": "STRING" },
            "fairPoints": { "type": "STRING" },
        },
        "required": ["summary", "distortions", "hardTruth", "fairPoints"],
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "partnerA_analysis": partner_analysis,
            "partnerB_analysis": partner_analysis,
            "resolution": {
                "type": "OBJECT",
                "properties": {
                    "immediateSteps": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "longTermWork": { "type": "STRING" },
                    "safetyWarning": { "type": "STRING" },
                },
                "required": ["immediateSteps", "longTermWork"],
            },
        },
        "required": ["partnerA_analysis", "partnerB_analysis", "resolution"],
    })
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

/// Wire shape of the analysis JSON the model returns.
#[derive(Debug, Deserialize)]
struct AnalysisResponseDto {
    #[serde(rename = "partnerA_analysis")]
    partner_a_analysis: PartnerAnalysisDto,
    #[serde(rename = "partnerB_analysis")]
    partner_b_analysis: PartnerAnalysisDto,
    resolution: ResolutionDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartnerAnalysisDto {
    summary: String,
    distortions: Vec<String>,
    hard_truth: String,
    fair_points: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolutionDto {
    immediate_steps: Vec<String>,
    long_term_work: String,
    #[serde(default)]
    safety_warning: Option<String>,
}

impl From<PartnerAnalysisDto> for PartnerAnalysis {
    fn from(dto: PartnerAnalysisDto) -> Self {
        Self {
            summary: dto.summary,
            distortions: dto.distortions,
            hard_truth: dto.hard_truth,
            fair_points: dto.fair_points,
        }
    }
}

impl From<AnalysisResponseDto> for AnalysisResult {
    fn from(dto: AnalysisResponseDto) -> Self {
        Self {
            initiator_analysis: dto.partner_a_analysis.into(),
            responder_analysis: dto.partner_b_analysis.into(),
            resolution: Resolution {
                immediate_steps: dto.resolution.immediate_steps,
                long_term_work: dto.resolution.long_term_work,
                safety_warning: dto.resolution.safety_warning,
            },
        }
    }
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String> {
    response
        .candidates
        .and_then(|mut candidates| candidates.pop())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        .ok_or_else(|| {
            AccordError::internal("Gemini API returned no text in the response candidates")
        })
}

fn map_http_error(status: StatusCode, body: String) -> AccordError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    if is_retryable {
        AccordError::analysis_unavailable(format!("Gemini API error ({status}): {message}"))
    } else {
        AccordError::internal(format!("Gemini API error ({status}): {message}"))
    }
}
