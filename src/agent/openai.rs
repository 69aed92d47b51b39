// src/agent/openai.rs
//! OpenAI-backed refinement agent (Chat Completions, JSON mode).

use super::{AgentConfig, AgentError, RefineAgent};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// The patch contract the model must honor. JSON mode plus a low
/// temperature keeps replies structural; everything else is rejected as
/// malformed by `extract_patch`.
const PATCH_SCHEMA_PROMPT: &str = "You are a study-abroad profile assistant. \
You receive JSON with the student's current profile and a free-text request. \
Reply with STRICT JSON only: an object with a single key \"patch\" holding a \
partial profile containing only the fields to change. Allowed fields: \
languages (array of ISO-639-1 codes), preferences.countries_targets (array \
of ISO-3166-1 alpha-2 codes), preferences.campus_setting (\"urban\" or \
\"rural\"), preferences.domains_priorities (array of study domains, snake_case). \
Use lowercase codes. Never invent other fields. If the request changes \
nothing, reply {\"patch\": {}}.";

pub struct OpenAiAgent {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiAgent {
    pub fn new(config: &AgentConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("uni-match/0.1")
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait::async_trait]
impl RefineAgent for OpenAiAgent {
    async fn refine(&self, profile: &Value, message: &str) -> Result<Value, AgentError> {
        if self.api_key.is_empty() {
            return Err(AgentError::MissingCredential);
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: String,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: Value,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: PATCH_SCHEMA_PROMPT.to_string(),
                },
                Msg {
                    role: "user",
                    content: json!({ "profile": profile, "request": message }).to_string(),
                },
            ],
            temperature: 0.1,
            response_format: json!({ "type": "json_object" }),
        };

        let resp = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(AgentError::Http)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AgentError::Status(status));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|err| AgentError::Malformed(format!("undecodable agent response: {err}")))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();
        extract_patch(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Pull the patch object out of the model's JSON answer.
fn extract_patch(content: &str) -> Result<Value, AgentError> {
    let parsed: Value = serde_json::from_str(content)
        .map_err(|err| AgentError::Malformed(format!("non-JSON agent reply: {err}")))?;
    match parsed.get("patch") {
        Some(patch @ Value::Object(_)) => Ok(patch.clone()),
        Some(_) => Err(AgentError::Malformed("patch field is not an object".to_string())),
        None => Err(AgentError::Malformed("reply has no patch field".to_string())),
    }
}
