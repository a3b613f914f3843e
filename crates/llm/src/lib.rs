use anyhow::{anyhow, Context, Result};
use reqwest::{header::HeaderValue, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::time::sleep;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Gemini => "gemini",
            LlmProvider::Ollama => "ollama",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "openai" => Some(LlmProvider::OpenAi),
            "gemini" => Some(LlmProvider::Gemini),
            "ollama" => Some(LlmProvider::Ollama),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub user: String,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    provider: LlmProvider,
    model: String,
    timeout: Duration,
    config: ProviderConfig,
}

#[derive(Clone)]
enum ProviderConfig {
    OpenAi(OpenAiConfig),
    Gemini(GeminiConfig),
    Ollama(OllamaConfig),
}

#[derive(Clone)]
struct OpenAiConfig {
    api_key: String,
    base_url: String,
}

#[derive(Clone)]
struct GeminiConfig {
    api_key: String,
    temperature: f32,
}

#[derive(Clone)]
struct OllamaConfig {
    base_url: String,
}

impl LlmClient {
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(provider, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// A client whose every request is bounded by `timeout`. A blocked or
    /// slow provider surfaces as an error the caller can degrade from, not
    /// a hang.
    pub fn with_timeout(
        provider: LlmProvider,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let model = model.into();
        let config = match provider {
            LlmProvider::OpenAi => ProviderConfig::OpenAi(OpenAiConfig {
                api_key: read_api_key("OPENAI_API_KEY")?,
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            }),
            LlmProvider::Gemini => ProviderConfig::Gemini(GeminiConfig {
                api_key: read_api_key("GEMINI_API_KEY")?,
                temperature: env::var("GEMINI_TEMPERATURE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.2),
            }),
            LlmProvider::Ollama => ProviderConfig::Ollama(OllamaConfig {
                base_url: env::var("OLLAMA_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            }),
        };
        Ok(Self {
            http: Client::new(),
            provider,
            model,
            timeout,
            config,
        })
    }

    /// Provider and model resolved from `LLM_PROVIDER` and the matching
    /// model variable, the way the rest of the workspace reads its
    /// environment.
    pub fn from_env() -> Result<Self> {
        let raw = env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string());
        let provider = LlmProvider::from_str(&raw)
            .ok_or_else(|| anyhow!("unknown LLM_PROVIDER: {raw}"))?;
        let model = match provider {
            LlmProvider::OpenAi => {
                env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
            }
            LlmProvider::Gemini => {
                env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string())
            }
            LlmProvider::Ollama => {
                env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.1".to_string())
            }
        };
        let timeout = env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::with_timeout(provider, model, Duration::from_secs(timeout))
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat(&self, req: &LlmRequest) -> Result<LlmResponse> {
        match &self.config {
            ProviderConfig::OpenAi(cfg) => self.chat_openai(cfg, req).await,
            ProviderConfig::Gemini(cfg) => self.chat_gemini(cfg, req).await,
            ProviderConfig::Ollama(cfg) => self.chat_ollama(cfg, req).await,
        }
    }

    pub fn chat_blocking(&self, req: &LlmRequest) -> Result<LlmResponse> {
        let rt = Runtime::new().context("failed to create tokio runtime")?;
        rt.block_on(self.chat(req))
    }

    async fn chat_openai(&self, cfg: &OpenAiConfig, req: &LlmRequest) -> Result<LlmResponse> {
        const MAX_RETRIES: usize = 4;
        let url = format!("{}/chat/completions", cfg.base_url.trim_end_matches('/'));
        let mut messages = Vec::new();
        if let Some(system) = &req.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": req.user }));
        let payload = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = match self
                .http
                .post(&url)
                .bearer_auth(&cfg.api_key)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt > MAX_RETRIES {
                        return Err(err).context("openai request failed");
                    }
                    sleep(backoff_delay(attempt, None)).await;
                    continue;
                }
            };
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt > MAX_RETRIES {
                    return Err(anyhow!("openai rate limited after {MAX_RETRIES} retries"));
                }
                let wait = backoff_delay(attempt, response.headers().get("retry-after"));
                sleep(wait).await;
                continue;
            }
            let body = response
                .error_for_status()
                .context("openai returned an error")?
                .json::<ChatResponse>()
                .await
                .context("failed to decode openai response")?;
            let content = body
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| anyhow!("missing text in OpenAI response"))?;
            return Ok(LlmResponse { content });
        }
    }

    async fn chat_gemini(&self, cfg: &GeminiConfig, req: &LlmRequest) -> Result<LlmResponse> {
        let mut prompt = String::new();
        if let Some(system) = &req.system {
            prompt.push_str(system.trim());
            prompt.push_str("\n\n");
        }
        prompt.push_str(&req.user);
        let payload = json!({
            "contents": [ { "parts": [ { "text": prompt } ] } ],
            "generationConfig": {
                "maxOutputTokens": req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                "temperature": cfg.temperature,
            }
        });
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, cfg.api_key
        );
        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("gemini request failed")?
            .error_for_status()
            .context("gemini returned an error")?
            .json::<GeminiResponse>()
            .await
            .context("failed to decode gemini response")?;
        let text = response
            .candidates
            .and_then(|mut c| c.pop())
            .and_then(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .find_map(|part| part.text)
            })
            .ok_or_else(|| anyhow!("missing text in Gemini response"))?;
        Ok(LlmResponse { content: text })
    }

    async fn chat_ollama(&self, cfg: &OllamaConfig, req: &LlmRequest) -> Result<LlmResponse> {
        let mut prompt = String::new();
        if let Some(system) = &req.system {
            prompt.push_str(system.trim());
            prompt.push_str("\n\n");
        }
        prompt.push_str(&req.user);
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS) },
        });
        let url = format!("{}/api/generate", cfg.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("ollama request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("ollama returned HTTP {status}: {}", truncate(&body, 300)));
        }
        let body = response
            .json::<OllamaResponse>()
            .await
            .context("failed to decode ollama response")?;
        Ok(LlmResponse {
            content: body.response.unwrap_or_default(),
        })
    }
}

fn backoff_delay(attempt: usize, retry_after: Option<&HeaderValue>) -> Duration {
    if let Some(value) = retry_after {
        if let Ok(text) = value.to_str() {
            if let Ok(secs) = text.parse::<u64>() {
                return Duration::from_secs(secs.max(1));
            }
        }
    }
    let capped = attempt.min(5) as u32;
    Duration::from_secs(1u64 << capped)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn read_api_key(var: &str) -> Result<String> {
    env::var(var).map_err(|_| anyhow!("{var} is not set"))
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_round_trip() {
        for provider in [LlmProvider::OpenAi, LlmProvider::Gemini, LlmProvider::Ollama] {
            assert_eq!(LlmProvider::from_str(provider.as_str()), Some(provider));
        }
        assert_eq!(LlmProvider::from_str("none"), None);
    }

    #[test]
    fn backoff_prefers_retry_after_header() {
        let header = HeaderValue::from_static("7");
        assert_eq!(backoff_delay(1, Some(&header)), Duration::from_secs(7));
        assert_eq!(backoff_delay(2, None), Duration::from_secs(4));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("ok", 300), "ok");
    }
}
