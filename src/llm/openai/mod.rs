pub(in crate::llm) mod compat;
pub(in crate::llm) mod types;

use self::types::{ChatRequest, ChatResponse, UserPreferences};
use crate::llm::scrub::api_error;
use crate::llm::traits::{ModelCapability, RouterDecision, ToolChoice};
use crate::llm::types::{ProviderMessage, ProviderResponse};
use crate::tools::ToolSpec;
use anyhow::Context;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
const PROVIDER_NAME: &str = "OpenAI";
const MISSING_API_KEY_MESSAGE: &str =
    "OpenAI API key not set. Add api_key to config.toml or set MAILSTEWARD_API_KEY.";

/// Chat-completions client for the OpenAI API and compatible servers.
pub struct OpenAiModel {
    /// Pre-computed `"Bearer <key>"` header value.
    cached_auth_header: Option<String>,
    client: Client,
    endpoint: String,
    model: String,
    temperature: f64,
}

impl OpenAiModel {
    pub fn new(api_key: Option<&str>, api_url: &str, model: &str, temperature: f64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            client,
            endpoint: format!("{}/chat/completions", api_url.trim_end_matches('/')),
            model: model.to_string(),
            temperature,
        }
    }

    async fn call_api(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let auth_header = self
            .cached_auth_header
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!(MISSING_API_KEY_MESSAGE))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", auth_header)
            .json(request)
            .send()
            .await
            .map_err(|error| anyhow::anyhow!("{PROVIDER_NAME} request failed: {error}"))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER_NAME, response).await);
        }

        response
            .json()
            .await
            .map_err(|error| anyhow::anyhow!("{PROVIDER_NAME} response JSON decode failed: {error}"))
    }

    async fn classify_impl(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<RouterDecision> {
        let mut request = compat::build_chat_request(
            &self.model,
            self.temperature,
            compat::build_messages(system_prompt, &[ProviderMessage::user(user_prompt)]),
        );
        request.response_format = Some(compat::router_response_format());

        let chat_response = self.call_api(&request).await?;
        let raw = compat::extract_text(&chat_response, PROVIDER_NAME)?;
        serde_json::from_str(&raw).context("router output was not valid JSON")
    }

    async fn generate_impl(
        &self,
        system_prompt: &str,
        messages: &[ProviderMessage],
        tools: &[ToolSpec],
        tool_choice: ToolChoice,
    ) -> anyhow::Result<ProviderResponse> {
        let mut request = compat::build_chat_request(
            &self.model,
            self.temperature,
            compat::build_messages(system_prompt, messages),
        );
        request.tools = compat::build_openai_tools(tools);
        if request.tools.is_some() {
            request.tool_choice = Some(tool_choice.as_str());
            request.parallel_tool_calls = Some(false);
        }

        let chat_response = self.call_api(&request).await?;
        compat::build_tool_provider_response(chat_response, PROVIDER_NAME)
    }

    async fn merge_impl(
        &self,
        system_prompt: &str,
        messages: &[ProviderMessage],
    ) -> anyhow::Result<String> {
        let mut request = compat::build_chat_request(
            &self.model,
            self.temperature,
            compat::build_messages(system_prompt, messages),
        );
        request.response_format = Some(compat::preferences_response_format());

        let chat_response = self.call_api(&request).await?;
        let raw = compat::extract_text(&chat_response, PROVIDER_NAME)?;
        let parsed: UserPreferences =
            serde_json::from_str(&raw).context("preference merge output was not valid JSON")?;
        tracing::debug!(reasoning = %parsed.chain_of_thought, "preference merge reasoning");
        Ok(parsed.user_preferences)
    }
}

impl ModelCapability for OpenAiModel {
    fn name(&self) -> &str {
        "openai"
    }

    fn classify_structured<'a>(
        &'a self,
        system_prompt: &'a str,
        user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<RouterDecision>> + Send + 'a>> {
        Box::pin(self.classify_impl(system_prompt, user_prompt))
    }

    fn generate_with_tools<'a>(
        &'a self,
        system_prompt: &'a str,
        messages: &'a [ProviderMessage],
        tools: &'a [ToolSpec],
        tool_choice: ToolChoice,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(self.generate_impl(system_prompt, messages, tools, tool_choice))
    }

    fn merge_profile<'a>(
        &'a self,
        system_prompt: &'a str,
        messages: &'a [ProviderMessage],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self.merge_impl(system_prompt, messages))
    }
}
