//! 各模型服务商的客户端封装

use anyhow::Result;
use rig::{client::CompletionClient, completion::Prompt};

use crate::config::{LLMConfig, LLMProvider};

/// 单次补全调用的参数
#[derive(Debug, Clone, Copy)]
pub struct CompletionSettings<'a> {
    pub model: &'a str,
    pub preamble: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// 在 agent builder 上套用通用参数，构建一次性 agent 并执行 prompt
macro_rules! prompt_once {
    ($builder:expr, $settings:expr, $prompt:expr) => {{
        let agent = $builder
            .preamble($settings.preamble)
            .max_tokens(u64::from($settings.max_tokens))
            .temperature($settings.temperature)
            .build();
        agent.prompt($prompt).await.map_err(anyhow::Error::from)
    }};
}

/// 按配置选定的服务商客户端
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    Moonshot(rig::providers::moonshot::Client),
    DeepSeek(rig::providers::deepseek::Client),
    Anthropic(rig::providers::anthropic::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let client = match config.provider {
            LLMProvider::OpenAI => ProviderClient::OpenAI(
                rig::providers::openai::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build(),
            ),
            LLMProvider::Moonshot => ProviderClient::Moonshot(
                rig::providers::moonshot::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build(),
            ),
            LLMProvider::DeepSeek => ProviderClient::DeepSeek(
                rig::providers::deepseek::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build(),
            ),
            LLMProvider::Anthropic => ProviderClient::Anthropic(
                rig::providers::anthropic::ClientBuilder::new(&config.api_key).build()?,
            ),
            // 本地服务，不需要 api key
            LLMProvider::Ollama => {
                ProviderClient::Ollama(rig::providers::ollama::Client::builder().build())
            }
        };
        tracing::debug!("🔌 已创建 {} 客户端", config.provider);
        Ok(client)
    }

    /// 发送一次补全请求并返回生成的文本
    pub async fn complete(&self, settings: &CompletionSettings<'_>, prompt: &str) -> Result<String> {
        match self {
            ProviderClient::OpenAI(client) => prompt_once!(
                client
                    .completion_model(settings.model)
                    .completions_api()
                    .into_agent_builder(),
                settings,
                prompt
            ),
            ProviderClient::Moonshot(client) => {
                prompt_once!(client.agent(settings.model), settings, prompt)
            }
            ProviderClient::DeepSeek(client) => {
                prompt_once!(client.agent(settings.model), settings, prompt)
            }
            ProviderClient::Anthropic(client) => {
                prompt_once!(client.agent(settings.model), settings, prompt)
            }
            ProviderClient::Ollama(client) => {
                prompt_once!(client.agent(settings.model), settings, prompt)
            }
        }
    }
}
