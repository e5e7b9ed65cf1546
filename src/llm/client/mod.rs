//! LLM客户端 - 基于 rig 的文本生成服务实现

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::llm::{GenerationRequest, TextGenerator};

mod providers;

use providers::{CompletionSettings, ProviderClient};

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    system_prompt: String,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: &LLMConfig, system_prompt: &str) -> Result<Self> {
        let client = ProviderClient::new(config)?;
        Ok(Self {
            config: config.clone(),
            system_prompt: system_prompt.to_string(),
            client,
        })
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    tracing::warn!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {:#}",
                        retries,
                        max_retries,
                        err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl TextGenerator for LLMClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let settings = CompletionSettings {
            model: &self.config.model,
            preamble: &self.system_prompt,
            temperature: self.config.temperature,
            max_tokens: request.max_output_tokens,
        };
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        self.retry_with_backoff(|| async {
            let call = self.client.complete(&settings, &request.prompt);
            match tokio::time::timeout(timeout, call).await {
                Ok(response) => response,
                Err(_) => Err(anyhow!(
                    "model call timed out after {}s",
                    timeout.as_secs()
                )),
            }
        })
        .await
    }
}
