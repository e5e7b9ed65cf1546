//! 文本生成服务边界

use anyhow::Result;
use async_trait::async_trait;

pub mod client;

/// 一次文本生成请求
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens,
        }
    }
}

/// 文本生成能力（prompt -> text）
///
/// 实现方负责超时与重试；调用方把任何错误都视为本次调用失败。
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}
