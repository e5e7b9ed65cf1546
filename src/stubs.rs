//! 外部服务的确定性替身实现，用于测试与离线演示

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::generator::literature::{LiteratureSource, SearchHit, SearchQuery};
use crate::llm::{GenerationRequest, TextGenerator};

/// 确定性的文本生成替身
///
/// prompt 中包含任一失败标记时返回错误，包含任一空响应标记时返回空文本，其余情况返回可预测的文本。
#[derive(Default)]
pub struct StubTextGenerator {
    failure_markers: Vec<String>,
    empty_markers: Vec<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl StubTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_when(mut self, marker: &str) -> Self {
        self.failure_markers.push(marker.to_string());
        self
    }

    pub fn empty_when(mut self, marker: &str) -> Self {
        self.empty_markers.push(marker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 已收到的请求（按完成记录的顺序）
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for StubTextGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        if let Some(marker) = self
            .failure_markers
            .iter()
            .find(|marker| request.prompt.contains(marker.as_str()))
        {
            return Err(anyhow!("stub generator failure for `{}`", marker));
        }
        if self
            .empty_markers
            .iter()
            .any(|marker| request.prompt.contains(marker.as_str()))
        {
            return Ok(String::new());
        }

        let first_line = request
            .prompt
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        Ok(format!(
            "Generated text (max {} tokens) for: {}",
            request.max_output_tokens, first_line
        ))
    }
}

/// 确定性的文献检索替身，忽略 max_results 原样返回全部条目
#[derive(Default)]
pub struct StubLiteratureSource {
    hits: Vec<SearchHit>,
    failure: Option<String>,
    queries: Mutex<Vec<SearchQuery>>,
}

impl StubLiteratureSource {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    /// 生成 `count` 条编号连续的论文
    pub fn with_papers(count: usize) -> Self {
        Self::new((1..=count).map(sample_hit).collect())
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LiteratureSource for StubLiteratureSource {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }
        match &self.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(self.hits.clone()),
        }
    }
}

/// 编号为 `n` 的示例论文
pub fn sample_hit(n: usize) -> SearchHit {
    SearchHit {
        title: format!("Paper {}", n),
        summary: format!("Abstract of paper {}.", n),
        authors: vec![format!("Author {}A", n), format!("Author {}B", n)],
        published: format!("2024-01-{:02}T08:30:00Z", (n % 28) + 1),
        id: format!("http://arxiv.org/abs/2401.{:05}v1", n),
    }
}
