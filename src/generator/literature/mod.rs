use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;

use crate::error::{PipelineError, PipelineResult};
use crate::generator::context::GeneratorContext;
use crate::llm::GenerationRequest;
use crate::types::{LiteratureReview, PaperRecord};
use crate::utils::template::{collapse_whitespace, render_template, truncate_chars};

pub mod arxiv;

pub use arxiv::ArxivSource;

/// 检索排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Relevance,
}

/// 检索服务请求
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: usize,
    pub sort: SortOrder,
}

/// 检索服务返回的原始条目
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published: String,
    pub id: String,
}

/// 文献检索能力，按相关性顺序返回条目
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>>;
}

/// 文献调研器：检索相关论文并生成文献分析
#[derive(Default)]
pub struct LiteratureReviewer;

impl LiteratureReviewer {
    /// 执行文献调研；检索失败为致命错误，分析失败时退化为基于标题的分析文本
    pub async fn execute(
        &self,
        context: &GeneratorContext,
        topic: &str,
    ) -> PipelineResult<LiteratureReview> {
        let max_results = context.config.retrieval.max_results;
        let papers = self
            .search_relevant_papers(context, topic, max_results)
            .await?;
        tracing::info!("📚 检索到 {} 篇相关论文", papers.len());

        let analysis = match self.analyze_papers(context, topic, &papers).await {
            Ok(analysis) if !analysis.trim().is_empty() => analysis,
            Ok(_) => {
                tracing::warn!("⚠️ 文献分析返回空文本，使用基于标题的分析");
                fallback_analysis(topic, &papers)
            }
            Err(e) => {
                tracing::warn!("⚠️ 文献分析失败，使用基于标题的分析: {:#}", e);
                fallback_analysis(topic, &papers)
            }
        };

        Ok(LiteratureReview { papers, analysis })
    }

    /// 检索与主题相关的论文，结果保持检索服务的相关性顺序，最多 `max_results` 条
    pub async fn search_relevant_papers(
        &self,
        context: &GeneratorContext,
        topic: &str,
        max_results: usize,
    ) -> PipelineResult<Vec<PaperRecord>> {
        if max_results == 0 {
            return Err(PipelineError::Retrieval(
                "max_results must be at least 1".to_string(),
            ));
        }

        let query = SearchQuery {
            query: topic.to_string(),
            max_results,
            sort: SortOrder::Relevance,
        };

        let hits = context
            .literature_source
            .search(&query)
            .await
            .map_err(|e| PipelineError::retrieval(&e))?;

        Ok(hits.into_iter().take(max_results).map(normalize_hit).collect())
    }

    /// 分析论文的主题、空白、方法、发现与未来方向
    pub async fn analyze_papers(
        &self,
        context: &GeneratorContext,
        topic: &str,
        papers: &[PaperRecord],
    ) -> Result<String> {
        let composition = &context.config.composition;
        let paper_texts = papers
            .iter()
            .map(|paper| {
                format!(
                    "Title: {}\nAbstract: {}...",
                    paper.title,
                    truncate_chars(&paper.abstract_text, composition.literature_abstract_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = render_template(
            &composition.literature_template,
            &[("topic", topic), ("papers", &paper_texts)],
        );

        context
            .text_generator
            .generate(GenerationRequest::new(
                prompt,
                composition.literature_max_tokens,
            ))
            .await
    }
}

/// 文献分析不可用时的确定性替代文本
pub fn fallback_analysis(topic: &str, papers: &[PaperRecord]) -> String {
    if papers.is_empty() {
        return format!("No prior literature on {} was retrieved.", topic);
    }

    let titles = papers
        .iter()
        .map(|paper| format!("- {}", paper.title))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Automated literature analysis was unavailable. Retrieved {} papers on {}:\n{}",
        papers.len(),
        topic,
        titles
    )
}

fn normalize_hit(hit: SearchHit) -> PaperRecord {
    PaperRecord {
        title: collapse_whitespace(&hit.title),
        abstract_text: collapse_whitespace(&hit.summary),
        authors: hit
            .authors
            .into_iter()
            .map(|author| author.trim().to_string())
            .filter(|author| !author.is_empty())
            .collect(),
        published: normalize_published(&hit.published),
        url: hit.id.trim().to_string(),
    }
}

/// RFC 3339 时间统一为 `YYYY-MM-DD HH:MM:SS+00:00`，无法解析时原样保留
fn normalize_published(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(published) => published.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
        Err(_) => raw.trim().to_string(),
    }
}
