//! arXiv 检索服务实现（Atom API）

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{LiteratureSource, SearchHit, SearchQuery, SortOrder};
use crate::config::RetrievalConfig;

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: String,
}

/// arXiv 文献检索客户端
pub struct ArxivSource {
    client: reqwest::Client,
    api_base_url: String,
}

impl ArxivSource {
    pub fn new(config: &RetrievalConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("paperwright/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client for arXiv")?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
        })
    }
}

#[async_trait]
impl LiteratureSource for ArxivSource {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let sort_by = match query.sort {
            SortOrder::Relevance => "relevance",
        };
        let params = [
            ("search_query", format!("all:{}", query.query)),
            ("start", "0".to_string()),
            ("max_results", query.max_results.to_string()),
            ("sortBy", sort_by.to_string()),
            ("sortOrder", "descending".to_string()),
        ];

        tracing::debug!("🌐 请求 arXiv: {} {:?}", self.api_base_url, params);

        let body = self
            .client
            .get(&self.api_base_url)
            .query(&params)
            .send()
            .await
            .context("arXiv request failed")?
            .error_for_status()
            .context("arXiv returned an error status")?
            .text()
            .await
            .context("Failed to read arXiv response body")?;

        parse_feed(&body)
    }
}

/// 解析 arXiv 返回的 Atom feed，保持条目原有顺序
pub fn parse_feed(xml: &str) -> Result<Vec<SearchHit>> {
    let feed: AtomFeed = quick_xml::de::from_str(xml).context("Malformed arXiv Atom feed")?;

    // arXiv 以一个特殊条目报告查询错误
    if let Some(error_entry) = feed
        .entries
        .iter()
        .find(|entry| entry.id.contains("/api/errors"))
    {
        bail!("arXiv rejected the query: {}", error_entry.summary.trim());
    }

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| SearchHit {
            title: entry.title,
            summary: entry.summary,
            authors: entry.authors.into_iter().map(|author| author.name).collect(),
            published: entry.published,
            id: entry.id,
        })
        .collect())
}
