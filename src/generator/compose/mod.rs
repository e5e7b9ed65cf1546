use std::fmt::Display;

use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, PipelineResult};
use crate::generator::context::GeneratorContext;
use crate::llm::GenerationRequest;
use crate::types::{AnalysisResult, ExperimentalData, SectionOutline};
use crate::utils::template::{render_template, truncate_chars};
use crate::utils::threads::do_parallel_with_limit;

/// 一次生成调用的目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeTarget {
    Abstract,
    Section(String),
}

impl Display for ComposeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComposeTarget::Abstract => write!(f, "abstract"),
            ComposeTarget::Section(title) => write!(f, "{}", title),
        }
    }
}

/// 内容生成阶段的全部结果，章节顺序与大纲一致
#[derive(Debug)]
pub struct SynthesisOutcome {
    pub abstract_text: PipelineResult<String>,
    pub sections: Vec<(String, PipelineResult<String>)>,
}

/// 内容生成器：生成摘要与各章节正文
#[derive(Default)]
pub struct ContentComposer;

impl ContentComposer {
    /// 论文标题
    pub fn title(&self, context: &GeneratorContext, topic: &str) -> String {
        render_template(
            &context.config.composition.title_template,
            &[("topic", topic)],
        )
    }

    /// 摘要生成时使用的研究概要
    pub fn research_summary(
        &self,
        context: &GeneratorContext,
        topic: &str,
        analysis: &AnalysisResult,
    ) -> String {
        render_template(
            &context.config.composition.summary_template,
            &[("topic", topic), ("analysis", &analysis.to_string())],
        )
    }

    /// 实验数据的JSON摘录（缩进格式），按字符截断
    pub fn data_excerpt(&self, data: &ExperimentalData, max_chars: usize) -> String {
        let json = serde_json::to_string_pretty(data).unwrap_or_default();
        truncate_chars(&json, max_chars).to_string()
    }

    pub async fn generate_abstract(
        &self,
        context: &GeneratorContext,
        topic: &str,
        summary: &str,
        keywords: &[String],
    ) -> PipelineResult<String> {
        let request = self.abstract_request(context, topic, summary, keywords);
        self.complete(context, ComposeTarget::Abstract, request)
            .await
    }

    pub async fn generate_section(
        &self,
        context: &GeneratorContext,
        topic: &str,
        title: &str,
        section_context: &str,
        data_excerpt: &str,
    ) -> PipelineResult<String> {
        let request = self.section_request(context, topic, title, section_context, data_excerpt);
        self.complete(context, ComposeTarget::Section(title.to_string()), request)
            .await
    }

    /// 并发生成摘要与所有章节，并发数受 `llm.max_parallels` 限制
    ///
    /// 单个章节失败只影响该章节的结果；取消时立即返回 `Cancelled`，已发出的请求随之丢弃。
    pub async fn compose_all(
        &self,
        context: &GeneratorContext,
        topic: &str,
        outline: &SectionOutline,
        data: &ExperimentalData,
        analysis: &AnalysisResult,
        cancel: &CancellationToken,
    ) -> PipelineResult<SynthesisOutcome> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let composition = &context.config.composition;
        let summary = self.research_summary(context, topic, analysis);
        let excerpt = self.data_excerpt(data, composition.data_excerpt_chars);
        // 主题本身作为第一个关键词
        let keywords = std::iter::once(topic.to_string())
            .chain(composition.keywords.iter().cloned())
            .collect::<Vec<_>>();

        let mut calls = vec![(
            ComposeTarget::Abstract,
            self.abstract_request(context, topic, &summary, &keywords),
        )];
        for (title, section_context) in outline.iter() {
            calls.push((
                ComposeTarget::Section(title.to_string()),
                self.section_request(context, topic, title, section_context, &excerpt),
            ));
        }

        tracing::info!(
            "✍️ 开始并发生成摘要与 {} 个章节（并发上限 {}）",
            outline.len(),
            context.config.llm.max_parallels
        );

        let futures = calls
            .into_iter()
            .map(|(target, request)| async move {
                let result = self.complete(context, target.clone(), request).await;
                (target, result)
            })
            .collect::<Vec<_>>();

        let results = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!("🛑 内容生成被取消");
                return Err(PipelineError::Cancelled);
            }
            results = do_parallel_with_limit(futures, context.config.llm.max_parallels) => results,
        };

        let mut abstract_text = Err(PipelineError::Synthesis {
            section: ComposeTarget::Abstract.to_string(),
            message: "abstract was not generated".to_string(),
        });
        let mut sections = Vec::with_capacity(outline.len());
        for (target, result) in results {
            match target {
                ComposeTarget::Abstract => abstract_text = result,
                ComposeTarget::Section(title) => sections.push((title, result)),
            }
        }

        Ok(SynthesisOutcome {
            abstract_text,
            sections,
        })
    }

    fn abstract_request(
        &self,
        context: &GeneratorContext,
        topic: &str,
        summary: &str,
        keywords: &[String],
    ) -> GenerationRequest {
        let composition = &context.config.composition;
        let prompt = render_template(
            &composition.abstract_template,
            &[
                ("topic", topic),
                ("summary", summary),
                ("keywords", &keywords.join(", ")),
            ],
        );
        GenerationRequest::new(prompt, composition.abstract_max_tokens)
    }

    fn section_request(
        &self,
        context: &GeneratorContext,
        topic: &str,
        title: &str,
        section_context: &str,
        data_excerpt: &str,
    ) -> GenerationRequest {
        let composition = &context.config.composition;
        let prompt = render_template(
            &composition.section_template,
            &[
                ("section", title),
                ("topic", topic),
                ("context", section_context),
                ("data", data_excerpt),
            ],
        );
        GenerationRequest::new(prompt, composition.section_max_tokens)
    }

    /// 执行一次生成；空文本视为失败
    async fn complete(
        &self,
        context: &GeneratorContext,
        target: ComposeTarget,
        request: GenerationRequest,
    ) -> PipelineResult<String> {
        let label = target.to_string();
        match context.text_generator.generate(request).await {
            Ok(text) if !text.trim().is_empty() => {
                tracing::debug!("✅ 已生成 {}", label);
                Ok(text)
            }
            Ok(_) => {
                tracing::warn!("⚠️ {} 的生成结果为空", label);
                Err(PipelineError::Synthesis {
                    section: label,
                    message: "model returned empty text".to_string(),
                })
            }
            Err(e) => {
                tracing::warn!("⚠️ {} 生成失败: {:#}", label, e);
                Err(PipelineError::synthesis(&label, &e))
            }
        }
    }
}
