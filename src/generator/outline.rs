use crate::config::{OutlineConfig, OutlineSection};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{AnalysisResult, SectionMap, SectionOutline};
use crate::utils::template::render_template;

/// 大纲构建器：按配置的章节顺序生成章节名与种子上下文
pub struct OutlineBuilder {
    sections: Vec<OutlineSection>,
}

impl OutlineBuilder {
    pub fn new(config: &OutlineConfig) -> Self {
        Self {
            sections: config.sections.clone(),
        }
    }

    /// 生成论文大纲
    ///
    /// 种子文本中的 `{topic}`、`{literature_analysis}`、`{analysis}` 只替换一次，
    /// 替换进来的文本即使包含占位符形式的内容也原样保留。
    pub fn build(
        &self,
        topic: &str,
        literature_analysis: &str,
        analysis: &AnalysisResult,
    ) -> PipelineResult<SectionOutline> {
        if topic.trim().is_empty() {
            return Err(PipelineError::Outline("topic must not be empty".to_string()));
        }
        if self.sections.is_empty() {
            return Err(PipelineError::Outline(
                "outline must contain at least one section".to_string(),
            ));
        }

        let analysis_summary = analysis.to_string();
        let values = [
            ("topic", topic),
            ("literature_analysis", literature_analysis),
            ("analysis", analysis_summary.as_str()),
        ];

        let mut sections = SectionMap::new();
        for section in &self.sections {
            let title = section.title.trim();
            if title.is_empty() {
                return Err(PipelineError::Outline(
                    "section titles must not be empty".to_string(),
                ));
            }
            if !sections.try_insert(title, render_template(&section.seed, &values)) {
                return Err(PipelineError::Outline(format!(
                    "duplicate section `{}`",
                    title
                )));
            }
        }

        tracing::debug!("🗂️ 大纲包含 {} 个章节", sections.len());
        Ok(SectionOutline::from_sections(sections))
    }
}
