use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::generator::analysis::chart::{ChartRenderer, SvgChartRenderer};
use crate::generator::analysis::significance::{SignificanceTest, strategy_for};
use crate::generator::literature::{ArxivSource, LiteratureSource};
use crate::llm::TextGenerator;
use crate::llm::client::LLMClient;

/// 生成器上下文：配置与各外部服务能力
#[derive(Clone)]
pub struct GeneratorContext {
    /// 配置
    pub config: Config,
    /// 文献检索服务
    pub literature_source: Arc<dyn LiteratureSource>,
    /// 文本生成服务
    pub text_generator: Arc<dyn TextGenerator>,
    /// 图表渲染服务
    pub chart_renderer: Arc<dyn ChartRenderer>,
    /// 显著性检验策略
    pub significance: Arc<dyn SignificanceTest>,
}

impl GeneratorContext {
    /// 使用真实的 arXiv 与 LLM 服务创建上下文
    pub fn new(config: Config) -> Result<Self> {
        let literature_source = Arc::new(ArxivSource::new(&config.retrieval)?);
        let text_generator = Arc::new(LLMClient::new(
            &config.llm,
            &config.composition.system_prompt,
        )?);
        Ok(Self::with_services(config, literature_source, text_generator))
    }

    /// 使用给定的检索与文本生成服务创建上下文，图表与显著性检验按配置选择默认实现
    pub fn with_services(
        config: Config,
        literature_source: Arc<dyn LiteratureSource>,
        text_generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let significance = strategy_for(&config.analysis);
        let chart_renderer = Arc::new(SvgChartRenderer::new(&config.outlet.figure_file));
        Self {
            config,
            literature_source,
            text_generator,
            chart_renderer,
            significance,
        }
    }

    pub fn with_chart_renderer(mut self, chart_renderer: Arc<dyn ChartRenderer>) -> Self {
        self.chart_renderer = chart_renderer;
        self
    }

    pub fn with_significance(mut self, significance: Arc<dyn SignificanceTest>) -> Self {
        self.significance = significance;
        self
    }
}
