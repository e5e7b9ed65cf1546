use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::error::PipelineError;
use crate::generator::analysis::Figure;
use crate::types::{
    AnalysisResult, Document, ExperimentalData, GeneratedSection, LiteratureReview,
    SectionOutline,
};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    LiteratureSearch,
    Analysis,
    Outline,
    Synthesis,
    Assemble,
    Serialize,
    Done,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::LiteratureSearch => "literature_search",
            Stage::Analysis => "analysis",
            Stage::Outline => "outline",
            Stage::Synthesis => "synthesis",
            Stage::Assemble => "assemble",
            Stage::Serialize => "serialize",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// 实验数据来源
#[derive(Debug, Clone, Default)]
pub enum ExperimentalInput {
    /// 无实验数据，按空对象分析
    #[default]
    None,
    /// JSON 文件
    Path(PathBuf),
    /// 已解析的 JSON 值
    Inline(Value),
}

/// 一次运行的输入
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub topic: String,
    pub experimental_data: ExperimentalInput,
    pub output_dir: PathBuf,
}

impl RunRequest {
    pub fn new(topic: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            topic: topic.into(),
            experimental_data: ExperimentalInput::None,
            output_dir: output_dir.into(),
        }
    }

    /// 输出目录与实验数据路径取自配置
    pub fn from_config(topic: impl Into<String>, config: &Config) -> Self {
        let experimental_data = match &config.experimental_data_path {
            Some(path) => ExperimentalInput::Path(path.clone()),
            None => ExperimentalInput::None,
        };
        Self {
            topic: topic.into(),
            experimental_data,
            output_dir: config.output_path.clone(),
        }
    }

    pub fn with_experimental_data(mut self, input: ExperimentalInput) -> Self {
        self.experimental_data = input;
        self
    }
}

/// Init 之后：主题已校验
#[derive(Debug, Clone)]
pub struct Initialized {
    pub run_id: Uuid,
    pub request: RunRequest,
}

/// LiteratureSearch 之后
#[derive(Debug, Clone)]
pub struct Researched {
    pub initialized: Initialized,
    pub review: LiteratureReview,
}

/// Analysis 之后；图表仅在内存中
#[derive(Debug, Clone)]
pub struct Analyzed {
    pub researched: Researched,
    pub data: ExperimentalData,
    pub analysis: AnalysisResult,
    pub figure: Figure,
}

/// Outline 之后
#[derive(Debug, Clone)]
pub struct Outlined {
    pub analyzed: Analyzed,
    pub outline: SectionOutline,
}

/// Synthesis 之后：失败章节已替换为占位正文
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub outlined: Outlined,
    pub abstract_text: String,
    /// 与大纲一一对应
    pub sections: Vec<GeneratedSection>,
    pub failed_sections: Vec<String>,
}

/// Assemble 之后
#[derive(Debug, Clone)]
pub struct Assembled {
    pub synthesized: Synthesized,
    pub document: Document,
}

/// 状态机；每个非终止状态以即将执行的阶段命名，并携带之前各阶段的产出
#[derive(Debug)]
pub enum PipelineState {
    Init(RunRequest),
    LiteratureSearch(Initialized),
    Analysis(Researched),
    Outline(Analyzed),
    Synthesis(Outlined),
    Assemble(Synthesized),
    Serialize(Box<Assembled>),
    Done(Box<RunReport>),
    Failed(Box<RunFailure>),
}

impl PipelineState {
    /// 当前所处阶段；`Failed` 返回失败的阶段
    pub fn stage(&self) -> Stage {
        match self {
            PipelineState::Init(_) => Stage::Init,
            PipelineState::LiteratureSearch(_) => Stage::LiteratureSearch,
            PipelineState::Analysis(_) => Stage::Analysis,
            PipelineState::Outline(_) => Stage::Outline,
            PipelineState::Synthesis(_) => Stage::Synthesis,
            PipelineState::Assemble(_) => Stage::Assemble,
            PipelineState::Serialize(_) => Stage::Serialize,
            PipelineState::Done(_) => Stage::Done,
            PipelineState::Failed(failure) => failure.stage,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done(_) | PipelineState::Failed(_))
    }
}

/// 成功运行的报告
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub document: Document,
    /// 写入的文件，按写入顺序
    pub written: Vec<PathBuf>,
    /// 生成失败、以占位正文代替的章节
    pub failed_sections: Vec<String>,
    pub stage_durations: Vec<(Stage, Duration)>,
    pub total_duration: Duration,
}

/// 失败运行的报告；序列化阶段失败时保留内存中的文档
#[derive(Debug, thiserror::Error)]
#[error("stage {stage} failed: {error}")]
pub struct RunFailure {
    pub stage: Stage,
    pub error: PipelineError,
    pub document: Option<Box<Document>>,
}

impl RunFailure {
    pub fn new(stage: Stage, error: PipelineError) -> Self {
        Self {
            stage,
            error,
            document: None,
        }
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(Box::new(document));
        self
    }
}
