use std::path::PathBuf;

/// 流水线各阶段的错误类型
///
/// 除 `Synthesis` 中的单章节失败可被编排器降级为占位正文外，其余错误都会使本次运行进入 `Failed` 状态。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    #[error("literature retrieval failed: {0}")]
    Retrieval(String),

    #[error("experimental data analysis failed: {0}")]
    Analysis(String),

    #[error("outline construction failed: {0}")]
    Outline(String),

    #[error("content synthesis failed for `{section}`: {message}")]
    Synthesis { section: String, message: String },

    #[error("document assembly failed: {0}")]
    Assembly(String),

    #[error("failed to write {path}: {message}")]
    Serialization { path: PathBuf, message: String },

    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// 以 anyhow 错误链构造检索错误
    pub fn retrieval(err: &anyhow::Error) -> Self {
        PipelineError::Retrieval(format!("{:#}", err))
    }

    /// 以 anyhow 错误链构造单章节生成错误
    pub fn synthesis(section: &str, err: &anyhow::Error) -> Self {
        PipelineError::Synthesis {
            section: section.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        PipelineError::Serialization {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
