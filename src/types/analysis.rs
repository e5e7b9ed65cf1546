use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error::{PipelineError, PipelineResult};

/// 外部提供的实验数据
///
/// 所有已知字段均可缺省，缺省的序列按空序列参与分析；未知字段原样保留，仅用于章节生成时的数据摘录。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence: Option<Vec<f64>>,

    /// 方法名 -> 该方法的结果序列
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<BTreeMap<String, Vec<f64>>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ExperimentalData {
    /// 从JSON值解析实验数据，形状不合法时返回分析错误
    pub fn from_value(value: Value) -> PipelineResult<Self> {
        if !value.is_object() {
            return Err(PipelineError::Analysis(format!(
                "experimental data must be a JSON object, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| PipelineError::Analysis(format!("malformed experimental data: {}", e)))
    }

    pub fn performance(&self) -> &[f64] {
        self.performance.as_deref().unwrap_or(&[])
    }

    pub fn baseline(&self) -> &[f64] {
        self.baseline.as_deref().unwrap_or(&[])
    }

    pub fn results(&self) -> &[f64] {
        self.results.as_deref().unwrap_or(&[])
    }

    pub fn convergence(&self) -> &[f64] {
        self.convergence.as_deref().unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.performance.is_none()
            && self.baseline.is_none()
            && self.results.is_none()
            && self.convergence.is_none()
            && self.comparison.is_none()
            && self.extra.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// 显著性检验结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSignificance {
    pub p_value: f64,
    pub significant: bool,
}

/// 实验数据的统计分析结果，每次运行只计算一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub mean_performance: f64,
    pub std_performance: f64,
    /// 相对基线的提升百分比
    pub improvement_over_baseline: f64,
    pub statistical_significance: StatisticalSignificance,
}

impl Display for AnalysisResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mean performance {:.4} (std {:.4}), improvement over baseline {:.2}%, p-value {:.4} ({})",
            self.mean_performance,
            self.std_performance,
            self.improvement_over_baseline,
            self.statistical_significance.p_value,
            if self.statistical_significance.significant {
                "significant"
            } else {
                "not significant"
            }
        )
    }
}
