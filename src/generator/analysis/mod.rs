use std::path::Path;

use serde_json::Value;

use crate::error::{PipelineError, PipelineResult};
use crate::generator::context::GeneratorContext;
use crate::types::{AnalysisResult, ExperimentalData};

pub mod chart;
pub mod significance;

pub use chart::{ChartRenderer, Figure, PanelKind, SvgChartRenderer};
pub use significance::{PlaceholderSignificance, SignificanceTest, WelchTTest};

/// 实验数据分析器：统计汇总与可视化
#[derive(Default)]
pub struct AnalysisAgent;

impl AnalysisAgent {
    /// 计算性能均值/标准差、相对基线的提升与显著性
    ///
    /// 任一统计量不是有限值时返回分析错误，JSON 快照无法表示 inf/NaN。
    pub fn analyze_results(
        &self,
        context: &GeneratorContext,
        data: &ExperimentalData,
    ) -> PipelineResult<AnalysisResult> {
        let performance = data.performance();
        let significance = context.significance.as_ref();
        if significance.is_placeholder() {
            tracing::warn!(
                "⚠️ 显著性检验策略 `{}` 为占位实现，p 值不是真实检验结果",
                significance.name()
            );
        }

        let result = AnalysisResult {
            mean_performance: mean(performance),
            std_performance: std_dev(performance),
            improvement_over_baseline: calculate_improvement(data.baseline(), data.results()),
            statistical_significance: significance.evaluate(data.results(), data.baseline()),
        };
        ensure_finite(&result)?;
        tracing::debug!("📊 分析结果: {}", result);
        Ok(result)
    }

    /// 在内存中渲染图表，不写入磁盘
    pub fn render_visualizations(
        &self,
        context: &GeneratorContext,
        data: &ExperimentalData,
    ) -> PipelineResult<Figure> {
        let figure = context.chart_renderer.render(data)?;
        tracing::debug!(
            "🖼️ 图表渲染完成，有数据的面板: {:?}",
            figure.populated_panels
        );
        Ok(figure)
    }

    /// 渲染图表并写入输出目录，返回图表路径
    pub fn generate_visualizations(
        &self,
        context: &GeneratorContext,
        data: &ExperimentalData,
        output_dir: &Path,
    ) -> PipelineResult<std::path::PathBuf> {
        let figure = self.render_visualizations(context, data)?;
        std::fs::create_dir_all(output_dir)
            .map_err(|e| PipelineError::serialization(output_dir, e))?;
        figure.persist(output_dir)
    }
}

/// 从 JSON 文件加载实验数据
pub fn load_experimental_data(path: &Path) -> PipelineResult<ExperimentalData> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Analysis(format!(
            "failed to read experimental data {}: {}",
            path.display(),
            e
        ))
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        PipelineError::Analysis(format!(
            "experimental data {} is not valid JSON: {}",
            path.display(),
            e
        ))
    })?;
    ExperimentalData::from_value(value)
}

/// 算术平均；空序列为 0
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum = values.iter().sum::<f64>();
    if sum.is_finite() {
        return sum / n;
    }
    // 求和溢出时先缩放再累加
    values.iter().map(|v| v / n).sum()
}

/// 总体标准差（ddof = 0）；空序列为 0
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    if variance.is_finite() {
        return variance.sqrt();
    }

    // 平方溢出时按最大绝对值归一化，结果不超过该值
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let scaled = values.iter().map(|v| v / scale).collect::<Vec<_>>();
    scale * std_dev(&scaled)
}

/// 样本方差（ddof = 1）；少于 2 个样本时为 0
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// 相对基线均值的提升百分比；任一序列为空或基线均值为 0 时为 0
pub fn calculate_improvement(baseline: &[f64], results: &[f64]) -> f64 {
    if baseline.is_empty() || results.is_empty() {
        return 0.0;
    }
    let baseline_mean = mean(baseline);
    if baseline_mean == 0.0 {
        return 0.0;
    }
    (mean(results) - baseline_mean) / baseline_mean * 100.0
}

fn ensure_finite(result: &AnalysisResult) -> PipelineResult<()> {
    let fields = [
        ("mean_performance", result.mean_performance),
        ("std_performance", result.std_performance),
        ("improvement_over_baseline", result.improvement_over_baseline),
        ("p_value", result.statistical_significance.p_value),
    ];
    match fields.iter().find(|(_, value)| !value.is_finite()) {
        Some((name, value)) => Err(PipelineError::Analysis(format!(
            "{} is not a finite number ({})",
            name, value
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests;
