//! 实验结果图表渲染

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::ExperimentalData;

use super::mean;

const FIGURE_WIDTH: f64 = 1500.0;
const FIGURE_HEIGHT: f64 = 1200.0;
const PANEL_WIDTH: f64 = FIGURE_WIDTH / 2.0;
const PANEL_HEIGHT: f64 = FIGURE_HEIGHT / 2.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 70.0;
const HISTOGRAM_BINS: usize = 20;

/// 2×2 图表中的面板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PanelKind {
    /// 左上：性能曲线
    Performance,
    /// 右上：结果分布直方图
    Distribution,
    /// 左下：收敛曲线
    Convergence,
    /// 右下：各方法均值对比
    Comparison,
}

impl PanelKind {
    const ALL: [PanelKind; 4] = [
        PanelKind::Performance,
        PanelKind::Distribution,
        PanelKind::Convergence,
        PanelKind::Comparison,
    ];

    fn title(&self) -> &'static str {
        match self {
            PanelKind::Performance => "Performance Over Time",
            PanelKind::Distribution => "Results Distribution",
            PanelKind::Convergence => "Convergence Analysis",
            PanelKind::Comparison => "Method Comparison",
        }
    }

    /// 面板左上角坐标
    fn origin(&self) -> (f64, f64) {
        match self {
            PanelKind::Performance => (0.0, 0.0),
            PanelKind::Distribution => (PANEL_WIDTH, 0.0),
            PanelKind::Convergence => (0.0, PANEL_HEIGHT),
            PanelKind::Comparison => (PANEL_WIDTH, PANEL_HEIGHT),
        }
    }
}

/// 渲染完成但尚未落盘的图表
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub file_name: String,
    pub content: String,
    /// 有数据的面板；缺失数据的面板留空
    pub populated_panels: Vec<PanelKind>,
}

impl Figure {
    pub fn path_in(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.file_name)
    }

    /// 写入输出目录，返回写入路径
    pub fn persist(&self, output_dir: &Path) -> PipelineResult<PathBuf> {
        let path = self.path_in(output_dir);
        std::fs::write(&path, &self.content)
            .map_err(|e| PipelineError::serialization(&path, e))?;
        Ok(path)
    }
}

/// 图表渲染能力
pub trait ChartRenderer: Send + Sync {
    fn render(&self, data: &ExperimentalData) -> PipelineResult<Figure>;
}

/// 以 SVG 渲染 2×2 的实验结果图表
pub struct SvgChartRenderer {
    file_name: String,
}

impl SvgChartRenderer {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
        }
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, data: &ExperimentalData) -> PipelineResult<Figure> {
        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">\n",
            w = FIGURE_WIDTH,
            h = FIGURE_HEIGHT
        ));
        svg.push_str(&format!(
            "<rect width=\"{}\" height=\"{}\" fill=\"white\"/>\n",
            FIGURE_WIDTH, FIGURE_HEIGHT
        ));

        let mut populated_panels = Vec::new();
        for panel in PanelKind::ALL {
            let frame = PanelFrame::new(panel);
            svg.push_str(&format!("<g id=\"{:?}\">\n", panel));
            svg.push_str(&frame.axes());

            let body = match panel {
                PanelKind::Performance => line_series(&frame, data.performance(), Some("Ours")),
                PanelKind::Distribution => histogram(&frame, data.results()),
                PanelKind::Convergence => line_series(&frame, data.convergence(), None),
                PanelKind::Comparison => comparison_bars(&frame, data),
            };

            if let Some(body) = body {
                svg.push_str(&frame.title(panel.title()));
                svg.push_str(&body);
                populated_panels.push(panel);
            }
            svg.push_str("</g>\n");
        }
        svg.push_str("</svg>\n");

        Ok(Figure {
            file_name: self.file_name.clone(),
            content: svg,
            populated_panels,
        })
    }
}

/// 面板内的绘图区域
struct PanelFrame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl PanelFrame {
    fn new(panel: PanelKind) -> Self {
        let (x, y) = panel.origin();
        Self {
            left: x + MARGIN_LEFT,
            top: y + MARGIN_TOP,
            width: PANEL_WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
            height: PANEL_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM,
        }
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn axes(&self) -> String {
        format!(
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"none\" stroke=\"#333\"/>\n",
            self.left, self.top, self.width, self.height
        )
    }

    fn title(&self, title: &str) -> String {
        format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"20\">{}</text>\n",
            self.left + self.width / 2.0,
            self.top - 20.0,
            escape_xml(title)
        )
    }

    /// 纵轴的最小/最大值刻度
    fn y_labels(&self, range: &Range) -> String {
        format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"12\">{}</text>\n<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"12\">{}</text>\n",
            self.left - 8.0,
            self.bottom(),
            format_tick(range.min),
            self.left - 8.0,
            self.top + 12.0,
            format_tick(range.max)
        )
    }

    fn x_at(&self, fraction: f64) -> f64 {
        self.left + fraction * self.width
    }

    fn y_at(&self, range: &Range, value: f64) -> f64 {
        self.bottom() - range.fraction(value) * self.height
    }
}

/// 数值区间；退化区间向两侧扩展，避免除零
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn of(values: &[f64]) -> Option<Self> {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        if min == max {
            return Some(Self {
                min: min - 0.5,
                max: max + 0.5,
            });
        }
        Some(Self { min, max })
    }

    /// 按半值计算，避免跨度超出 f64 范围
    fn fraction(&self, value: f64) -> f64 {
        let span = self.max / 2.0 - self.min / 2.0;
        if span == 0.0 {
            return 0.5;
        }
        (value / 2.0 - self.min / 2.0) / span
    }
}

fn line_series(frame: &PanelFrame, values: &[f64], legend: Option<&str>) -> Option<String> {
    let range = Range::of(values)?;
    let steps = (values.len().max(2) - 1) as f64;
    let points = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            format!(
                "{:.1},{:.1}",
                frame.x_at(i as f64 / steps),
                frame.y_at(&range, *v)
            )
        })
        .collect::<Vec<_>>();

    let mut out = frame.y_labels(&range);
    if points.len() == 1 {
        let (x, y) = (frame.x_at(0.0), frame.y_at(&range, values[0]));
        out.push_str(&format!(
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"#1f77b4\"/>\n",
            x, y
        ));
    } else {
        out.push_str(&format!(
            "<polyline points=\"{}\" fill=\"none\" stroke=\"#1f77b4\" stroke-width=\"2\"/>\n",
            points.join(" ")
        ));
    }

    if let Some(label) = legend {
        let (x, y) = (frame.left + frame.width - 110.0, frame.top + 20.0);
        out.push_str(&format!(
            "<line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#1f77b4\" stroke-width=\"2\"/>\n<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"14\">{}</text>\n",
            x,
            y,
            x + 30.0,
            y,
            x + 38.0,
            y + 5.0,
            escape_xml(label)
        ));
    }
    Some(out)
}

fn histogram(frame: &PanelFrame, values: &[f64]) -> Option<String> {
    let range = Range::of(values)?;
    let mut counts = [0usize; HISTOGRAM_BINS];
    for value in values {
        let bin = (range.fraction(*value) * HISTOGRAM_BINS as f64) as usize;
        counts[bin.min(HISTOGRAM_BINS - 1)] += 1;
    }

    let peak = counts.iter().copied().max().unwrap_or(1).max(1) as f64;
    let bin_width = frame.width / HISTOGRAM_BINS as f64;
    let mut out = String::new();
    for (i, count) in counts.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let height = *count as f64 / peak * frame.height;
        out.push_str(&format!(
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"#1f77b4\" fill-opacity=\"0.7\" stroke=\"white\"/>\n",
            frame.left + i as f64 * bin_width,
            frame.bottom() - height,
            bin_width,
            height
        ));
    }
    out.push_str(&format!(
        "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\">{}</text>\n<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"12\">{}</text>\n",
        frame.left,
        frame.bottom() + 18.0,
        format_tick(range.min),
        frame.left + frame.width,
        frame.bottom() + 18.0,
        format_tick(range.max)
    ));
    Some(out)
}

/// 每个方法一根柱子，高度为该方法结果的均值
fn comparison_bars(frame: &PanelFrame, data: &ExperimentalData) -> Option<String> {
    let comparison = data.comparison.as_ref().filter(|c| !c.is_empty())?;
    let means: Vec<(&str, f64)> = comparison
        .iter()
        .map(|(name, values)| (name.as_str(), mean(values)))
        .collect();

    // 柱子从 0 起画
    let low = means.iter().map(|(_, m)| *m).fold(0.0, f64::min);
    let high = means.iter().map(|(_, m)| *m).fold(0.0, f64::max);
    let range = Range::of(&[low, high])?;
    let zero_y = frame.y_at(&range, 0.0);

    let slot = frame.width / means.len() as f64;
    let mut out = frame.y_labels(&range);
    for (i, (name, value)) in means.iter().enumerate() {
        let y = frame.y_at(&range, *value);
        let x = frame.left + i as f64 * slot + slot * 0.15;
        out.push_str(&format!(
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"#ff7f0e\"/>\n",
            x,
            y.min(zero_y),
            slot * 0.7,
            (zero_y - y).abs()
        ));
        out.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"13\">{}</text>\n",
            x + slot * 0.35,
            frame.bottom() + 20.0,
            escape_xml(name)
        ));
    }
    Some(out)
}

fn format_tick(value: f64) -> String {
    format!("{:.3}", value)
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
