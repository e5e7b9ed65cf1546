//! 显著性检验策略

use std::f64::consts::PI;
use std::sync::Arc;

use super::{mean, sample_variance};
use crate::config::{AnalysisConfig, SignificanceMethod};
use crate::types::StatisticalSignificance;

/// 由 (results, baseline) 给出显著性结论的可替换策略
pub trait SignificanceTest: Send + Sync {
    fn name(&self) -> &'static str;

    /// 是否为占位实现（结果与输入无关）
    fn is_placeholder(&self) -> bool {
        false
    }

    fn evaluate(&self, results: &[f64], baseline: &[f64]) -> StatisticalSignificance;
}

/// 根据配置选择显著性检验策略
pub fn strategy_for(config: &AnalysisConfig) -> Arc<dyn SignificanceTest> {
    match config.significance {
        SignificanceMethod::Placeholder => Arc::new(PlaceholderSignificance),
        SignificanceMethod::Welch => Arc::new(WelchTTest::new(config.alpha)),
    }
}

/// 占位策略：始终返回 {p_value: 0.05, significant: true}，不是真实的统计检验
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderSignificance;

impl SignificanceTest for PlaceholderSignificance {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn is_placeholder(&self) -> bool {
        true
    }

    fn evaluate(&self, _results: &[f64], _baseline: &[f64]) -> StatisticalSignificance {
        StatisticalSignificance {
            p_value: 0.05,
            significant: true,
        }
    }
}

/// Welch 双样本 t 检验（双侧，不假设方差齐性）
#[derive(Debug, Clone, Copy)]
pub struct WelchTTest {
    alpha: f64,
}

impl WelchTTest {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// 双侧 p 值；任一侧样本少于 2 个时返回 1.0
    pub fn p_value(results: &[f64], baseline: &[f64]) -> f64 {
        if results.len() < 2 || baseline.len() < 2 {
            return 1.0;
        }

        let (n1, n2) = (results.len() as f64, baseline.len() as f64);
        let (m1, m2) = (mean(results), mean(baseline));
        let (q1, q2) = (
            sample_variance(results) / n1,
            sample_variance(baseline) / n2,
        );
        let standard_error = (q1 + q2).sqrt();

        if standard_error == 0.0 {
            return if m1 == m2 { 1.0 } else { 0.0 };
        }

        let t = (m1 - m2) / standard_error;
        let df = (q1 + q2).powi(2) / (q1.powi(2) / (n1 - 1.0) + q2.powi(2) / (n2 - 1.0));

        regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
    }
}

impl SignificanceTest for WelchTTest {
    fn name(&self) -> &'static str {
        "welch"
    }

    fn evaluate(&self, results: &[f64], baseline: &[f64]) -> StatisticalSignificance {
        let p_value = Self::p_value(results, baseline);
        StatisticalSignificance {
            p_value,
            significant: p_value < self.alpha,
        }
    }
}

/// Lanczos 近似的 ln Γ(x)
fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // 反射公式
        PI.ln() - (PI * x).sin().ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let t = x + 7.5;
        let mut a = COEFFS[0];
        for (i, coeff) in COEFFS.iter().enumerate().skip(1) {
            a += coeff / (x + i as f64);
        }
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
    }
}

/// 正则化不完全 Beta 函数 I_x(a, b)
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let front = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b)
        + a * x.ln()
        + b * (1.0 - x).ln())
    .exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// 不完全 Beta 函数的连分式展开（修正 Lentz 算法）
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPSILON: f64 = 3e-14;
    const TINY: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let (qab, qap, qam) = (a + b, a + 1.0, a - 1.0);
    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let even = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + even * d);
        c = guard(1.0 + even / c);
        h *= d * c;

        let odd = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + odd * d);
        c = guard(1.0 + odd / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    h
}
