#[cfg(test)]
mod tests {
    use crate::config::{Config, SignificanceMethod};
    use crate::error::PipelineError;
    use crate::generator::analysis::{
        AnalysisAgent, ChartRenderer, PanelKind, SvgChartRenderer, calculate_improvement,
        load_experimental_data, mean, std_dev,
    };
    use crate::generator::context::GeneratorContext;
    use crate::stubs::{StubLiteratureSource, StubTextGenerator};
    use crate::types::ExperimentalData;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_context(config: Config) -> GeneratorContext {
        GeneratorContext::with_services(
            config,
            Arc::new(StubLiteratureSource::default()),
            Arc::new(StubTextGenerator::new()),
        )
    }

    fn data(value: serde_json::Value) -> ExperimentalData {
        ExperimentalData::from_value(value).unwrap()
    }

    #[test]
    fn test_performance_only() {
        let context = create_test_context(Config::default());
        let data = data(json!({"performance": [0.8, 0.82, 0.79]}));

        let result = AnalysisAgent.analyze_results(&context, &data).unwrap();
        assert!((result.mean_performance - 0.80333).abs() < 1e-4);
        assert!((result.std_performance - 0.012472).abs() < 1e-5);
        assert_eq!(result.improvement_over_baseline, 0.0);

        let figure = AnalysisAgent.render_visualizations(&context, &data).unwrap();
        assert_eq!(figure.populated_panels, vec![PanelKind::Performance]);
    }

    #[test]
    fn test_empty_data_yields_zeros() {
        let context = create_test_context(Config::default());
        let result = AnalysisAgent
            .analyze_results(&context, &ExperimentalData::default())
            .unwrap();

        assert_eq!(result.mean_performance, 0.0);
        assert_eq!(result.std_performance, 0.0);
        assert_eq!(result.improvement_over_baseline, 0.0);
        // 占位策略
        assert_eq!(result.statistical_significance.p_value, 0.05);
        assert!(result.statistical_significance.significant);
    }

    #[test]
    fn test_huge_values_stay_finite() {
        let context = create_test_context(Config::default());
        let data = data(json!({
            "performance": [1e308, 1e308],
            "baseline": [1e308, 1e308],
            "results": [1.0],
        }));

        let result = AnalysisAgent.analyze_results(&context, &data).unwrap();
        assert_eq!(result.mean_performance, 1e308);
        assert_eq!(result.std_performance, 0.0);
        assert!((result.improvement_over_baseline + 100.0).abs() < 1e-9);

        let spread = std_dev(&[1e308, -1e308]);
        assert!((spread - 1e308).abs() / 1e308 < 1e-12);
        assert_eq!(mean(&[1e308, -1e308, 1e308, -1e308]), 0.0);

        let figure = AnalysisAgent.render_visualizations(&context, &data).unwrap();
        assert!(!figure.content.contains("NaN"));
        assert!(!figure.content.contains("inf"));
    }

    #[test]
    fn test_non_finite_improvement_is_analysis_error() {
        let context = create_test_context(Config::default());
        let data = data(json!({
            "baseline": [5e-324, 5e-324],
            "results": [1.0],
        }));

        let err = AnalysisAgent.analyze_results(&context, &data).unwrap_err();
        assert!(matches!(err, PipelineError::Analysis(_)));
        assert!(err.to_string().contains("improvement_over_baseline"));
    }

    #[test]
    fn test_improvement_over_baseline() {
        let improvement = calculate_improvement(&[0.5, 0.5], &[0.6, 0.6]);
        assert!((improvement - 20.0).abs() < 1e-9);

        let regression = calculate_improvement(&[0.8], &[0.6]);
        assert!((regression + 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_improvement_degenerate_inputs() {
        assert_eq!(calculate_improvement(&[], &[0.6]), 0.0);
        assert_eq!(calculate_improvement(&[0.5], &[]), 0.0);
        assert_eq!(calculate_improvement(&[0.0, 0.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_statistics_helpers() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[3.0]), 0.0);
        assert!((mean(&[1.0, 2.0, 3.0, 4.0]) - 2.5).abs() < 1e-12);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_welch_strategy_from_config() {
        let mut config = Config::default();
        config.analysis.significance = SignificanceMethod::Welch;
        let context = create_test_context(config);

        let data = data(json!({
            "baseline": [0.70, 0.71, 0.69, 0.70],
            "results": [0.90, 0.91, 0.89, 0.90],
        }));
        let result = AnalysisAgent.analyze_results(&context, &data).unwrap();

        assert!(result.statistical_significance.p_value < 0.001);
        assert!(result.statistical_significance.significant);
        assert!((result.improvement_over_baseline - 28.571_428).abs() < 1e-3);
    }

    #[test]
    fn test_all_panels_populated() {
        let data = data(json!({
            "performance": [0.7, 0.75, 0.8],
            "results": [0.8, 0.81, 0.79, 0.85],
            "convergence": [1.0, 0.5, 0.25],
            "comparison": {"ours": [0.9, 0.92], "baseline": [0.7, 0.72]},
        }));
        let figure = SvgChartRenderer::new("plots.svg").render(&data).unwrap();

        assert_eq!(figure.file_name, "plots.svg");
        assert_eq!(
            figure.populated_panels,
            vec![
                PanelKind::Performance,
                PanelKind::Distribution,
                PanelKind::Convergence,
                PanelKind::Comparison,
            ]
        );
        assert!(figure.content.starts_with("<svg"));
        assert!(figure.content.contains("width=\"1500\""));
        assert!(figure.content.contains("height=\"1200\""));
        assert!(figure.content.contains(">Ours</text>"));
        assert!(figure.content.contains(">Method Comparison</text>"));
        assert!(figure.content.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_missing_panels_left_blank() {
        let figure = SvgChartRenderer::new("plots.svg")
            .render(&ExperimentalData::default())
            .unwrap();

        assert!(figure.populated_panels.is_empty());
        assert!(!figure.content.contains("<polyline"));
        assert!(!figure.content.contains("Performance Over Time"));
    }

    #[test]
    fn test_single_point_and_constant_series() {
        let data = data(json!({"performance": [0.5], "results": [1.0, 1.0, 1.0]}));
        let figure = SvgChartRenderer::new("plots.svg").render(&data).unwrap();

        assert_eq!(
            figure.populated_panels,
            vec![PanelKind::Performance, PanelKind::Distribution]
        );
        assert!(figure.content.contains("<circle"));
        assert!(!figure.content.contains("NaN"));
    }

    #[test]
    fn test_comparison_labels_are_escaped() {
        let data = data(json!({"comparison": {"A&B <v2>": [1.0]}}));
        let figure = SvgChartRenderer::new("plots.svg").render(&data).unwrap();

        assert!(figure.content.contains("A&amp;B &lt;v2&gt;"));
        assert_eq!(figure.populated_panels, vec![PanelKind::Comparison]);
    }

    #[test]
    fn test_generate_visualizations_writes_figure() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path().join("nested");
        let context = create_test_context(Config::default());

        let path = AnalysisAgent
            .generate_visualizations(&context, &data(json!({"performance": [1.0, 2.0]})), &output_dir)
            .unwrap();

        assert_eq!(path, output_dir.join("analysis_plots.svg"));
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("<polyline"));
    }

    #[test]
    fn test_load_experimental_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, r#"{"performance": [1, 2, 3], "notes": "seed 42"}"#).unwrap();

        let data = load_experimental_data(&path).unwrap();
        assert_eq!(data.performance(), &[1.0, 2.0, 3.0]);
        assert_eq!(data.extra["notes"], json!("seed 42"));
    }

    #[test]
    fn test_load_experimental_data_errors() {
        let temp_dir = TempDir::new().unwrap();

        let missing = load_experimental_data(&temp_dir.path().join("missing.json"));
        assert!(matches!(missing, Err(PipelineError::Analysis(_))));

        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_experimental_data(&path),
            Err(PipelineError::Analysis(_))
        ));

        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            load_experimental_data(&path),
            Err(PipelineError::Analysis(_))
        ));
    }
}
