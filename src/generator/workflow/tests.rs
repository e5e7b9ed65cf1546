#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::error::PipelineError;
    use crate::generator::context::GeneratorContext;
    use crate::generator::outlet::from_snapshot;
    use crate::generator::workflow::{
        ExperimentalInput, Orchestrator, PipelineState, RunFailure, RunRequest, Stage,
        TimingScope,
    };
    use crate::stubs::{StubLiteratureSource, StubTextGenerator};
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const CANONICAL_SECTIONS: [&str; 7] = [
        "Introduction",
        "Related Work",
        "Methodology",
        "Experiments",
        "Results",
        "Discussion",
        "Conclusion",
    ];

    struct Harness {
        orchestrator: Orchestrator,
        source: Arc<StubLiteratureSource>,
        generator: Arc<StubTextGenerator>,
        output_dir: PathBuf,
        _temp_dir: TempDir,
    }

    impl Harness {
        fn new(source: StubLiteratureSource, generator: StubTextGenerator) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let output_dir = temp_dir.path().join("paper_output");
            let config = Config {
                output_path: output_dir.clone(),
                ..Default::default()
            };

            let source = Arc::new(source);
            let generator = Arc::new(generator);
            let context =
                GeneratorContext::with_services(config, source.clone(), generator.clone());
            Self {
                orchestrator: Orchestrator::new(context),
                source,
                generator,
                output_dir,
                _temp_dir: temp_dir,
            }
        }

        fn request(&self, topic: &str) -> RunRequest {
            RunRequest::new(topic, &self.output_dir)
        }

        fn output_files(&self) -> Vec<String> {
            let mut names: Vec<_> = std::fs::read_dir(&self.output_dir)
                .map(|entries| {
                    entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.file_name().to_string_lossy().to_string())
                        .collect()
                })
                .unwrap_or_default();
            names.sort();
            names
        }
    }

    fn expect_failure(result: Result<crate::generator::workflow::RunReport, RunFailure>) -> RunFailure {
        match result {
            Ok(report) => panic!("expected failure, got report {:?}", report.run_id),
            Err(failure) => failure,
        }
    }

    #[tokio::test]
    async fn test_full_run_writes_all_artifacts() {
        let harness = Harness::new(StubLiteratureSource::with_papers(5), StubTextGenerator::new());

        let report = harness
            .orchestrator
            .run(harness.request("graph neural networks"))
            .await
            .unwrap();

        let document = &report.document;
        assert_eq!(
            document.title,
            "A Novel Approach to graph neural networks: Advancing the State of the Art"
        );
        assert_eq!(document.sections.titles().collect::<Vec<_>>(), CANONICAL_SECTIONS);
        assert_eq!(document.references.len(), 5);
        assert!(document.abstract_text.contains("academic abstract"));
        assert_eq!(
            document.figures,
            vec![harness.output_dir.join("analysis_plots.svg").display().to_string()]
        );
        assert!(report.failed_sections.is_empty());

        assert_eq!(
            harness.output_files(),
            vec![
                "analysis_plots.svg",
                "final_paper.json",
                "literature_review.json",
                "paper.tex",
            ]
        );
        assert_eq!(report.written.len(), 4);

        let stages: Vec<_> = report.stage_durations.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Init,
                Stage::LiteratureSearch,
                Stage::Analysis,
                Stage::Outline,
                Stage::Synthesis,
                Stage::Assemble,
                Stage::Serialize,
            ]
        );
        // 文献分析 1 次 + 摘要 1 次 + 章节 7 次
        assert_eq!(harness.generator.calls().len(), 9);
    }

    #[tokio::test]
    async fn test_references_capped_at_ten() {
        let harness = Harness::new(StubLiteratureSource::with_papers(12), StubTextGenerator::new());

        let report = harness
            .orchestrator
            .run(harness.request("transformers"))
            .await
            .unwrap();

        let titles: Vec<_> = report
            .document
            .references
            .iter()
            .map(|p| p.title.clone())
            .collect();
        let expected: Vec<_> = (1..=10).map(|n| format!("Paper {}", n)).collect();
        assert_eq!(titles, expected);

        // 文献快照保留全部检索结果
        let review: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(harness.output_dir.join("literature_review.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(review["papers"].as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_failed_section_uses_placeholder() {
        let harness = Harness::new(
            StubLiteratureSource::with_papers(3),
            StubTextGenerator::new().failing_when("\"Methodology\" section"),
        );

        let report = harness
            .orchestrator
            .run(harness.request("reinforcement learning"))
            .await
            .unwrap();

        let sections = &report.document.sections;
        assert_eq!(sections.len(), 7);
        assert_eq!(sections.titles().collect::<Vec<_>>(), CANONICAL_SECTIONS);
        assert_eq!(sections.get("Methodology"), Some("[generation failed]"));
        assert_ne!(sections.get("Results"), Some("[generation failed]"));
        assert_eq!(report.failed_sections, vec!["Methodology".to_string()]);
        assert_eq!(harness.output_files().len(), 4);

        let markup = std::fs::read_to_string(harness.output_dir.join("paper.tex")).unwrap();
        assert!(markup.contains("\\section{Methodology}\n[generation failed]\n"));
    }

    #[tokio::test]
    async fn test_all_sections_failing_still_keeps_outline() {
        let harness = Harness::new(
            StubLiteratureSource::with_papers(1),
            StubTextGenerator::new()
                .failing_when("Generate content for")
                .failing_when("Analyze the following"),
        );

        let report = harness
            .orchestrator
            .run(harness.request("robotics"))
            .await
            .unwrap();

        assert_eq!(
            report.document.sections.titles().collect::<Vec<_>>(),
            CANONICAL_SECTIONS
        );
        assert!(
            report
                .document
                .sections
                .iter()
                .all(|(_, body)| body == "[generation failed]")
        );
        assert_eq!(report.failed_sections.len(), 7);
    }

    #[tokio::test]
    async fn test_abstract_failure_is_fatal_and_writes_nothing() {
        let harness = Harness::new(
            StubLiteratureSource::with_papers(3),
            StubTextGenerator::new().failing_when("academic abstract"),
        );

        let failure = expect_failure(
            harness
                .orchestrator
                .run(harness.request("computer vision"))
                .await,
        );

        assert_eq!(failure.stage, Stage::Synthesis);
        assert!(matches!(
            &failure.error,
            PipelineError::Synthesis { section, .. } if section == "abstract"
        ));
        assert!(failure.document.is_none());
        assert!(failure.to_string().starts_with("stage synthesis failed:"));
        assert!(!harness.output_dir.exists());
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_fatal() {
        let harness = Harness::new(
            StubLiteratureSource::failing("arXiv unavailable"),
            StubTextGenerator::new(),
        );

        let failure = expect_failure(harness.orchestrator.run(harness.request("nlp")).await);

        assert_eq!(failure.stage, Stage::LiteratureSearch);
        assert!(matches!(failure.error, PipelineError::Retrieval(_)));
        assert!(failure.to_string().contains("arXiv unavailable"));
        assert!(harness.generator.calls().is_empty());
        assert!(!harness.output_dir.exists());
    }

    #[tokio::test]
    async fn test_empty_topic_rejected_at_init() {
        let harness = Harness::new(StubLiteratureSource::with_papers(3), StubTextGenerator::new());

        let failure = expect_failure(harness.orchestrator.run(harness.request("  ")).await);

        assert_eq!(failure.stage, Stage::Init);
        assert!(matches!(failure.error, PipelineError::InvalidTopic(_)));
        assert!(harness.source.queries().is_empty());
    }

    #[tokio::test]
    async fn test_literature_analysis_failure_degrades() {
        let harness = Harness::new(
            StubLiteratureSource::with_papers(2),
            StubTextGenerator::new().failing_when("Analyze the following research papers"),
        );

        harness
            .orchestrator
            .run(harness.request("speech recognition"))
            .await
            .unwrap();

        let review: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(harness.output_dir.join("literature_review.json")).unwrap(),
        )
        .unwrap();
        let analysis = review["analysis"].as_str().unwrap();
        assert!(analysis.contains("- Paper 1"));
        assert!(analysis.contains("- Paper 2"));
    }

    #[tokio::test]
    async fn test_inline_experimental_data() {
        let harness = Harness::new(StubLiteratureSource::with_papers(1), StubTextGenerator::new());
        let request = harness
            .request("optimization")
            .with_experimental_data(ExperimentalInput::Inline(json!({
                "performance": [0.8, 0.82, 0.79],
            })));

        let report = harness.orchestrator.run(request).await.unwrap();

        let analysis = &report.document.analysis;
        assert!((analysis.mean_performance - 0.8033).abs() < 1e-3);
        assert_eq!(analysis.improvement_over_baseline, 0.0);

        let section_prompts: Vec<_> = harness
            .generator
            .calls()
            .into_iter()
            .filter(|call| call.prompt.contains("\"Results\" section"))
            .collect();
        assert_eq!(section_prompts.len(), 1);
        assert!(section_prompts[0].prompt.contains("mean performance 0.8033"));
        assert!(
            section_prompts[0]
                .prompt
                .contains("\"performance\": [\n    0.8,\n    0.82,\n    0.79\n  ]")
        );
    }

    #[tokio::test]
    async fn test_experimental_data_from_file() {
        let harness = Harness::new(StubLiteratureSource::with_papers(1), StubTextGenerator::new());
        let data_path = harness._temp_dir.path().join("data.json");
        std::fs::write(&data_path, r#"{"baseline": [0.5], "results": [0.6]}"#).unwrap();

        let report = harness
            .orchestrator
            .run(
                harness
                    .request("optimization")
                    .with_experimental_data(ExperimentalInput::Path(data_path)),
            )
            .await
            .unwrap();

        assert!((report.document.analysis.improvement_over_baseline - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_malformed_experimental_data_fails_analysis() {
        let harness = Harness::new(StubLiteratureSource::with_papers(1), StubTextGenerator::new());
        let request = harness
            .request("optimization")
            .with_experimental_data(ExperimentalInput::Inline(json!([1, 2, 3])));

        let failure = expect_failure(harness.orchestrator.run(request).await);

        assert_eq!(failure.stage, Stage::Analysis);
        assert!(matches!(failure.error, PipelineError::Analysis(_)));
        assert!(!harness.output_dir.exists());
    }

    #[tokio::test]
    async fn test_extreme_values_round_trip_through_snapshot() {
        let harness = Harness::new(StubLiteratureSource::with_papers(1), StubTextGenerator::new());
        let request = harness
            .request("numerical stability")
            .with_experimental_data(ExperimentalInput::Inline(json!({
                "performance": [1e308, 1e308],
                "baseline": [1e308, 1e308],
                "results": [1.0],
            })));

        let report = harness.orchestrator.run(request).await.unwrap();

        let snapshot: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(harness.output_dir.join("final_paper.json")).unwrap(),
        )
        .unwrap();
        assert!(snapshot["analysis"]["mean_performance"].is_f64());
        let restored = from_snapshot(&snapshot).unwrap();
        assert_eq!(restored, report.document);
    }

    #[tokio::test]
    async fn test_non_finite_statistics_fail_analysis() {
        let harness = Harness::new(StubLiteratureSource::with_papers(1), StubTextGenerator::new());
        let request = harness
            .request("numerical stability")
            .with_experimental_data(ExperimentalInput::Inline(json!({
                "baseline": [5e-324],
                "results": [1.0],
            })));

        let failure = expect_failure(harness.orchestrator.run(request).await);

        assert_eq!(failure.stage, Stage::Analysis);
        assert!(matches!(failure.error, PipelineError::Analysis(_)));
        assert!(!harness.output_dir.exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_keeps_document() {
        let mut harness =
            Harness::new(StubLiteratureSource::with_papers(2), StubTextGenerator::new());
        // 输出目录的位置被普通文件占据
        let blocked = harness._temp_dir.path().join("blocked");
        std::fs::write(&blocked, "not a directory").unwrap();
        harness.output_dir = blocked.clone();

        let failure = expect_failure(harness.orchestrator.run(harness.request("databases")).await);

        assert_eq!(failure.stage, Stage::Serialize);
        assert!(matches!(failure.error, PipelineError::Serialization { .. }));
        let document = failure.document.expect("document should be retained");
        assert_eq!(document.sections.len(), 7);
        assert_eq!(document.references.len(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_during_synthesis() {
        let harness = Harness::new(
            StubLiteratureSource::with_papers(2),
            StubTextGenerator::new().with_delay(Duration::from_millis(300)),
        );
        let token = harness.orchestrator.cancellation_token();
        tokio::spawn(async move {
            // 文献分析约 300ms 后完成，随后进入内容生成
            tokio::time::sleep(Duration::from_millis(450)).await;
            token.cancel();
        });

        let failure = expect_failure(harness.orchestrator.run(harness.request("security")).await);

        assert_eq!(failure.stage, Stage::Synthesis);
        assert!(matches!(failure.error, PipelineError::Cancelled));
        assert!(!harness.output_dir.exists());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let harness = Harness::new(StubLiteratureSource::with_papers(2), StubTextGenerator::new());
        harness.orchestrator.cancellation_token().cancel();

        let failure = expect_failure(harness.orchestrator.run(harness.request("security")).await);

        assert_eq!(failure.stage, Stage::Init);
        assert!(matches!(failure.error, PipelineError::Cancelled));
        assert!(harness.source.queries().is_empty());
    }

    #[tokio::test]
    async fn test_transitions_step_by_step() {
        let harness = Harness::new(StubLiteratureSource::with_papers(4), StubTextGenerator::new());
        let orchestrator = &harness.orchestrator;

        let initialized = orchestrator.init(harness.request("edge computing")).unwrap();
        let researched = orchestrator.search_literature(initialized).await.unwrap();
        assert_eq!(researched.review.papers.len(), 4);

        let analyzed = orchestrator.analyze(researched).unwrap();
        assert!(analyzed.figure.populated_panels.is_empty());

        let outlined = orchestrator.build_outline(analyzed).unwrap();
        assert_eq!(outlined.outline.titles().collect::<Vec<_>>(), CANONICAL_SECTIONS);

        let synthesized = orchestrator.synthesize(outlined).await.unwrap();
        assert_eq!(synthesized.sections.len(), 7);

        let assembled = orchestrator.assemble(synthesized).unwrap();
        assert_eq!(assembled.document.references.len(), 4);
        // 序列化之前不产生任何文件
        assert!(!harness.output_dir.exists());
    }

    #[tokio::test]
    async fn test_assemble_rejects_section_mismatch() {
        let harness = Harness::new(StubLiteratureSource::with_papers(1), StubTextGenerator::new());
        let orchestrator = &harness.orchestrator;

        let initialized = orchestrator.init(harness.request("edge computing")).unwrap();
        let researched = orchestrator.search_literature(initialized).await.unwrap();
        let analyzed = orchestrator.analyze(researched).unwrap();
        let outlined = orchestrator.build_outline(analyzed).unwrap();
        let mut synthesized = orchestrator.synthesize(outlined).await.unwrap();

        let mut duplicated = synthesized.clone();
        duplicated.sections[1] = duplicated.sections[0].clone();
        let result = orchestrator.assemble(duplicated);
        assert!(matches!(result, Err(PipelineError::Assembly(_))));

        synthesized.sections.remove(0);
        let result = orchestrator.assemble(synthesized);
        assert!(matches!(result, Err(PipelineError::Assembly(_))));
    }

    #[tokio::test]
    async fn test_advance_keeps_terminal_states() {
        let harness = Harness::new(StubLiteratureSource::with_papers(1), StubTextGenerator::new());
        let failed = PipelineState::Failed(Box::new(RunFailure::new(
            Stage::Outline,
            PipelineError::Outline("boom".to_string()),
        )));

        let next = harness.orchestrator.advance(failed).await;
        assert!(next.is_terminal());
        assert_eq!(next.stage(), Stage::Outline);
    }

    #[test]
    fn test_timing_scope_records_phases_in_order() {
        let mut timing = TimingScope::new();
        timing.start_phase(Stage::Init);
        assert!(timing.end_phase(Stage::Init).is_some());
        timing.start_phase(Stage::Analysis);
        assert!(timing.end_phase(Stage::Analysis).is_some());
        assert!(timing.end_phase(Stage::Outline).is_none());

        let stages: Vec<_> = timing.phase_durations().iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, vec![Stage::Init, Stage::Analysis]);

        let report = timing.generate_timing_report();
        assert!(report.contains("- init:"));
        assert!(report.contains("- analysis:"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::LiteratureSearch.to_string(), "literature_search");
        assert_eq!(Stage::Serialize.to_string(), "serialize");
    }
}
