use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::generator::analysis::{AnalysisAgent, load_experimental_data};
use crate::generator::compose::ContentComposer;
use crate::generator::context::GeneratorContext;
use crate::generator::literature::LiteratureReviewer;
use crate::generator::outlet::{DiskOutlet, Outlet, RunArtifacts};
use crate::generator::outline::OutlineBuilder;
use crate::types::{Document, ExperimentalData, GeneratedSection, SectionMap};

use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

mod state;

pub use state::{
    Analyzed, Assembled, ExperimentalInput, Initialized, Outlined, PipelineState, Researched,
    RunFailure, RunReport, RunRequest, Stage, Synthesized,
};

/// 文档引用的最大文献数
pub const MAX_REFERENCES: usize = 10;

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<Stage, Instant>,
    phase_durations: Vec<(Stage, Duration)>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: Vec::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, stage: Stage) {
        self.phase_start_times.insert(stage, Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, stage: Stage) -> Option<Duration> {
        let duration = self.phase_start_times.remove(&stage)?.elapsed();
        self.phase_durations.push((stage, duration));
        Some(duration)
    }

    /// 获取总执行时间
    pub fn total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 按执行顺序的各阶段耗时
    pub fn phase_durations(&self) -> &[(Stage, Duration)] {
        &self.phase_durations
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = format!(
            "总执行时间: {:.2}秒\n",
            self.total_duration().as_secs_f64()
        );

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (stage, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", stage, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 流水线编排器：按阶段推进状态机，不做任何重试
pub struct Orchestrator {
    context: GeneratorContext,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(context: GeneratorContext) -> Self {
        Self {
            context,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn context(&self) -> &GeneratorContext {
        &self.context
    }

    /// 从 Init 运行到 Done 或 Failed
    pub async fn run(&self, request: RunRequest) -> std::result::Result<RunReport, RunFailure> {
        let mut timing = TimingScope::new();
        let mut state = PipelineState::Init(request);

        loop {
            state = match state {
                PipelineState::Done(report) => {
                    let mut report = *report;
                    report.stage_durations = timing.phase_durations().to_vec();
                    report.total_duration = timing.total_duration();
                    tracing::info!(
                        "🎉 论文生成完成 (run {})\n{}",
                        report.run_id,
                        timing.generate_timing_report()
                    );
                    return Ok(report);
                }
                PipelineState::Failed(failure) => {
                    tracing::error!("❌ {}", failure);
                    tracing::debug!("{}", timing.generate_timing_report());
                    return Err(*failure);
                }
                pending => {
                    let stage = pending.stage();
                    timing.start_phase(stage);
                    let next = self.advance(pending).await;
                    timing.end_phase(stage);
                    next
                }
            };
        }
    }

    /// 执行当前阶段并返回下一个状态；终止状态原样返回
    pub async fn advance(&self, state: PipelineState) -> PipelineState {
        let stage = state.stage();
        if !state.is_terminal() && self.cancel.is_cancelled() {
            return failed(stage, PipelineError::Cancelled);
        }

        match state {
            PipelineState::Init(request) => {
                transition(stage, self.init(request), PipelineState::LiteratureSearch)
            }
            PipelineState::LiteratureSearch(initialized) => transition(
                stage,
                self.search_literature(initialized).await,
                PipelineState::Analysis,
            ),
            PipelineState::Analysis(researched) => {
                transition(stage, self.analyze(researched), PipelineState::Outline)
            }
            PipelineState::Outline(analyzed) => {
                transition(stage, self.build_outline(analyzed), PipelineState::Synthesis)
            }
            PipelineState::Synthesis(outlined) => transition(
                stage,
                self.synthesize(outlined).await,
                PipelineState::Assemble,
            ),
            PipelineState::Assemble(synthesized) => {
                transition(stage, self.assemble(synthesized), |assembled| {
                    PipelineState::Serialize(Box::new(assembled))
                })
            }
            PipelineState::Serialize(assembled) => match self.serialize(*assembled).await {
                Ok(report) => PipelineState::Done(Box::new(report)),
                Err(failure) => PipelineState::Failed(Box::new(failure)),
            },
            terminal => terminal,
        }
    }

    /// 校验主题并分配 run id
    pub fn init(&self, request: RunRequest) -> PipelineResult<Initialized> {
        if request.topic.trim().is_empty() {
            return Err(PipelineError::InvalidTopic(
                "topic must not be empty".to_string(),
            ));
        }

        let run_id = Uuid::new_v4();
        tracing::info!("🚀 开始生成论文 (run {}): {}", run_id, request.topic);
        Ok(Initialized { run_id, request })
    }

    pub async fn search_literature(&self, initialized: Initialized) -> PipelineResult<Researched> {
        tracing::info!("🔎 文献调研中...");
        let review = self
            .cancellable(LiteratureReviewer.execute(&self.context, &initialized.request.topic))
            .await?;
        Ok(Researched {
            initialized,
            review,
        })
    }

    /// 统计分析并在内存中渲染图表
    pub fn analyze(&self, researched: Researched) -> PipelineResult<Analyzed> {
        tracing::info!("📊 分析实验数据...");
        let data = match &researched.initialized.request.experimental_data {
            ExperimentalInput::None => ExperimentalData::default(),
            ExperimentalInput::Path(path) => load_experimental_data(path)?,
            ExperimentalInput::Inline(value) => ExperimentalData::from_value(value.clone())?,
        };

        let agent = AnalysisAgent;
        let analysis = agent.analyze_results(&self.context, &data)?;
        let figure = agent.render_visualizations(&self.context, &data)?;
        Ok(Analyzed {
            researched,
            data,
            analysis,
            figure,
        })
    }

    pub fn build_outline(&self, analyzed: Analyzed) -> PipelineResult<Outlined> {
        let outline = OutlineBuilder::new(&self.context.config.outline).build(
            &analyzed.researched.initialized.request.topic,
            &analyzed.researched.review.analysis,
            &analyzed.analysis,
        )?;
        Ok(Outlined { analyzed, outline })
    }

    /// 并发生成摘要与章节；章节失败降级为占位正文，摘要失败为致命错误
    pub async fn synthesize(&self, outlined: Outlined) -> PipelineResult<Synthesized> {
        let analyzed = &outlined.analyzed;
        let outcome = ContentComposer
            .compose_all(
                &self.context,
                &analyzed.researched.initialized.request.topic,
                &outlined.outline,
                &analyzed.data,
                &analyzed.analysis,
                &self.cancel,
            )
            .await?;

        let abstract_text = outcome.abstract_text?;

        let placeholder = &self.context.config.composition.failure_placeholder;
        let mut sections = Vec::with_capacity(outcome.sections.len());
        let mut failed_sections = Vec::new();
        for (title, result) in outcome.sections {
            let body = match result {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("⚠️ 章节 `{}` 使用占位正文: {}", title, e);
                    failed_sections.push(title.clone());
                    placeholder.clone()
                }
            };
            sections.push(GeneratedSection { title, body });
        }

        Ok(Synthesized {
            outlined,
            abstract_text,
            sections,
            failed_sections,
        })
    }

    /// 合并各阶段产出为文档；章节必须与大纲逐一对应
    pub fn assemble(&self, synthesized: Synthesized) -> PipelineResult<Assembled> {
        let mut sections = SectionMap::new();
        for section in &synthesized.sections {
            if !sections.try_insert(section.title.as_str(), section.body.as_str()) {
                return Err(PipelineError::Assembly(format!(
                    "duplicate section `{}`",
                    section.title
                )));
            }
        }

        let outline = &synthesized.outlined.outline;
        if !sections.titles().eq(outline.titles()) {
            return Err(PipelineError::Assembly(format!(
                "sections {:?} do not match outline {:?}",
                sections.titles().collect::<Vec<_>>(),
                outline.titles().collect::<Vec<_>>()
            )));
        }

        let analyzed = &synthesized.outlined.analyzed;
        let request = &analyzed.researched.initialized.request;
        let figure_path = analyzed.figure.path_in(&request.output_dir);

        let document = Document {
            title: ContentComposer.title(&self.context, &request.topic),
            abstract_text: synthesized.abstract_text.clone(),
            sections,
            references: analyzed
                .researched
                .review
                .papers
                .iter()
                .take(MAX_REFERENCES)
                .cloned()
                .collect(),
            figures: vec![figure_path.display().to_string()],
            analysis: analyzed.analysis.clone(),
        };

        Ok(Assembled {
            synthesized,
            document,
        })
    }

    /// 写入全部产物；失败时报告中保留文档
    pub async fn serialize(&self, assembled: Assembled) -> std::result::Result<RunReport, RunFailure> {
        let Assembled {
            synthesized,
            document,
        } = assembled;
        let analyzed = &synthesized.outlined.analyzed;
        let initialized = &analyzed.researched.initialized;

        let outlet = DiskOutlet::new(&self.context.config.outlet);
        let artifacts = RunArtifacts {
            review: &analyzed.researched.review,
            figure: &analyzed.figure,
            document: &document,
        };

        match outlet.save(&initialized.request.output_dir, &artifacts).await {
            Ok(written) => Ok(RunReport {
                run_id: initialized.run_id,
                document,
                written,
                failed_sections: synthesized.failed_sections,
                stage_durations: Vec::new(),
                total_duration: Duration::ZERO,
            }),
            Err(e) => Err(RunFailure::new(Stage::Serialize, e).with_document(document)),
        }
    }

    async fn cancellable<T>(&self, future: impl Future<Output = PipelineResult<T>>) -> PipelineResult<T> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            result = future => result,
        }
    }
}

fn failed(stage: Stage, error: PipelineError) -> PipelineState {
    PipelineState::Failed(Box::new(RunFailure::new(stage, error)))
}

fn transition<T>(
    stage: Stage,
    result: PipelineResult<T>,
    next: impl FnOnce(T) -> PipelineState,
) -> PipelineState {
    match result {
        Ok(output) => next(output),
        Err(e) => failed(stage, e),
    }
}

/// 启动论文生成工作流
pub async fn launch(config: &Config, topic: &str, cancel: CancellationToken) -> Result<RunReport> {
    config.validate()?;
    let context = GeneratorContext::new(config.clone())?;
    let orchestrator = Orchestrator::new(context).with_cancellation(cancel);

    let report = orchestrator
        .run(RunRequest::from_config(topic, config))
        .await?;
    Ok(report)
}

// Include tests
#[cfg(test)]
mod tests;
