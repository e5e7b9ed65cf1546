use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 显著性检验策略
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum SignificanceMethod {
    /// 固定输出 {p_value: 0.05, significant: true}，并非真实的统计检验
    #[serde(rename = "placeholder")]
    #[default]
    Placeholder,
    /// Welch 双样本 t 检验（双侧）
    #[serde(rename = "welch")]
    Welch,
}

impl std::fmt::Display for SignificanceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignificanceMethod::Placeholder => write!(f, "placeholder"),
            SignificanceMethod::Welch => write!(f, "welch"),
        }
    }
}

impl std::str::FromStr for SignificanceMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "placeholder" | "stub" => Ok(SignificanceMethod::Placeholder),
            "welch" | "t-test" => Ok(SignificanceMethod::Welch),
            _ => Err(format!("Unknown significance method: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 输出路径
    pub output_path: PathBuf,

    /// 实验数据JSON文件路径
    pub experimental_data_path: Option<PathBuf>,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 文献检索配置
    pub retrieval: RetrievalConfig,

    /// 实验数据分析配置
    pub analysis: AnalysisConfig,

    /// 内容生成配置
    pub composition: CompositionConfig,

    /// 论文大纲配置
    pub outline: OutlineConfig,

    /// 输出配置
    pub outlet: OutletConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 单次调用超时时间（秒）
    pub timeout_seconds: u64,

    /// 章节生成的最大并发数
    pub max_parallels: usize,
}

/// 文献检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// arXiv 查询接口地址
    pub api_base_url: String,

    /// 最大检索条数
    pub max_results: usize,

    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// 实验数据分析配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub significance: SignificanceMethod,

    /// 显著性水平
    pub alpha: f64,
}

/// 内容生成配置，包含所有提示词模板
///
/// 模板占位符：`{topic}` `{papers}` `{summary}` `{keywords}` `{section}` `{context}` `{data}` `{analysis}`
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CompositionConfig {
    pub system_prompt: String,

    pub literature_template: String,
    pub literature_max_tokens: u32,
    /// 文献分析提示词中每篇摘要保留的字符数
    pub literature_abstract_chars: usize,

    pub abstract_template: String,
    pub abstract_max_tokens: u32,
    /// 除研究主题外附加的关键词
    pub keywords: Vec<String>,
    pub summary_template: String,

    pub section_template: String,
    pub section_max_tokens: u32,
    /// 章节提示词中实验数据摘录的最大字符数
    pub data_excerpt_chars: usize,

    pub title_template: String,

    /// 章节生成失败时写入的占位正文
    pub failure_placeholder: String,
}

/// 大纲中的一个章节
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutlineSection {
    pub title: String,
    /// 种子上下文模板，占位符：`{topic}` `{literature_analysis}` `{analysis}`
    pub seed: String,
}

/// 论文大纲配置，章节顺序即论文目录顺序
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OutlineConfig {
    pub sections: Vec<OutlineSection>,
}

/// 输出配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OutletConfig {
    pub literature_file: String,
    pub document_file: String,
    pub markup_file: String,
    pub figure_file: String,
    /// LaTeX 文稿中的作者
    pub author: String,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 校验配置的取值范围
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.max_results == 0 {
            bail!("retrieval.max_results must be at least 1");
        }
        if self.llm.max_parallels == 0 {
            bail!("llm.max_parallels must be at least 1");
        }
        if !(self.analysis.alpha > 0.0 && self.analysis.alpha < 1.0) {
            bail!("analysis.alpha must be within (0, 1), got {}", self.analysis.alpha);
        }
        if self.outline.sections.is_empty() {
            bail!("outline.sections must not be empty");
        }

        let mut seen = HashSet::new();
        for section in &self.outline.sections {
            if section.title.trim().is_empty() {
                bail!("outline section titles must not be empty");
            }
            if !seen.insert(section.title.as_str()) {
                bail!("duplicate outline section `{}`", section.title);
            }
        }

        let file_names = [
            &self.outlet.literature_file,
            &self.outlet.document_file,
            &self.outlet.markup_file,
            &self.outlet.figure_file,
        ];
        if file_names.iter().any(|name| name.trim().is_empty()) {
            bail!("outlet file names must not be empty");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./paper_output"),
            experimental_data_path: None,
            llm: LLMConfig::default(),
            retrieval: RetrievalConfig::default(),
            analysis: AnalysisConfig::default(),
            composition: CompositionConfig::default(),
            outline: OutlineConfig::default(),
            outlet: OutletConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("PAPERWRIGHT_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api.openai.com/v1"),
            model: String::from("gpt-4"),
            temperature: 0.7,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 180,
            max_parallels: 4,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::from("http://export.arxiv.org/api/query"),
            max_results: 30,
            timeout_seconds: 60,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance: SignificanceMethod::default(),
            alpha: 0.05,
        }
    }
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::from(
                "You are an experienced academic author who writes precise, well-structured research papers.",
            ),
            literature_template: String::from(
                r#"Analyze the following research papers on "{topic}" and identify:
1. Key themes and trends
2. Research gaps
3. Methodologies used
4. Important findings
5. Future directions

Papers:
{papers}"#,
            ),
            literature_max_tokens: 2000,
            literature_abstract_chars: 500,
            abstract_template: String::from(
                r#"Generate a compelling academic abstract for a research paper in {topic}.
Research Summary: {summary}
Keywords: {keywords}

The abstract should be 150-250 words, clearly stating:
1. Problem addressed
2. Methodology used
3. Key findings
4. Significance of the work"#,
            ),
            abstract_max_tokens: 500,
            keywords: vec![
                String::from("machine learning"),
                String::from("novel contribution"),
            ],
            summary_template: String::from("Novel approach to {topic} with results showing {analysis}"),
            section_template: String::from(
                r#"Generate content for the "{section}" section of an academic paper in {topic}.

Context: {context}
Research Data: {data}

Requirements:
- Academic tone and style
- Proper citations where needed
- Clear and concise language
- Technical accuracy"#,
            ),
            section_max_tokens: 1500,
            data_excerpt_chars: 2000,
            title_template: String::from("A Novel Approach to {topic}: Advancing the State of the Art"),
            failure_placeholder: String::from("[generation failed]"),
        }
    }
}

impl Default for OutlineConfig {
    fn default() -> Self {
        let section = |title: &str, seed: &str| OutlineSection {
            title: title.to_string(),
            seed: seed.to_string(),
        };
        Self {
            sections: vec![
                section(
                    "Introduction",
                    "This paper addresses {topic} by proposing a novel approach that builds on recent advances in the field.",
                ),
                section("Related Work", "{literature_analysis}"),
                section("Methodology", "Detailed description of the proposed methodology."),
                section("Experiments", "Experimental setup and evaluation methodology."),
                section("Results", "Results showing {analysis}"),
                section("Discussion", "Discussion of results and implications."),
                section("Conclusion", "Summary of contributions and future work."),
            ],
        }
    }
}

impl Default for OutletConfig {
    fn default() -> Self {
        Self {
            literature_file: String::from("literature_review.json"),
            document_file: String::from("final_paper.json"),
            markup_file: String::from("paper.tex"),
            figure_file: String::from("analysis_plots.svg"),
            author: String::from("AI Research Assistant"),
        }
    }
}
