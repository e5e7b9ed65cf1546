use crate::config::{Config, LLMProvider, SignificanceMethod};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// 默认配置文件名，位于当前工作目录
pub const DEFAULT_CONFIG_FILE: &str = "paperwright.toml";

/// Paperwright - 由LLM驱动的学术论文生成流水线
#[derive(Parser, Debug)]
#[command(name = "paperwright")]
#[command(
    about = "Assembles an academic paper draft from related literature, experimental data and LLM-written sections, rendered as a JSON snapshot and a LaTeX manuscript."
)]
#[command(version)]
pub struct Args {
    /// 研究主题
    #[arg(short, long)]
    pub topic: String,

    /// LLM API KEY
    #[arg(long, env = "PAPERWRIGHT_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// 输出目录（默认 ./paper_output）
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// 实验数据JSON文件
    #[arg(short, long)]
    pub experimental_data: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 最多检索的论文数
    #[arg(long)]
    pub max_results: Option<usize>,

    /// 最大并发生成数
    #[arg(long)]
    pub max_parallels: Option<usize>,

    /// LLM Provider (openai, moonshot, deepseek, anthropic, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// 模型名称
    #[arg(long)]
    pub model: Option<String>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 显著性检验策略 (placeholder, welch)
    #[arg(long)]
    pub significance: Option<String>,

    /// LaTeX 文稿中的作者
    #[arg(long)]
    pub author: Option<String>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 将CLI参数转换为配置；命令行参数优先于配置文件
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(config_path) => Config::from_file(config_path)?,
            None => {
                let default_config_path = std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(DEFAULT_CONFIG_FILE);
                if default_config_path.exists() {
                    Config::from_file(&default_config_path)?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(output_dir) = self.output_dir {
            config.output_path = output_dir;
        }
        if self.experimental_data.is_some() {
            config.experimental_data_path = self.experimental_data;
        }
        config.llm.api_key = self.api_key;

        if let Some(provider_str) = self.llm_provider {
            match provider_str.parse::<LLMProvider>() {
                Ok(provider) => config.llm.provider = provider,
                Err(_) => tracing::warn!(
                    "⚠️ 未知的provider: {}，使用 {}",
                    provider_str,
                    config.llm.provider
                ),
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(max_parallels) = self.max_parallels {
            config.llm.max_parallels = max_parallels;
        }
        if let Some(max_results) = self.max_results {
            config.retrieval.max_results = max_results;
        }

        if let Some(significance_str) = self.significance {
            match significance_str.parse::<SignificanceMethod>() {
                Ok(method) => config.analysis.significance = method,
                Err(_) => tracing::warn!(
                    "⚠️ 未知的显著性检验策略: {}，使用 {}",
                    significance_str,
                    config.analysis.significance
                ),
            }
        }
        if let Some(author) = self.author {
            config.outlet.author = author;
        }

        // 配置文件中开启的详细日志不会被命令行关闭
        config.verbose |= self.verbose;
        Ok(config)
    }
}
