use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::OutletConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::generator::analysis::Figure;
use crate::types::{Document, LiteratureReview};

/// 一次运行需要落盘的全部产物
pub struct RunArtifacts<'a> {
    pub review: &'a LiteratureReview,
    pub figure: &'a Figure,
    pub document: &'a Document,
}

pub trait Outlet {
    async fn save(
        &self,
        output_dir: &Path,
        artifacts: &RunArtifacts<'_>,
    ) -> PipelineResult<Vec<PathBuf>>;
}

/// 将产物写入本地目录；目录不存在时创建，已有文件直接覆盖
pub struct DiskOutlet {
    config: OutletConfig,
}

impl DiskOutlet {
    pub fn new(config: &OutletConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn write_json<T: Serialize>(&self, path: PathBuf, value: &T) -> PipelineResult<PathBuf> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| PipelineError::serialization(&path, e))?;
        self.write_text(path, &content)
    }

    fn write_text(&self, path: PathBuf, content: &str) -> PipelineResult<PathBuf> {
        fs::write(&path, content).map_err(|e| PipelineError::serialization(&path, e))?;
        tracing::info!("💾 已保存: {}", path.display());
        Ok(path)
    }
}

impl Outlet for DiskOutlet {
    async fn save(
        &self,
        output_dir: &Path,
        artifacts: &RunArtifacts<'_>,
    ) -> PipelineResult<Vec<PathBuf>> {
        tracing::info!("🖊️ 写入输出文件...");
        fs::create_dir_all(output_dir)
            .map_err(|e| PipelineError::serialization(output_dir, e))?;

        let mut written = Vec::with_capacity(4);
        written.push(self.write_json(
            output_dir.join(&self.config.literature_file),
            artifacts.review,
        )?);

        let figure_path = artifacts.figure.persist(output_dir)?;
        tracing::info!("💾 已保存: {}", figure_path.display());
        written.push(figure_path);

        written.push(self.write_json(
            output_dir.join(&self.config.document_file),
            &to_snapshot(artifacts.document)?,
        )?);
        written.push(self.write_text(
            output_dir.join(&self.config.markup_file),
            &to_markup(artifacts.document, &self.config),
        )?);

        tracing::info!("💾 输出完成，输出目录: {}", output_dir.display());
        Ok(written)
    }
}

/// 文档的JSON快照：`title, abstract, sections, references, figures, analysis`
pub fn to_snapshot(document: &Document) -> PipelineResult<Value> {
    serde_json::to_value(document)
        .map_err(|e| PipelineError::Assembly(format!("failed to build snapshot: {}", e)))
}

/// 从JSON快照恢复文档
pub fn from_snapshot(snapshot: &Value) -> PipelineResult<Document> {
    Document::deserialize(snapshot)
        .map_err(|e| PipelineError::Assembly(format!("invalid document snapshot: {}", e)))
}

/// 渲染 LaTeX 文稿；章节正文原样插入，不做转义
pub fn to_markup(document: &Document, config: &OutletConfig) -> String {
    let mut latex = String::new();
    latex.push_str("\\documentclass[12pt]{article}\n");
    latex.push_str("\\usepackage[utf8]{inputenc}\n");
    latex.push_str("\\usepackage[T1]{fontenc}\n");
    latex.push_str("\\usepackage{amsmath,amsfonts,amssymb}\n");
    latex.push_str("\\usepackage{graphicx}\n");
    latex.push_str("\\usepackage{url}\n");
    latex.push_str("\\usepackage{hyperref}\n\n");

    latex.push_str(&format!("\\title{{{}}}\n", document.title));
    latex.push_str(&format!("\\author{{{}}}\n\n", config.author));
    latex.push_str("\\begin{document}\n\n\\maketitle\n\n");
    latex.push_str(&format!(
        "\\begin{{abstract}}\n{}\n\\end{{abstract}}\n\n",
        document.abstract_text
    ));

    for (title, body) in document.sections.iter() {
        latex.push_str(&format!(
            "\n\\section{{{}}}\n{}\n\n",
            title_case(&title.replace('_', " ")),
            body
        ));
    }

    latex.push_str("\n\\section{References}\n% References would go here\n\n\\end{document}\n");
    latex
}

/// 单词首字母大写、其余小写；字母之后的字母视为同一单词
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if previous_is_letter {
            result.extend(c.to_lowercase());
        } else {
            result.extend(c.to_uppercase());
        }
        previous_is_letter = c.is_alphabetic();
    }
    result
}
