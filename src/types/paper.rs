use serde::{Deserialize, Serialize};

/// 检索得到的文献记录，按 url 唯一标识
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    /// 发表时间，格式为 `YYYY-MM-DD HH:MM:SS+00:00`
    pub published: String,
    pub url: String,
}

/// 文献调研快照，对应输出目录中的 literature_review.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteratureReview {
    pub papers: Vec<PaperRecord>,
    pub analysis: String,
}
