use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::analysis::AnalysisResult;
use super::paper::PaperRecord;

/// 保持插入顺序、键唯一的章节映射（章节名 -> 文本）
///
/// 序列化为JSON对象时按插入顺序输出，反序列化时按文档中的出现顺序恢复。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionMap {
    entries: Vec<(String, String)>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入章节，若同名章节已存在则返回 false 且不做修改
    pub fn try_insert(&mut self, title: impl Into<String>, text: impl Into<String>) -> bool {
        let title = title.into();
        if self.contains(&title) {
            return false;
        }
        self.entries.push((title, text.into()));
        true
    }

    pub fn contains(&self, title: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == title)
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, text)| text.as_str())
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, text)| (t.as_str(), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SectionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (title, text) in &self.entries {
            map.serialize_entry(title, text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SectionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SectionMapVisitor;

        impl<'de> Visitor<'de> for SectionMapVisitor {
            type Value = SectionMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of section titles to text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SectionMap, A::Error> {
                let mut sections = SectionMap::new();
                while let Some((title, text)) = access.next_entry::<String, String>()? {
                    if !sections.try_insert(title.clone(), text) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate section `{}`",
                            title
                        )));
                    }
                }
                Ok(sections)
            }
        }

        deserializer.deserialize_map(SectionMapVisitor)
    }
}

/// 论文大纲：章节名 -> 种子上下文，顺序即目录顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionOutline(SectionMap);

impl SectionOutline {
    pub(crate) fn from_sections(sections: SectionMap) -> Self {
        Self(sections)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.0.titles()
    }

    pub fn context_of(&self, title: &str) -> Option<&str> {
        self.0.get(title)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 单个章节的正文（生成结果或占位正文）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSection {
    pub title: String,
    pub body: String,
}

/// 最终合并的论文文档，由编排器在所有阶段完成后构造一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub sections: SectionMap,
    pub references: Vec<PaperRecord>,
    pub figures: Vec<String>,
    pub analysis: AnalysisResult,
}
