use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{Entity, EntityKind, Missing, segments};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct News {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub category: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub introduction_para: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "image_url", default)]
    pub image_url: String,
    /// Author byline.
    #[serde(default)]
    pub by: String,
}

impl Entity for News {
    const KIND: EntityKind = EntityKind::News;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blank() -> Self {
        Self {
            id: None,
            category: String::new(),
            date: Utc::now(),
            title: String::new(),
            introduction_para: String::new(),
            description: String::new(),
            image_url: String::new(),
            by: String::new(),
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        Missing::default()
            .image("image_url", &self.image_url)
            .text("by", &self.by)
            .text("category", &self.category)
            .text("title", &self.title)
            .text("introductionPara", &self.introduction_para)
            .text("description", &self.description)
            .finish()
    }

    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        match segments(path).as_slice() {
            ["image_url"] => Some(&mut self.image_url),
            _ => None,
        }
    }
}
