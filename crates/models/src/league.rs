use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{Entity, EntityKind, Missing, segments};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct League {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub logo_url: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Page views counted by the public site.
    #[serde(default)]
    pub views: u64,
}

impl Entity for League {
    const KIND: EntityKind = EntityKind::League;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blank() -> Self {
        let now = Utc::now();
        Self {
            id: None,
            league: String::new(),
            logo_url: String::new(),
            start_date: now,
            end_date: now,
            views: 0,
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        Missing::default()
            .text("league", &self.league)
            .image("logo_url", &self.logo_url)
            .finish()
    }

    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        match segments(path).as_slice() {
            ["logo_url"] => Some(&mut self.logo_url),
            _ => None,
        }
    }
}
