use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{Entity, EntityKind, Missing, segments};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct StarPerformer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub image_url: String,
    pub achievement: String,
    pub tournament: String,
    pub goals: u32,
    pub assists: u32,
    #[serde(rename = "matches_played")]
    pub matches_played: u32,
}

impl Entity for StarPerformer {
    const KIND: EntityKind = EntityKind::StarPerformer;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blank() -> Self {
        Self::default()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        Missing::default()
            .text("name", &self.name)
            .image("imageUrl", &self.image_url)
            .text("achievement", &self.achievement)
            .text("tournament", &self.tournament)
            .finish()
    }

    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        match segments(path).as_slice() {
            ["imageUrl"] => Some(&mut self.image_url),
            _ => None,
        }
    }
}
