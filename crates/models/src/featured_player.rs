use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{Entity, EntityKind, Missing, PLACEHOLDER_PORTRAIT_URL, segments};

/// Headline numbers shown next to a featured player. The backend stores
/// them as free text ("12", "3rd").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct FeaturedStats {
    pub goals: String,
    pub assists: String,
    pub rank: String,
}

/// Player spotlighted on the home page, also embedded in match records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturedPlayer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub image_url: String,
    pub club: String,
    pub stats: FeaturedStats,
    pub position: String,
}

impl Entity for FeaturedPlayer {
    const KIND: EntityKind = EntityKind::FeaturedPlayer;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blank() -> Self {
        Self {
            image_url: PLACEHOLDER_PORTRAIT_URL.to_string(),
            ..Self::default()
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        Missing::default()
            .text("name", &self.name)
            .image("imageUrl", &self.image_url)
            .text("club", &self.club)
            .text("position", &self.position)
            .text("stats.goals", &self.stats.goals)
            .text("stats.assists", &self.stats.assists)
            .text("stats.rank", &self.stats.rank)
            .finish()
    }

    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        match segments(path).as_slice() {
            ["imageUrl"] => Some(&mut self.image_url),
            _ => None,
        }
    }
}
