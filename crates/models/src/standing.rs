use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{Entity, EntityKind, Missing, segments};

/// Number of recent results a table row keeps.
pub const FORM_GUIDE_LEN: usize = 5;

/// One row of a league table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct Standing {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub club: String,
    pub image_url: String,
    pub league: String,
    /// Table position, 1-based.
    pub position: u32,
    pub played: String,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    /// Goal record as displayed, e.g. "14:6".
    pub goals: String,
    #[serde(rename = "last5")]
    pub last5: Vec<String>,
    pub points: u32,
}

impl Standing {
    /// Append a result to the form guide. Returns `false` once it is full.
    pub fn push_result(&mut self, result: impl Into<String>) -> bool {
        if self.last5.len() >= FORM_GUIDE_LEN {
            return false;
        }
        self.last5.push(result.into());
        true
    }

    pub fn remove_result(&mut self, index: usize) -> Option<String> {
        (index < self.last5.len()).then(|| self.last5.remove(index))
    }
}

impl Entity for Standing {
    const KIND: EntityKind = EntityKind::Standing;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blank() -> Self {
        Self::default()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        Missing::default()
            .text("club", &self.club)
            .image("imageUrl", &self.image_url)
            .text("league", &self.league)
            .text("played", &self.played)
            .text("goals", &self.goals)
            .non_empty("last5", &self.last5)
            .finish()
    }

    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        match segments(path).as_slice() {
            ["imageUrl"] => Some(&mut self.image_url),
            _ => None,
        }
    }
}
