use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{Entity, EntityKind, Missing, segments};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Trophy {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub image_url: String,
}

impl Entity for Trophy {
    const KIND: EntityKind = EntityKind::Trophy;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blank() -> Self {
        Self::default()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        Missing::default()
            .text("name", &self.name)
            .image("image_url", &self.image_url)
            .finish()
    }

    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        match segments(path).as_slice() {
            ["image_url"] => Some(&mut self.image_url),
            _ => None,
        }
    }
}
