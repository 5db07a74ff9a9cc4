use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{Entity, EntityKind, Missing, segments};

/// Hero image rotated on the public landing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct Banner {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub image_url: String,
}

impl Entity for Banner {
    const KIND: EntityKind = EntityKind::Banner;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blank() -> Self {
        Self::default()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        Missing::default().image("imageUrl", &self.image_url).finish()
    }

    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        match segments(path).as_slice() {
            ["imageUrl"] => Some(&mut self.image_url),
            _ => None,
        }
    }
}
