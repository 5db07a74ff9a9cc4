use std::fmt::Debug;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Placeholder shown for square logos until a real image is uploaded.
pub const PLACEHOLDER_LOGO_URL: &str = "https://placehold.co/100";
/// Placeholder shown for portrait images until a real image is uploaded.
pub const PLACEHOLDER_PORTRAIT_URL: &str = "https://placehold.co/400";

/// Every collection the dashboard manages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Match,
    Player,
    FeaturedPlayer,
    Banner,
    Sponsor,
    Trophy,
    League,
    News,
    Standing,
    StarPerformer,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Match,
        EntityKind::Player,
        EntityKind::FeaturedPlayer,
        EntityKind::Banner,
        EntityKind::Sponsor,
        EntityKind::Trophy,
        EntityKind::League,
        EntityKind::News,
        EntityKind::Standing,
        EntityKind::StarPerformer,
        EntityKind::User,
    ];

    /// Path segment of the read endpoint (`/api/user/<segment>`).
    pub fn collection_path(&self) -> &'static str {
        match self {
            EntityKind::Match => "matches",
            EntityKind::Player => "players",
            EntityKind::FeaturedPlayer => "featuredPlayer",
            EntityKind::Banner => "banner",
            EntityKind::Sponsor => "sponsor",
            EntityKind::Trophy => "trophies",
            EntityKind::League => "leagues",
            EntityKind::News => "news",
            EntityKind::Standing => "standings",
            EntityKind::StarPerformer => "starPerformers",
            EntityKind::User => "users",
        }
    }

    /// Path segment of the write endpoints (`/api/admin/add/<segment>` etc).
    pub fn resource_path(&self) -> &'static str {
        match self {
            EntityKind::Match => "match",
            EntityKind::Player => "player",
            EntityKind::FeaturedPlayer => "featuredPlayer",
            EntityKind::Banner => "banner",
            EntityKind::Sponsor => "sponsor",
            EntityKind::Trophy => "trophy",
            EntityKind::League => "league",
            EntityKind::News => "news",
            EntityKind::Standing => "standing",
            EntityKind::StarPerformer => "starPerformer",
            EntityKind::User => "user",
        }
    }

    /// Name of the array inside a successful read envelope.
    pub fn collection_key(&self) -> &'static str {
        match self {
            EntityKind::Match => "matches",
            EntityKind::Player => "players",
            EntityKind::FeaturedPlayer => "featuredPlayer",
            EntityKind::Banner => "banner",
            EntityKind::Sponsor => "sponsor",
            EntityKind::Trophy => "trophies",
            EntityKind::League => "leagues",
            EntityKind::News => "news",
            EntityKind::Standing => "standings",
            EntityKind::StarPerformer => "starPerformers",
            EntityKind::User => "users",
        }
    }

    /// Human readable singular name used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Match => "match",
            EntityKind::Player => "player",
            EntityKind::FeaturedPlayer => "featured player",
            EntityKind::Banner => "banner",
            EntityKind::Sponsor => "sponsor",
            EntityKind::Trophy => "trophy",
            EntityKind::League => "league",
            EntityKind::News => "news article",
            EntityKind::Standing => "standing",
            EntityKind::StarPerformer => "star performer",
            EntityKind::User => "user",
        }
    }
}

/// A record owned by the backend and mirrored by the dashboard.
pub trait Entity: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Backend-assigned identity; `None` until the record is first saved.
    fn id(&self) -> Option<&str>;

    /// The draft a create form starts from.
    fn blank() -> Self;

    /// Required fields that are still empty, zero or placeholder.
    fn missing_fields(&self) -> Vec<&'static str>;

    /// Resolve a dotted image field path (e.g. `team1.logo_url` or
    /// `teamLineup.team2.3.imageUrl`) to the URL it names.
    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        let _ = path;
        None
    }
}

/// Accumulates the names of required fields that are not filled in.
#[derive(Debug, Default)]
pub(crate) struct Missing(Vec<&'static str>);

impl Missing {
    pub fn text(mut self, name: &'static str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.0.push(name);
        }
        self
    }

    /// Image URLs count as missing while they still hold a placeholder.
    pub fn image(mut self, name: &'static str, value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == PLACEHOLDER_LOGO_URL || value == PLACEHOLDER_PORTRAIT_URL {
            self.0.push(name);
        }
        self
    }

    pub fn nonzero(mut self, name: &'static str, value: u32) -> Self {
        if value == 0 {
            self.0.push(name);
        }
        self
    }

    pub fn some<T>(mut self, name: &'static str, value: &Option<T>) -> Self {
        if value.is_none() {
            self.0.push(name);
        }
        self
    }

    pub fn non_empty<T>(mut self, name: &'static str, values: &[T]) -> Self {
        if values.is_empty() {
            self.0.push(name);
        }
        self
    }

    pub fn finish(self) -> Vec<&'static str> {
        self.0
    }
}

/// Split a dotted field path into its segments.
pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

pub(crate) fn index(segment: &str) -> Option<usize> {
    segment.parse().ok()
}

/// Make an optional URL addressable, creating it empty if absent.
pub(crate) fn url_slot(url: &mut Option<String>) -> &mut String {
    url.get_or_insert_with(String::new)
}
