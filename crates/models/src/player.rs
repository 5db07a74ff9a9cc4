use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use crate::entity::{Entity, EntityKind, Missing, index, segments};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum PreferredFoot {
    Left,
    #[default]
    Right,
    Both,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_foot: Option<PreferredFoot>,
    pub location: String,
    pub preferred_position: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct TeamRecord {
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
}

/// A club the player has appeared for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamStats {
    pub image_url: String,
    pub team_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    pub stats: TeamRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct FixtureTeam {
    pub name: String,
    pub logo_url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct FixtureScore {
    pub team1: u32,
    pub team2: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct RecentFixture {
    pub competition: String,
    pub league_logo_url: String,
    pub date: String,
    pub stadium: String,
    pub team1: FixtureTeam,
    pub team2: FixtureTeam,
    pub score: FixtureScore,
}

impl RecentFixture {
    fn team_mut(&mut self, team: &str) -> Option<&mut FixtureTeam> {
        match team {
            "team1" => Some(&mut self.team1),
            "team2" => Some(&mut self.team2),
            _ => None,
        }
    }
}

/// A squad player with profile, career and recent fixtures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct Player {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub flag_image_url: String,
    pub image_url: String,
    /// Shirt number.
    pub number: u32,
    pub country: String,
    pub email: String,
    pub position: String,
    pub player_profile: PlayerProfile,
    pub teams_played_for: Vec<TeamStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_fixtures: Option<Vec<RecentFixture>>,
}

impl Player {
    pub fn plays(&self, position: &str) -> bool {
        self.position.eq_ignore_ascii_case(position.trim())
    }

    pub fn add_team(&mut self) -> &mut TeamStats {
        self.teams_played_for.push(TeamStats::default());
        let last = self.teams_played_for.len() - 1;
        &mut self.teams_played_for[last]
    }

    pub fn remove_team(&mut self, index: usize) -> Option<TeamStats> {
        (index < self.teams_played_for.len()).then(|| self.teams_played_for.remove(index))
    }

    pub fn add_recent_fixture(&mut self) -> &mut RecentFixture {
        let fixtures = self.recent_fixtures.get_or_insert_with(Vec::new);
        fixtures.push(RecentFixture {
            date: Utc::now().to_rfc3339(),
            ..RecentFixture::default()
        });
        let last = fixtures.len() - 1;
        &mut fixtures[last]
    }

    pub fn remove_recent_fixture(&mut self, index: usize) -> Option<RecentFixture> {
        let fixtures = self.recent_fixtures.as_mut()?;
        (index < fixtures.len()).then(|| fixtures.remove(index))
    }
}

impl Entity for Player {
    const KIND: EntityKind = EntityKind::Player;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blank() -> Self {
        Self {
            player_profile: PlayerProfile {
                preferred_foot: Some(PreferredFoot::Right),
                ..PlayerProfile::default()
            },
            recent_fixtures: Some(Vec::new()),
            ..Self::default()
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let profile = &self.player_profile;
        Missing::default()
            .text("name", &self.name)
            .image("flagImageUrl", &self.flag_image_url)
            .image("imageUrl", &self.image_url)
            .nonzero("number", self.number)
            .text("country", &self.country)
            .text("position", &self.position)
            .some("playerProfile.dateOfBirth", &profile.date_of_birth)
            .some("playerProfile.preferredFoot", &profile.preferred_foot)
            .text("playerProfile.location", &profile.location)
            .text("playerProfile.preferredPosition", &profile.preferred_position)
            .finish()
    }

    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        match segments(path).as_slice() {
            ["imageUrl"] => Some(&mut self.image_url),
            ["flagImageUrl"] => Some(&mut self.flag_image_url),
            ["teamsPlayedFor", i, "imageUrl"] => self
                .teams_played_for
                .get_mut(index(i)?)
                .map(|t| &mut t.image_url),
            ["recentFixtures", i, "league_logo_url"] => self
                .recent_fixtures
                .as_mut()?
                .get_mut(index(i)?)
                .map(|f| &mut f.league_logo_url),
            ["recentFixtures", i, team, "logo_url"] => self
                .recent_fixtures
                .as_mut()?
                .get_mut(index(i)?)?
                .team_mut(team)
                .map(|t| &mut t.logo_url),
            _ => None,
        }
    }
}
