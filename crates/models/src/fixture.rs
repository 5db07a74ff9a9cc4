use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use crate::{
    entity::{Entity, EntityKind, Missing, PLACEHOLDER_LOGO_URL, index, segments, url_slot},
    featured_player::FeaturedPlayer,
};

/// Where a match sits in its lifecycle. The match screens partition the
/// collection on exactly these three values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum MatchStatus {
    Live,
    Upcoming,
    Completed,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 3] = [
        MatchStatus::Live,
        MatchStatus::Upcoming,
        MatchStatus::Completed,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Team {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Team {
    fn placeholder() -> Self {
        Self {
            name: String::new(),
            logo_url: Some(PLACEHOLDER_LOGO_URL.to_string()),
        }
    }
}

/// A per-team pair of counters (score, penalties, head-to-head wins).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct TeamPair {
    pub team1: u32,
    pub team2: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeLeft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_left: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_left: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct HeadToHead {
    pub played: u32,
    pub wins: TeamPair,
    pub home_wins: TeamPair,
    pub away_wins: TeamPair,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct TeamScore {
    pub score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct PreviousResult {
    pub team1: TeamScore,
    pub team2: TeamScore,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Goal {
    pub player: String,
    pub assist: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Goals {
    pub team1: Vec<Goal>,
    pub team2: Vec<Goal>,
}

/// A player named in a match lineup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct LineupPlayer {
    pub number: u32,
    pub name: String,
    pub image_url: String,
    pub position: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Lineup {
    pub lineup: Vec<LineupPlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct TeamLineup {
    pub team1: Lineup,
    pub team2: Lineup,
}

/// A match, past, present or scheduled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct Fixture {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub competition: String,
    #[serde(rename = "league_logo_url", skip_serializing_if = "Option::is_none")]
    pub league_logo_url: Option<String>,
    /// ISO-8601 date as entered by the editor.
    pub date: String,
    pub stadium: String,
    pub team1: Team,
    pub team2: Team,
    /// Unset on a fresh draft. Blank or unrecognised values read as unset.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_status"
    )]
    pub status: Option<MatchStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Full time reached.
    #[serde(rename = "FT")]
    pub full_time: bool,
    pub score: TeamPair,
    pub penalties: bool,
    pub pens: TeamPair,
    pub time_left: TimeLeft,
    pub match_type: String,
    pub head_to_head: HeadToHead,
    pub previous_result: PreviousResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<Goals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_defender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_midfielder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_player: Option<FeaturedPlayer>,
    pub team_lineup: TeamLineup,
}

/// Accept any casing; anything that is not one of the three statuses is `None`.
fn lenient_status<'de, D: Deserializer<'de>>(d: D) -> Result<Option<MatchStatus>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

impl Fixture {
    pub fn has_status(&self, status: MatchStatus) -> bool {
        self.status == Some(status)
    }

    fn lineup_mut(&mut self, team: &str) -> Option<&mut Vec<LineupPlayer>> {
        match team {
            "team1" => Some(&mut self.team_lineup.team1.lineup),
            "team2" => Some(&mut self.team_lineup.team2.lineup),
            _ => None,
        }
    }
}

impl Entity for Fixture {
    const KIND: EntityKind = EntityKind::Match;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn blank() -> Self {
        Self {
            league_logo_url: Some(PLACEHOLDER_LOGO_URL.to_string()),
            team1: Team::placeholder(),
            team2: Team::placeholder(),
            time: Some(String::new()),
            full_time: true,
            time_left: TimeLeft {
                days_left: Some(0),
                hours_left: Some(0),
            },
            goals: Some(Goals::default()),
            best_defender: Some(String::new()),
            best_midfielder: Some(String::new()),
            featured_player: Some(FeaturedPlayer::blank()),
            ..Self::default()
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        Missing::default()
            .text("competition", &self.competition)
            .text("date", &self.date)
            .text("stadium", &self.stadium)
            .text("team1.name", &self.team1.name)
            .text("team2.name", &self.team2.name)
            .some("status", &self.status)
            .text("matchType", &self.match_type)
            .non_empty("teamLineup.team1", &self.team_lineup.team1.lineup)
            .non_empty("teamLineup.team2", &self.team_lineup.team2.lineup)
            .finish()
    }

    fn image_mut(&mut self, path: &str) -> Option<&mut String> {
        match segments(path).as_slice() {
            ["league_logo_url"] => Some(url_slot(&mut self.league_logo_url)),
            ["team1", "logo_url"] => Some(url_slot(&mut self.team1.logo_url)),
            ["team2", "logo_url"] => Some(url_slot(&mut self.team2.logo_url)),
            ["featuredPlayer", "imageUrl"] => self
                .featured_player
                .get_or_insert_with(FeaturedPlayer::blank)
                .image_mut("imageUrl"),
            ["teamLineup", team, i, "imageUrl"] => {
                let i = index(i)?;
                self.lineup_mut(team)?.get_mut(i).map(|p| &mut p.image_url)
            }
            _ => None,
        }
    }
}
