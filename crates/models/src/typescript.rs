//! TypeScript declarations for every record, so the web dashboard can share
//! the shapes the backend exchanges.

use ts_rs::TS;

use crate::{
    banner::Banner,
    entity::EntityKind,
    featured_player::{FeaturedPlayer, FeaturedStats},
    fixture::{
        Fixture, Goal, Goals, HeadToHead, Lineup, LineupPlayer, MatchStatus, PreviousResult, Team,
        TeamLineup, TeamPair, TeamScore, TimeLeft,
    },
    league::League,
    news::News,
    player::{
        FixtureScore, FixtureTeam, Player, PlayerProfile, PreferredFoot, RecentFixture,
        TeamRecord, TeamStats,
    },
    sponsor::Sponsor,
    standing::Standing,
    star_performer::StarPerformer,
    trophy::Trophy,
    user::User,
};

const HEADER: &str = "// This file was generated by `crates/models/src/bin/generate_types.rs`.\n\n// Do not edit this file manually.\n\n";

/// The full contents of the generated `types.ts`.
pub fn declarations() -> String {
    let decls = [
        EntityKind::decl(),
        MatchStatus::decl(),
        Team::decl(),
        TeamPair::decl(),
        TimeLeft::decl(),
        HeadToHead::decl(),
        TeamScore::decl(),
        PreviousResult::decl(),
        Goal::decl(),
        Goals::decl(),
        LineupPlayer::decl(),
        Lineup::decl(),
        TeamLineup::decl(),
        Fixture::decl(),
        PreferredFoot::decl(),
        PlayerProfile::decl(),
        TeamRecord::decl(),
        TeamStats::decl(),
        FixtureTeam::decl(),
        FixtureScore::decl(),
        RecentFixture::decl(),
        Player::decl(),
        FeaturedStats::decl(),
        FeaturedPlayer::decl(),
        Banner::decl(),
        Sponsor::decl(),
        Trophy::decl(),
        League::decl(),
        News::decl(),
        Standing::decl(),
        StarPerformer::decl(),
        User::decl(),
    ];

    let body = decls
        .iter()
        .map(String::as_str)
        .map(exported)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{HEADER}{body}\n")
}

/// Prefix a declaration with `export`, keeping any leading doc comment first.
fn exported(decl: &str) -> String {
    let decl = decl.trim_start();
    let (docs, rest) = match decl.starts_with("/**").then(|| decl.find("*/")).flatten() {
        Some(end) => decl.split_at(end + 2),
        None => ("", decl),
    };
    let rest = rest.trim_start();
    if rest.starts_with("export ") {
        decl.to_string()
    } else if docs.is_empty() {
        format!("export {rest}")
    } else {
        format!("{docs}\nexport {rest}")
    }
}
