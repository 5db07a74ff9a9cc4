//! One-line summaries of records for terminal tables.

use models::{
    Entity, banner::Banner, featured_player::FeaturedPlayer, fixture::Fixture, league::League,
    news::News, player::Player, sponsor::Sponsor, standing::Standing,
    star_performer::StarPerformer, trophy::Trophy, user::User,
};

pub trait Describe: Entity {
    fn describe(&self) -> String;
}

impl Describe for Fixture {
    fn describe(&self) -> String {
        let status = self
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} {} {}-{} {} ({}, {})",
            self.date,
            self.team1.name,
            self.score.team1,
            self.score.team2,
            self.team2.name,
            self.competition,
            status
        )
    }
}

impl Describe for Player {
    fn describe(&self) -> String {
        format!(
            "#{} {} {} ({})",
            self.number, self.name, self.position, self.country
        )
    }
}

impl Describe for FeaturedPlayer {
    fn describe(&self) -> String {
        format!(
            "{} {} {} rank {}",
            self.name, self.club, self.position, self.stats.rank
        )
    }
}

impl Describe for Banner {
    fn describe(&self) -> String {
        self.image_url.clone()
    }
}

impl Describe for Sponsor {
    fn describe(&self) -> String {
        format!("{} -> {}", self.image_url, self.link_url)
    }
}

impl Describe for Trophy {
    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl Describe for League {
    fn describe(&self) -> String {
        format!(
            "{} {}..{} ({} views)",
            self.league,
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d"),
            self.views
        )
    }
}

impl Describe for News {
    fn describe(&self) -> String {
        format!(
            "{} [{}] {} by {}",
            self.date.format("%Y-%m-%d"),
            self.category,
            self.title,
            self.by
        )
    }
}

impl Describe for Standing {
    fn describe(&self) -> String {
        format!(
            "{:>2}. {} P{} W{} D{} L{} {} {}pts {}",
            self.position,
            self.club,
            self.played,
            self.won,
            self.drawn,
            self.lost,
            self.goals,
            self.points,
            self.last5.join("")
        )
    }
}

impl Describe for StarPerformer {
    fn describe(&self) -> String {
        format!(
            "{} {} ({}) G{} A{} M{}",
            self.name,
            self.achievement,
            self.tournament,
            self.goals,
            self.assists,
            self.matches_played
        )
    }
}

impl Describe for User {
    fn describe(&self) -> String {
        match &self.phone_number {
            Some(phone) => format!("{} <{}> {}", self.name, self.email, phone),
            None => format!("{} <{}>", self.name, self.email),
        }
    }
}

/// `id  summary` lines, or pretty JSON.
pub fn rows<T: Describe>(rows: &[T], json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(rows)?);
    }

    let width = rows
        .iter()
        .filter_map(Entity::id)
        .map(str::len)
        .max()
        .unwrap_or(0);
    let lines: Vec<String> = rows
        .iter()
        .map(|row| format!("{:width$}  {}", row.id().unwrap_or("-"), row.describe()))
        .collect();
    Ok(lines.join("\n"))
}
