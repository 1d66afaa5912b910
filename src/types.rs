use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::{fmt, str::FromStr};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ShowId(pub i64);

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct EpisodeId(pub i64);

/// Catalog snapshot of a show, frozen at the moment it was added
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    pub overview: String,
    pub genres: Vec<String>,
    pub vote_average: f64,
    pub first_air_date: String,
    pub number_of_seasons: u32,
    pub number_of_episodes: u32,
}

/// Search or related-show result, before details are fetched
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogShow {
    pub id: ShowId,
    pub title: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub overview: String,
    pub genre_ids: Vec<i64>,
    pub vote_average: f64,
    pub first_air_date: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Episode {
    pub id: EpisodeId,
    pub season_number: u32,
    pub episode_number: u32,
    pub name: String,
    pub overview: String,
    pub vote_average: f64,
    pub air_date: Option<chrono::NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Tier {
    S,
    A,
    B,
    C,
    D,
    F,
    #[serde(rename = "pool")]
    Pool,
}

impl Tier {
    /// Ranked tiers, strongest first. Does not include the pool
    pub const RANKED: [Tier; 6] = [Tier::S, Tier::A, Tier::B, Tier::C, Tier::D, Tier::F];

    pub fn is_top(&self) -> bool {
        matches!(self, Tier::S | Tier::A)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::S => "S",
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
            Tier::D => "D",
            Tier::F => "F",
            Tier::Pool => "pool",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("unknown value {0}")]
pub struct ParseLabelError(pub String);

impl FromStr for Tier {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Tier, ParseLabelError> {
        let tier = match s {
            "S" | "s" => Tier::S,
            "A" | "a" => Tier::A,
            "B" | "b" => Tier::B,
            "C" | "c" => Tier::C,
            "D" | "d" => Tier::D,
            "F" | "f" => Tier::F,
            "pool" => Tier::Pool,
            _ => return Err(ParseLabelError(s.to_string())),
        };
        Ok(tier)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TierEntry {
    #[serde(flatten)]
    pub show: Show,
    pub tier: Tier,
    pub order: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Tr,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    Left,
    Right,
}

impl FromStr for Theme {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Theme, ParseLabelError> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(ParseLabelError(s.to_string())),
        }
    }
}

impl FromStr for Language {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Language, ParseLabelError> {
        match s {
            "en" => Ok(Language::En),
            "tr" => Ok(Language::Tr),
            _ => Err(ParseLabelError(s.to_string())),
        }
    }
}
