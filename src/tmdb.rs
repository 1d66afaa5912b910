use chrono::NaiveDate;
use isahc::{error::Error as IsahcError, http::StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

use std::io::Read;

use crate::{
    catalog::Catalog,
    types::{CatalogShow, Episode, EpisodeId, Show, ShowId},
};

const API_ROOT: &str = "https://api.themoviedb.org/3";
const IMAGE_ROOT: &str = "https://image.tmdb.org/t/p";

pub const POSTER_SIZE: u32 = 500;
pub const BACKDROP_SIZE: u32 = 1280;

/// Full image url for a catalog image path. Shows without artwork get a
/// placeholder sized like a poster
pub fn image_url(path: Option<&str>, size: u32) -> String {
    match path {
        Some(path) if !path.is_empty() => format!("{IMAGE_ROOT}/w{size}{path}"),
        _ => "https://via.placeholder.com/500x750?text=No+Image".to_string(),
    }
}

pub fn backdrop_url(path: Option<&str>, size: u32) -> String {
    match path {
        Some(path) if !path.is_empty() => format!("{IMAGE_ROOT}/w{size}{path}"),
        _ => "https://via.placeholder.com/1280x720?text=No+Image".to_string(),
    }
}

#[derive(Deserialize, Debug)]
struct ApiPage<T> {
    results: Vec<T>,
}

#[derive(Deserialize, Debug)]
struct ApiShow {
    id: ShowId,
    name: String,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    genre_ids: Vec<i64>,
    #[serde(default)]
    vote_average: f64,
    first_air_date: Option<String>,
}

impl From<ApiShow> for CatalogShow {
    fn from(value: ApiShow) -> Self {
        CatalogShow {
            id: value.id,
            title: value.name,
            poster_path: value.poster_path,
            backdrop_path: value.backdrop_path,
            overview: value.overview,
            genre_ids: value.genre_ids,
            vote_average: value.vote_average,
            first_air_date: value.first_air_date,
        }
    }
}

#[derive(Deserialize, Debug)]
struct ApiGenre {
    name: String,
}

#[derive(Deserialize, Debug)]
struct ApiShowDetails {
    id: ShowId,
    name: String,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    genres: Vec<ApiGenre>,
    #[serde(default)]
    vote_average: f64,
    first_air_date: Option<String>,
    #[serde(default)]
    number_of_seasons: u32,
    #[serde(default)]
    number_of_episodes: u32,
}

impl From<ApiShowDetails> for Show {
    fn from(value: ApiShowDetails) -> Self {
        Show {
            id: value.id,
            title: value.name,
            poster_path: value.poster_path,
            backdrop_path: value.backdrop_path,
            overview: value.overview,
            genres: value.genres.into_iter().map(|g| g.name).collect(),
            vote_average: value.vote_average,
            first_air_date: value.first_air_date.unwrap_or_default(),
            number_of_seasons: value.number_of_seasons,
            number_of_episodes: value.number_of_episodes,
        }
    }
}

#[derive(Deserialize, Debug)]
struct ApiEpisode {
    id: EpisodeId,
    season_number: u32,
    episode_number: u32,
    name: String,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    vote_average: f64,
    air_date: Option<String>,
}

impl From<ApiEpisode> for Episode {
    fn from(value: ApiEpisode) -> Self {
        let air_date = value
            .air_date
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());
        Episode {
            id: value.id,
            season_number: value.season_number,
            episode_number: value.episode_number,
            name: value.name,
            overview: value.overview,
            vote_average: value.vote_average,
            air_date,
        }
    }
}

#[derive(Deserialize, Debug)]
struct ApiSeason {
    episodes: Vec<ApiEpisode>,
}

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("failed to execute get")]
    Get(#[from] IsahcError),
    #[error("failed to read body")]
    Read(#[from] std::io::Error),
    #[error("request failed with status {0}")]
    Status(StatusCode),
    #[error("failed to parse response")]
    Parse(#[from] serde_json::Error),
}

pub struct TmdbClient {
    api_key: String,
}

impl TmdbClient {
    pub fn new(api_key: String) -> TmdbClient {
        TmdbClient { api_key }
    }

    fn request<T: DeserializeOwned>(&self, path: &str, params: &str) -> Result<T, TmdbError> {
        let separator = if params.is_empty() { "" } else { "&" };
        let mut url = format!("{API_ROOT}{path}?{params}{separator}api_key=");
        debug!("Sending request to {url}xxxxx");
        url.push_str(&self.api_key);

        let mut response = isahc::get(url)?;
        if !response.status().is_success() {
            return Err(TmdbError::Status(response.status()));
        }

        let mut body_s = String::new();
        response.body_mut().read_to_string(&mut body_s)?;

        debug!("Returned content {}", body_s);
        Ok(serde_json::from_str(&body_s)?)
    }
}

impl Catalog for TmdbClient {
    type Err = TmdbError;

    fn search(&self, query: &str) -> Result<Vec<CatalogShow>, TmdbError> {
        let query: &str = &urlencoding::encode(query);
        let page: ApiPage<ApiShow> = self.request("/search/tv", &format!("query={query}"))?;
        Ok(page.results.into_iter().map(Into::into).collect())
    }

    fn details(&self, id: ShowId) -> Result<Show, TmdbError> {
        let details: ApiShowDetails = self.request(&format!("/tv/{id}"), "")?;
        Ok(details.into())
    }

    fn season_episodes(&self, id: ShowId, season: u32) -> Result<Vec<Episode>, TmdbError> {
        let season: ApiSeason = self.request(&format!("/tv/{id}/season/{season}"), "")?;
        Ok(season.episodes.into_iter().map(Into::into).collect())
    }

    fn related(&self, id: ShowId) -> Result<Vec<CatalogShow>, TmdbError> {
        let page: ApiPage<ApiShow> = self.request(&format!("/tv/{id}/recommendations"), "")?;
        Ok(page.results.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_search_deserialization() {
        let body = include_bytes!("../res/tmdb/search_result_dark.json");
        let page = serde_json::from_slice::<ApiPage<ApiShow>>(body).expect("Failed to deserialize");
        let shows = page
            .results
            .into_iter()
            .map(CatalogShow::from)
            .collect::<Vec<_>>();

        assert_eq!(shows.len(), 2);
        assert_eq!(shows[0].id, ShowId(70523));
        assert_eq!(shows[0].title, "Dark");
        assert_eq!(shows[0].genre_ids, vec![80, 18, 9648, 10765]);
        assert_eq!(shows[1].poster_path, None);
        assert_eq!(shows[1].first_air_date, None);
    }

    #[test]
    fn test_details_deserialization() {
        let body = include_bytes!("../res/tmdb/details_dark.json");
        let show: Show = serde_json::from_slice::<ApiShowDetails>(body)
            .expect("Failed to deserialize")
            .into();

        assert_eq!(show.id, ShowId(70523));
        assert_eq!(show.genres, vec!["Crime", "Drama", "Mystery"]);
        assert_eq!(show.number_of_seasons, 3);
        assert_eq!(show.number_of_episodes, 26);
        assert_eq!(show.first_air_date, "2017-12-01");
        assert_eq!(show.backdrop_path, None);
    }

    #[test]
    fn test_season_deserialization() {
        let body = include_bytes!("../res/tmdb/season_dark_1.json");
        let season = serde_json::from_slice::<ApiSeason>(body).expect("Failed to deserialize");
        let episodes = season
            .episodes
            .into_iter()
            .map(Episode::from)
            .collect::<Vec<_>>();

        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].season_number, 1);
        assert_eq!(episodes[0].episode_number, 1);
        assert_eq!(episodes[0].air_date, NaiveDate::from_ymd_opt(2017, 12, 1));
        // Unaired episodes come back with no date and a zero rating
        assert_eq!(episodes[2].air_date, None);
        assert_eq!(episodes[2].vote_average, 0.0);
    }

    #[test]
    fn test_image_urls() {
        assert_eq!(
            image_url(Some("/abc.jpg"), POSTER_SIZE),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
        assert_eq!(
            backdrop_url(Some("/abc.jpg"), BACKDROP_SIZE),
            "https://image.tmdb.org/t/p/w1280/abc.jpg"
        );
        assert!(image_url(None, POSTER_SIZE).contains("placeholder"));
        assert!(backdrop_url(Some(""), BACKDROP_SIZE).contains("1280x720"));
    }
}
