use tracing::error;

use std::fmt::{Debug, Display};

use crate::types::{CatalogShow, Episode, Show, ShowId};

/// Read-only source of show and episode metadata
pub trait Catalog {
    type Err: Debug + Display;
    fn search(&self, query: &str) -> Result<Vec<CatalogShow>, Self::Err>;
    fn details(&self, id: ShowId) -> Result<Show, Self::Err>;
    fn season_episodes(&self, id: ShowId, season: u32) -> Result<Vec<Episode>, Self::Err>;
    fn related(&self, id: ShowId) -> Result<Vec<CatalogShow>, Self::Err>;
}

/// Fetches every season of a show in sequence. Seasons that fail to load are
/// logged and left out
pub fn all_episodes<C: Catalog>(catalog: &C, id: ShowId, season_count: u32) -> Vec<Episode> {
    let mut ret = Vec::new();

    for season in 1..=season_count {
        match catalog.season_episodes(id, season) {
            Ok(episodes) => ret.extend(episodes),
            Err(e) => {
                error!("Failed to get season {season} of {id}: {e}");
            }
        }
    }

    ret
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::types::EpisodeId;

    use std::{cell::RefCell, collections::HashMap};

    #[derive(Debug)]
    pub struct FakeCatalogError;

    impl Display for FakeCatalogError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("fake catalog failure")
        }
    }

    /// In-memory catalog. Unknown ids fail the way a missing remote entry would
    #[derive(Default)]
    pub struct FakeCatalog {
        pub shows: HashMap<ShowId, Show>,
        pub related: HashMap<ShowId, Vec<CatalogShow>>,
        pub seasons: HashMap<(ShowId, u32), Vec<Episode>>,
        pub details_calls: RefCell<Vec<ShowId>>,
    }

    impl Catalog for FakeCatalog {
        type Err = FakeCatalogError;

        fn search(&self, query: &str) -> Result<Vec<CatalogShow>, FakeCatalogError> {
            Ok(self
                .shows
                .values()
                .filter(|s| s.title.contains(query))
                .map(|s| catalog_show(s.id.0, true))
                .collect())
        }

        fn details(&self, id: ShowId) -> Result<Show, FakeCatalogError> {
            self.details_calls.borrow_mut().push(id);
            self.shows.get(&id).cloned().ok_or(FakeCatalogError)
        }

        fn season_episodes(&self, id: ShowId, season: u32) -> Result<Vec<Episode>, FakeCatalogError> {
            self.seasons
                .get(&(id, season))
                .cloned()
                .ok_or(FakeCatalogError)
        }

        fn related(&self, id: ShowId) -> Result<Vec<CatalogShow>, FakeCatalogError> {
            self.related.get(&id).cloned().ok_or(FakeCatalogError)
        }
    }

    pub fn show(id: i64) -> Show {
        Show {
            id: ShowId(id),
            title: format!("Show {id}"),
            poster_path: Some(format!("/poster_{id}.jpg")),
            backdrop_path: None,
            overview: String::new(),
            genres: Vec::new(),
            vote_average: 7.0,
            first_air_date: "2019-05-01".to_string(),
            number_of_seasons: 2,
            number_of_episodes: 20,
        }
    }

    pub fn catalog_show(id: i64, with_poster: bool) -> CatalogShow {
        CatalogShow {
            id: ShowId(id),
            title: format!("Show {id}"),
            poster_path: with_poster.then(|| format!("/poster_{id}.jpg")),
            backdrop_path: None,
            overview: String::new(),
            genre_ids: Vec::new(),
            vote_average: 7.0,
            first_air_date: None,
        }
    }

    pub fn episode(season: u32, number: u32, rating: f64) -> Episode {
        Episode {
            id: EpisodeId(i64::from(season * 100 + number)),
            season_number: season,
            episode_number: number,
            name: format!("Episode {number}"),
            overview: String::new(),
            vote_average: rating,
            air_date: None,
        }
    }

    #[test]
    fn test_all_episodes_skips_failed_seasons() {
        let mut catalog = FakeCatalog::default();
        let id = ShowId(1);
        catalog
            .seasons
            .insert((id, 1), vec![episode(1, 1, 8.0), episode(1, 2, 7.0)]);
        catalog.seasons.insert((id, 3), vec![episode(3, 1, 9.0)]);

        let episodes = all_episodes(&catalog, id, 3);
        assert_eq!(
            episodes
                .iter()
                .map(|e| (e.season_number, e.episode_number))
                .collect::<Vec<_>>(),
            vec![(1, 1), (1, 2), (3, 1)]
        );
    }

    #[test]
    fn test_all_episodes_without_seasons() {
        let catalog = FakeCatalog::default();
        assert!(all_episodes(&catalog, ShowId(1), 0).is_empty());
    }
}
