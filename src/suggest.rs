use rand::{seq::SliceRandom, Rng};
use tracing::{error, info};

use crate::{
    catalog::Catalog,
    tier_store::AppState,
    types::{Show, ShowId},
};

const SEED_COUNT: usize = 2;
const MAX_SUGGESTIONS: usize = 10;

/// Samples shows related to a couple of random S and A tier entries.
///
/// Candidates already tracked in a tier or on the watchlist are skipped, as
/// are candidates without a poster. The result is shuffled, there is no
/// ranking. A catalog failure while processing a seed abandons that seed.
pub fn suggest_shows<C, R>(catalog: &C, state: &AppState, rng: &mut R) -> Vec<Show>
where
    C: Catalog,
    R: Rng + ?Sized,
{
    let mut top = state
        .tier_items
        .iter()
        .filter(|e| e.tier.is_top())
        .collect::<Vec<_>>();

    if top.is_empty() {
        return Vec::new();
    }

    top.shuffle(rng);

    let mut ret: Vec<Show> = Vec::new();
    for seed in top.into_iter().take(SEED_COUNT) {
        if let Err(e) = collect_related(catalog, state, seed.show.id, &mut ret) {
            error!("Failed to get suggestions for {}: {e}", seed.show.id);
        }

        if ret.len() >= MAX_SUGGESTIONS {
            break;
        }
    }

    info!("Collected {} suggestions", ret.len());
    ret.shuffle(rng);
    ret
}

fn collect_related<C: Catalog>(
    catalog: &C,
    state: &AppState,
    seed: ShowId,
    ret: &mut Vec<Show>,
) -> Result<(), C::Err> {
    for candidate in catalog.related(seed)? {
        let tracked = state.tier_items.iter().any(|e| e.show.id == candidate.id)
            || state.watchlist.iter().any(|s| s.id == candidate.id);
        let collected = ret.iter().any(|s| s.id == candidate.id);

        let no_poster = candidate.poster_path.as_deref().map_or(true, str::is_empty);

        if tracked || collected || no_poster {
            continue;
        }

        ret.push(catalog.details(candidate.id)?);
        if ret.len() >= MAX_SUGGESTIONS {
            break;
        }
    }

    Ok(())
}
