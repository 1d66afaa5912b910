use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    storage::{KeyValueStore, StorageError},
    types::{Direction, Language, Show, ShowId, Theme, Tier, TierEntry},
};

pub const STORAGE_KEY: &str = "app-storage";
const STATE_VERSION: u32 = 0;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub tier_items: Vec<TierEntry>,
    pub watchlist: Vec<Show>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub language: Language,
}

#[derive(Serialize, Deserialize)]
struct PersistedState<T> {
    state: T,
    version: u32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read persisted state")]
    Read(#[source] StorageError),
    #[error("failed to parse persisted state")]
    Parse(#[source] serde_json::Error),
    #[error("persisted state version {0} is newer than supported")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize state")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write state")]
    Write(#[source] StorageError),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&AppState)>;

/// Owner of the tier list and watchlist. Every effective mutation notifies
/// observers and is then written back to storage.
///
/// When a write fails the mutation is kept in memory and the store is marked
/// dirty. The next successful write, or an explicit [`TierStore::flush`],
/// brings storage back in line.
pub struct TierStore<S> {
    storage: S,
    state: AppState,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    dirty: bool,
}

impl<S: KeyValueStore> TierStore<S> {
    pub fn open(storage: S) -> Result<TierStore<S>, LoadError> {
        let serialized = storage.get(STORAGE_KEY).map_err(LoadError::Read)?;

        let state = match serialized {
            Some(v) => {
                let persisted: PersistedState<AppState> =
                    serde_json::from_str(&v).map_err(LoadError::Parse)?;
                if persisted.version > STATE_VERSION {
                    return Err(LoadError::UnsupportedVersion(persisted.version));
                }
                info!(
                    "Loaded {} tier entries and {} watchlist entries",
                    persisted.state.tier_items.len(),
                    persisted.state.watchlist.len()
                );
                persisted.state
            }
            None => {
                info!("No stored state, starting empty");
                AppState::default()
            }
        };

        Ok(TierStore {
            storage,
            state,
            observers: Vec::new(),
            next_subscription: 0,
            dirty: false,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn entry(&self, show_id: ShowId) -> Option<&TierEntry> {
        self.state.tier_items.iter().find(|e| e.show.id == show_id)
    }

    /// Entries of one tier in display order
    pub fn tier_entries(&self, tier: Tier) -> Vec<&TierEntry> {
        let mut entries = self
            .state
            .tier_items
            .iter()
            .filter(|e| e.tier == tier)
            .collect::<Vec<_>>();
        entries.sort_by_key(|e| e.order);
        entries
    }

    pub fn watchlist(&self) -> &[Show] {
        &self.state.watchlist
    }

    pub fn theme(&self) -> Theme {
        self.state.theme
    }

    pub fn language(&self) -> Language {
        self.state.language
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&AppState) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.observers.retain(|(observer_id, _)| *observer_id != id);
    }

    /// Adds a new show at the end of `tier`. A show that is already tracked
    /// only has its tier label replaced and keeps its current order, even if
    /// that order collides with an entry in the new tier
    pub fn assign_to_tier(&mut self, show: Show, tier: Tier) -> Result<(), PersistError> {
        self.update(|state| assign_to_tier(state, show, tier))
    }

    pub fn remove_from_tier(&mut self, show_id: ShowId) -> Result<(), PersistError> {
        self.update(|state| {
            let len = state.tier_items.len();
            state.tier_items.retain(|e| e.show.id != show_id);
            state.tier_items.len() != len
        })
    }

    /// Moves a tracked show to the end of `tier`
    pub fn move_to_tier(&mut self, show_id: ShowId, tier: Tier) -> Result<(), PersistError> {
        self.update(|state| {
            let order = next_order(&state.tier_items, tier);
            let Some(entry) = state.tier_items.iter_mut().find(|e| e.show.id == show_id) else {
                return false;
            };

            let changed = entry.tier != tier || entry.order != order;
            entry.tier = tier;
            entry.order = order;
            changed
        })
    }

    /// Swaps order with the neighbouring entry of the same tier
    pub fn reorder_in_tier(
        &mut self,
        show_id: ShowId,
        direction: Direction,
    ) -> Result<(), PersistError> {
        self.update(|state| reorder_in_tier(state, show_id, direction))
    }

    /// Renumbers `tier` to `0..n`, keeping its current display order
    pub fn normalize_tier(&mut self, tier: Tier) -> Result<(), PersistError> {
        self.update(|state| {
            let mut changed = false;
            for (rank, i) in tier_positions(&state.tier_items, tier)
                .into_iter()
                .enumerate()
            {
                let rank = rank as u32;
                if state.tier_items[i].order != rank {
                    state.tier_items[i].order = rank;
                    changed = true;
                }
            }
            changed
        })
    }

    pub fn add_to_watchlist(&mut self, show: Show) -> Result<(), PersistError> {
        self.update(|state| {
            if state.watchlist.iter().any(|s| s.id == show.id) {
                return false;
            }
            state.watchlist.push(show);
            true
        })
    }

    pub fn remove_from_watchlist(&mut self, show_id: ShowId) -> Result<(), PersistError> {
        self.update(|state| remove_from_watchlist(state, show_id))
    }

    /// Moves a watchlist show into the pool as a single state change
    pub fn move_watchlist_to_pool(&mut self, show_id: ShowId) -> Result<(), PersistError> {
        self.update(|state| {
            let Some(show) = state.watchlist.iter().find(|s| s.id == show_id).cloned() else {
                return false;
            };

            assign_to_tier(state, show, Tier::Pool);
            remove_from_watchlist(state, show_id)
        })
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), PersistError> {
        self.update(|state| std::mem::replace(&mut state.theme, theme) != theme)
    }

    pub fn set_language(&mut self, language: Language) -> Result<(), PersistError> {
        self.update(|state| std::mem::replace(&mut state.language, language) != language)
    }

    /// Drops every tracked show. Theme and language are kept
    pub fn clear_all_data(&mut self) -> Result<(), PersistError> {
        self.update(|state| {
            let changed = !state.tier_items.is_empty() || !state.watchlist.is_empty();
            state.tier_items.clear();
            state.watchlist.clear();
            changed
        })
    }

    pub fn flush(&mut self) -> Result<(), PersistError> {
        let persisted = PersistedState {
            state: &self.state,
            version: STATE_VERSION,
        };
        let serialized = serde_json::to_string(&persisted).map_err(PersistError::Serialize)?;

        if let Err(e) = self.storage.set(STORAGE_KEY, &serialized) {
            warn!("Failed to persist state: {e}");
            return Err(PersistError::Write(e));
        }

        debug!("Persisted {} bytes of state", serialized.len());
        self.dirty = false;
        Ok(())
    }

    fn update<F>(&mut self, f: F) -> Result<(), PersistError>
    where
        F: FnOnce(&mut AppState) -> bool,
    {
        if !f(&mut self.state) {
            return Ok(());
        }

        for (_, observer) in &mut self.observers {
            observer(&self.state);
        }

        self.dirty = true;
        self.flush()
    }
}

fn next_order(items: &[TierEntry], tier: Tier) -> u32 {
    items
        .iter()
        .filter(|e| e.tier == tier)
        .map(|e| e.order.saturating_add(1))
        .max()
        .unwrap_or(0)
}

/// Indices into `items` for `tier`, sorted by order. Ties keep insertion order
fn tier_positions(items: &[TierEntry], tier: Tier) -> Vec<usize> {
    let mut positions = items
        .iter()
        .enumerate()
        .filter(|(_, e)| e.tier == tier)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    positions.sort_by_key(|&i| items[i].order);
    positions
}

fn assign_to_tier(state: &mut AppState, show: Show, tier: Tier) -> bool {
    if let Some(entry) = state.tier_items.iter_mut().find(|e| e.show.id == show.id) {
        if entry.tier == tier {
            return false;
        }
        entry.tier = tier;
        return true;
    }

    let order = next_order(&state.tier_items, tier);
    state.tier_items.push(TierEntry { show, tier, order });
    true
}

fn reorder_in_tier(state: &mut AppState, show_id: ShowId, direction: Direction) -> bool {
    let Some(tier) = state
        .tier_items
        .iter()
        .find(|e| e.show.id == show_id)
        .map(|e| e.tier)
    else {
        return false;
    };

    let positions = tier_positions(&state.tier_items, tier);
    let Some(p) = positions
        .iter()
        .position(|&i| state.tier_items[i].show.id == show_id)
    else {
        return false;
    };

    let neighbour = match direction {
        Direction::Left => p.checked_sub(1),
        Direction::Right => Some(p + 1).filter(|&n| n < positions.len()),
    };
    let Some(n) = neighbour else {
        return false;
    };

    let (a, b) = (positions[p], positions[n]);
    let (order_a, order_b) = (state.tier_items[a].order, state.tier_items[b].order);
    state.tier_items[a].order = order_b;
    state.tier_items[b].order = order_a;
    order_a != order_b
}

fn remove_from_watchlist(state: &mut AppState, show_id: ShowId) -> bool {
    let len = state.watchlist.len();
    state.watchlist.retain(|s| s.id != show_id);
    state.watchlist.len() != len
}
