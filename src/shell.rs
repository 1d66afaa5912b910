use rand::Rng;
use thiserror::Error;
use tracing::{error, warn};

use std::{
    io::{self, BufRead, Write},
    num::ParseIntError,
};

use crate::{
    catalog::{self, Catalog},
    heatmap::{Heatmap, RatingBand},
    storage::KeyValueStore,
    suggest,
    tier_store::{PersistError, TierStore},
    tmdb,
    types::{Direction, Language, ParseLabelError, Show, ShowId, Theme, Tier},
};

#[derive(Debug, Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0}")]
    Unknown(String),
    #[error("missing argument for {0}")]
    MissingArg(&'static str),
    #[error("invalid show id")]
    InvalidId(#[source] ParseIntError),
    #[error("invalid tier")]
    InvalidTier(#[source] ParseLabelError),
    #[error("invalid theme")]
    InvalidTheme(#[source] ParseLabelError),
    #[error("invalid language")]
    InvalidLanguage(#[source] ParseLabelError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search(String),
    Add(ShowId, Tier),
    Assign(ShowId, Tier),
    Move(ShowId, Tier),
    Reorder(ShowId, Direction),
    Remove(ShowId),
    Normalize(Tier),
    Watch(ShowId),
    Unwatch(ShowId),
    Pool(ShowId),
    List,
    Watchlist,
    SetTheme(Theme),
    SetLanguage(Language),
    Clear,
    Suggest,
    Heatmap(ShowId),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, ParseCommandError> {
        use ParseCommandError::*;

        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let mut args = rest.split_whitespace();

        let id = |arg: Option<&str>, command: &'static str| -> Result<ShowId, ParseCommandError> {
            let arg = arg.ok_or(MissingArg(command))?;
            Ok(ShowId(arg.parse().map_err(InvalidId)?))
        };
        let tier = |arg: Option<&str>, command: &'static str| -> Result<Tier, ParseCommandError> {
            arg.ok_or(MissingArg(command))?.parse().map_err(InvalidTier)
        };

        let command = match name {
            "" => return Err(Empty),
            "search" => {
                if rest.is_empty() {
                    return Err(MissingArg("search"));
                }
                Command::Search(rest.to_string())
            }
            "add" => {
                let show_id = id(args.next(), "add")?;
                let tier = match args.next() {
                    Some(v) => v.parse().map_err(InvalidTier)?,
                    None => Tier::Pool,
                };
                Command::Add(show_id, tier)
            }
            "assign" => Command::Assign(id(args.next(), "assign")?, tier(args.next(), "assign")?),
            "tier" => Command::Move(id(args.next(), "tier")?, tier(args.next(), "tier")?),
            "left" => Command::Reorder(id(args.next(), "left")?, Direction::Left),
            "right" => Command::Reorder(id(args.next(), "right")?, Direction::Right),
            "remove" => Command::Remove(id(args.next(), "remove")?),
            "normalize" => Command::Normalize(tier(args.next(), "normalize")?),
            "watch" => Command::Watch(id(args.next(), "watch")?),
            "unwatch" => Command::Unwatch(id(args.next(), "unwatch")?),
            "pool" => Command::Pool(id(args.next(), "pool")?),
            "list" => Command::List,
            "watchlist" => Command::Watchlist,
            "theme" => Command::SetTheme(
                args.next()
                    .ok_or(MissingArg("theme"))?
                    .parse()
                    .map_err(InvalidTheme)?,
            ),
            "lang" => Command::SetLanguage(
                args.next()
                    .ok_or(MissingArg("lang"))?
                    .parse()
                    .map_err(InvalidLanguage)?,
            ),
            "clear" => Command::Clear,
            "suggest" => Command::Suggest,
            "heatmap" => Command::Heatmap(id(args.next(), "heatmap")?),
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(Unknown(name.to_string())),
        };

        Ok(command)
    }

    pub fn help() -> &'static str {
        "Commands:\n\
            search <term>: Search the catalog\n\
            add <id> [tier]: Add a show to a tier, the pool by default\n\
            assign <id> <tier>: Relabel a show, a tracked show keeps its order\n\
            tier <id> <tier>: Move a tracked show to the end of a tier\n\
            left <id>, right <id>: Swap a show with its neighbour\n\
            remove <id>: Stop tracking a show\n\
            normalize <tier>: Renumber a tier without gaps\n\
            watch <id>, unwatch <id>: Edit the watchlist\n\
            pool <id>: Move a watchlist show into the pool\n\
            list, watchlist: Show tracked shows\n\
            theme <dark|light>, lang <en|tr>: Settings\n\
            clear: Remove every tracked show\n\
            suggest: Suggest shows related to S and A tier entries\n\
            heatmap <id>: Episode ratings for a show\n\
            quit: Exit"
    }
}

/// Line driven front end. Each input line is handled to completion before the
/// next one is read
pub struct Shell<S, C, R, W> {
    store: TierStore<S>,
    catalog: C,
    rng: R,
    output: W,
    last_suggestions: Vec<Show>,
}

impl<S, C, R, W> Shell<S, C, R, W>
where
    S: KeyValueStore,
    C: Catalog,
    R: Rng,
    W: Write,
{
    pub fn new(store: TierStore<S>, catalog: C, rng: R, output: W) -> Shell<S, C, R, W> {
        Shell {
            store,
            catalog,
            rng,
            output,
            last_suggestions: Vec::new(),
        }
    }

    pub fn run<I: BufRead>(&mut self, input: I) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let command = match Command::parse(&line) {
                Ok(v) => v,
                Err(e) => {
                    writeln!(self.output, "{e}")?;
                    continue;
                }
            };

            if command == Command::Quit {
                break;
            }

            self.execute(command)?;
        }

        if self.store.is_dirty() {
            if let Err(e) = self.store.flush() {
                error!("Exiting with unsaved changes: {e}");
            }
        }

        Ok(())
    }

    pub fn execute(&mut self, command: Command) -> io::Result<()> {
        let res = match command {
            Command::Search(query) => return self.handle_search(&query),
            Command::Add(id, tier) => match self.fetch_show(id) {
                Some(show) => self.store.assign_to_tier(show, tier),
                None => return Ok(()),
            },
            Command::Assign(id, tier) => {
                let tracked = self.store.entry(id).map(|e| e.show.clone());
                match tracked.or_else(|| self.fetch_show(id)) {
                    Some(show) => self.store.assign_to_tier(show, tier),
                    None => return Ok(()),
                }
            }
            Command::Move(id, tier) => self.store.move_to_tier(id, tier),
            Command::Reorder(id, direction) => self.store.reorder_in_tier(id, direction),
            Command::Remove(id) => self.store.remove_from_tier(id),
            Command::Normalize(tier) => self.store.normalize_tier(tier),
            Command::Watch(id) => match self.fetch_show(id) {
                Some(show) => self.store.add_to_watchlist(show),
                None => return Ok(()),
            },
            Command::Unwatch(id) => self.store.remove_from_watchlist(id),
            Command::Pool(id) => self.store.move_watchlist_to_pool(id),
            Command::List => return self.handle_list(),
            Command::Watchlist => return self.handle_watchlist(),
            Command::SetTheme(theme) => self.store.set_theme(theme),
            Command::SetLanguage(language) => self.store.set_language(language),
            Command::Clear => self.store.clear_all_data(),
            Command::Suggest => return self.handle_suggest(),
            Command::Heatmap(id) => return self.handle_heatmap(id),
            Command::Help => return writeln!(self.output, "{}", Command::help()),
            Command::Quit => return Ok(()),
        };

        self.report_persist(res)
    }

    fn report_persist(&mut self, res: Result<(), PersistError>) -> io::Result<()> {
        if let Err(e) = res {
            warn!("State change not saved: {e}");
            writeln!(
                self.output,
                "Change kept in memory but not saved yet, it will be retried"
            )?;
        }
        Ok(())
    }

    /// Suggestions are reused so they can be added without another lookup
    fn fetch_show(&mut self, id: ShowId) -> Option<Show> {
        if let Some(show) = self.last_suggestions.iter().find(|s| s.id == id) {
            return Some(show.clone());
        }

        match self.catalog.details(id) {
            Ok(v) => Some(v),
            Err(e) => {
                error!("Failed to get details for {id}: {e}");
                None
            }
        }
    }

    fn handle_search(&mut self, query: &str) -> io::Result<()> {
        let results = match self.catalog.search(query) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to search for {query}: {e}");
                return Ok(());
            }
        };

        for show in results {
            let year = show
                .first_air_date
                .as_deref()
                .and_then(|d| d.get(..4))
                .unwrap_or("????");
            writeln!(
                self.output,
                "{:>8} {} ({year}) {:.1}",
                show.id, show.title, show.vote_average
            )?;
        }
        Ok(())
    }

    fn handle_list(&mut self) -> io::Result<()> {
        for tier in Tier::RANKED.into_iter().chain([Tier::Pool]) {
            let titles = self
                .store
                .tier_entries(tier)
                .iter()
                .map(|e| format!("{} [{}]", e.show.title, e.show.id))
                .collect::<Vec<_>>();
            writeln!(self.output, "{:>4}: {}", tier, titles.join(", "))?;
        }
        Ok(())
    }

    fn handle_watchlist(&mut self) -> io::Result<()> {
        for show in self.store.watchlist() {
            writeln!(
                self.output,
                "{:>8} {} {:.1} {}",
                show.id,
                show.title,
                show.vote_average,
                tmdb::image_url(show.poster_path.as_deref(), tmdb::POSTER_SIZE)
            )?;
        }
        Ok(())
    }

    fn handle_suggest(&mut self) -> io::Result<()> {
        let suggestions = suggest::suggest_shows(&self.catalog, self.store.state(), &mut self.rng);
        if suggestions.is_empty() {
            writeln!(
                self.output,
                "Add some shows to the S or A tier to get suggestions"
            )?;
        }

        for show in &suggestions {
            writeln!(
                self.output,
                "{:>8} {} {:.1}",
                show.id, show.title, show.vote_average
            )?;
        }

        self.last_suggestions = suggestions;
        Ok(())
    }

    fn handle_heatmap(&mut self, id: ShowId) -> io::Result<()> {
        // Season counts grow after a show is added, prefer fresh details
        let show = match self.fetch_show(id) {
            Some(v) => v,
            None => match self.store.entry(id) {
                Some(entry) => entry.show.clone(),
                None => return Ok(()),
            },
        };

        let episodes = catalog::all_episodes(&self.catalog, show.id, show.number_of_seasons);
        let heatmap = Heatmap::new(&episodes);

        writeln!(self.output, "{}", show.title)?;
        for row in heatmap.rows() {
            let cells = row
                .iter()
                .map(|c| format!("{:<8}{:>4.1}", c.label(), c.rating))
                .collect::<Vec<_>>();
            writeln!(self.output, "{}", cells.join(" | "))?;
        }

        let legend = RatingBand::ALL
            .iter()
            .map(|b| format!("{} {}", b.color(), b.label()))
            .collect::<Vec<_>>();
        writeln!(self.output, "{}", legend.join("  "))?;
        Ok(())
    }
}
