use crate::types::Episode;

pub const COLUMNS: usize = 7;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RatingBand {
    Great,
    Good,
    Average,
    Poor,
    Bad,
}

impl RatingBand {
    /// Strongest band first, the order the legend is drawn in
    pub const ALL: [RatingBand; 5] = [
        RatingBand::Great,
        RatingBand::Good,
        RatingBand::Average,
        RatingBand::Poor,
        RatingBand::Bad,
    ];

    pub fn from_rating(rating: f64) -> RatingBand {
        if rating >= 8.0 {
            RatingBand::Great
        } else if rating >= 6.0 {
            RatingBand::Good
        } else if rating >= 4.0 {
            RatingBand::Average
        } else if rating >= 2.0 {
            RatingBand::Poor
        } else {
            RatingBand::Bad
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RatingBand::Great => "#2ed573",
            RatingBand::Good => "#7bed9f",
            RatingBand::Average => "#ffa502",
            RatingBand::Poor => "#ff6348",
            RatingBand::Bad => "#ff4757",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RatingBand::Great => "8.0+",
            RatingBand::Good => "6.0-7.9",
            RatingBand::Average => "4.0-5.9",
            RatingBand::Poor => "2.0-3.9",
            RatingBand::Bad => "<2.0",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapCell {
    pub season: u32,
    pub episode: u32,
    pub rating: f64,
    pub band: RatingBand,
}

impl HeatmapCell {
    pub fn label(&self) -> String {
        format!("S{}E{}", self.season, self.episode)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    cells: Vec<HeatmapCell>,
}

impl Heatmap {
    pub fn new(episodes: &[Episode]) -> Heatmap {
        let mut cells = episodes
            .iter()
            .map(|e| HeatmapCell {
                season: e.season_number,
                episode: e.episode_number,
                rating: e.vote_average,
                band: RatingBand::from_rating(e.vote_average),
            })
            .collect::<Vec<_>>();
        cells.sort_by_key(|c| (c.season, c.episode));

        Heatmap { cells }
    }

    pub fn cells(&self) -> &[HeatmapCell] {
        &self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &[HeatmapCell]> {
        self.cells.chunks(COLUMNS)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
