//! Analytical lenses over a (filtered) cleaned table.
//!
//! A lens returns aggregate data only. A column the lens needs but the table
//! lacks yields an empty section, never an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::stats::{count_labels, histogram, numeric_values, value_counts, HistogramBin, NumericSummary, ValueCount};
use crate::models::{Observation, Season, Table, SPECIES_COLUMNS};
use crate::transform::rules::UNKNOWN;
use crate::transform::temporal::{cell_date, cell_time, month_year};

/// Bins of every histogram a lens returns.
pub const HISTOGRAM_BINS: usize = 20;

/// Entries in top-N rankings.
pub const TOP_N: usize = 10;

/// Entries in the species share breakdown.
pub const TOP_SHARE_N: usize = 5;

/// One analytical view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Lens {
    Temporal,
    Spatial,
    Species,
    Environmental,
    Behavior,
    Observer,
    Conservation,
}

impl Lens {
    pub const ALL: [Lens; 7] = [
        Lens::Temporal,
        Lens::Spatial,
        Lens::Species,
        Lens::Environmental,
        Lens::Behavior,
        Lens::Observer,
        Lens::Conservation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lens::Temporal => "temporal",
            Lens::Spatial => "spatial",
            Lens::Species => "species",
            Lens::Environmental => "environmental",
            Lens::Behavior => "behavior",
            Lens::Observer => "observer",
            Lens::Conservation => "conservation",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Lens::Temporal => "Temporal trends",
            Lens::Spatial => "Spatial distribution",
            Lens::Species => "Species analysis",
            Lens::Environmental => "Environmental conditions",
            Lens::Behavior => "Behavior",
            Lens::Observer => "Observer insights",
            Lens::Conservation => "Conservation status",
        }
    }
}

impl fmt::Display for Lens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lens {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Lens::ALL
            .into_iter()
            .find(|lens| lens.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown lens '{}'", s))
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TemporalSection {
    /// Every season in display order, zero counts included.
    pub seasons: Vec<ValueCount>,
    /// Observations per `YYYY-MM`, chronological.
    pub monthly: Vec<ValueCount>,
    /// Observations per start hour, ascending.
    pub hourly: Vec<ValueCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub species: Option<String>,
    pub season: Option<Season>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpatialSection {
    pub location_types: Vec<ValueCount>,
    pub points: Vec<MapPoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Share {
    pub value: String,
    pub count: usize,
    /// Fraction of the listed entries' total.
    pub share: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpeciesSection {
    /// Column the species were read from.
    pub column: Option<String>,
    pub top: Vec<ValueCount>,
    pub top_share: Vec<Share>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupSummary {
    pub group: String,
    pub summary: NumericSummary,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnvironmentalSection {
    pub temperature: Option<NumericSummary>,
    pub humidity: Option<NumericSummary>,
    pub temperature_histogram: Vec<HistogramBin>,
    /// Box statistics of temperature per season, in season order.
    pub temperature_by_season: Vec<GroupSummary>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BehaviorSection {
    pub distance: Option<NumericSummary>,
    pub distance_histogram: Vec<HistogramBin>,
    pub flyover: Vec<ValueCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ObserverSection {
    pub top: Vec<ValueCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConservationSection {
    pub watchlist: Vec<ValueCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum LensSections {
    Temporal(TemporalSection),
    Spatial(SpatialSection),
    Species(SpeciesSection),
    Environmental(EnvironmentalSection),
    Behavior(BehaviorSection),
    Observer(ObserverSection),
    Conservation(ConservationSection),
}

/// Result of [`summarize`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LensSummary {
    pub lens: Lens,
    pub title: &'static str,
    pub rows: usize,
    pub sections: LensSections,
}

// =============================================================================
// Summaries
// =============================================================================

pub fn summarize(table: &Table, lens: Lens) -> LensSummary {
    let sections = match lens {
        Lens::Temporal => LensSections::Temporal(temporal(table)),
        Lens::Spatial => LensSections::Spatial(spatial(table)),
        Lens::Species => LensSections::Species(species(table)),
        Lens::Environmental => LensSections::Environmental(environmental(table)),
        Lens::Behavior => LensSections::Behavior(behavior(table)),
        Lens::Observer => LensSections::Observer(ObserverSection {
            top: top_n(value_counts(table, "observer"), TOP_N),
        }),
        Lens::Conservation => LensSections::Conservation(ConservationSection {
            watchlist: value_counts(table, "pif_watchlist_status"),
        }),
    };

    LensSummary {
        lens,
        title: lens.title(),
        rows: table.len(),
        sections,
    }
}

fn temporal(table: &Table) -> TemporalSection {
    let seasons = match table.column("season") {
        Some(cells) => {
            let parsed: Vec<Season> = cells
                .into_iter()
                .map(|c| c.as_str().and_then(Season::parse).unwrap_or(Season::Unknown))
                .collect();
            Season::ORDER
                .iter()
                .map(|season| ValueCount {
                    value: season.to_string(),
                    count: parsed.iter().filter(|s| *s == season).count(),
                })
                .collect()
        }
        None => Vec::new(),
    };

    let months: Vec<String> = match table.column("month_year") {
        Some(cells) => cells.into_iter().filter_map(|c| c.label()).collect(),
        None => table
            .column("date")
            .map(|cells| cells.into_iter().filter_map(cell_date).map(month_year).collect())
            .unwrap_or_default(),
    };
    let mut monthly = count_labels(months);
    monthly.sort_by(|a, b| a.value.cmp(&b.value));

    let hours: Vec<i64> = match table.column("hour") {
        Some(cells) => cells.into_iter().filter_map(|c| c.as_i64()).collect(),
        None => table
            .column("start_time")
            .map(|cells| {
                cells
                    .into_iter()
                    .filter_map(cell_time)
                    .map(|t| i64::from(chrono::Timelike::hour(&t)))
                    .collect()
            })
            .unwrap_or_default(),
    };
    let mut hourly = count_labels(hours.iter().map(|h| h.to_string()));
    hourly.sort_by_key(|c| c.value.parse::<i64>().unwrap_or(i64::MAX));

    TemporalSection { seasons, monthly, hourly }
}

fn spatial(table: &Table) -> SpatialSection {
    let location_types = table
        .column("location_type")
        .map(|cells| count_labels(cells.into_iter().map(|c| c.label().unwrap_or_else(|| UNKNOWN.to_string()))))
        .unwrap_or_default();

    let points = (0..table.len())
        .map(|row| Observation::from_row(table, row))
        .filter_map(|obs| {
            Some(MapPoint {
                latitude: obs.latitude?,
                longitude: obs.longitude?,
                species: obs.species,
                season: obs.season,
            })
        })
        .collect();

    SpatialSection { location_types, points }
}

fn species(table: &Table) -> SpeciesSection {
    let Some(column) = SPECIES_COLUMNS.iter().find(|c| table.has_column(c)) else {
        return SpeciesSection { column: None, top: Vec::new(), top_share: Vec::new() };
    };

    let counts = value_counts(table, column);
    let shared = top_n(counts.clone(), TOP_SHARE_N);
    let total: usize = shared.iter().map(|c| c.count).sum();
    let top_share = shared
        .into_iter()
        .map(|c| Share {
            share: c.count as f64 / total as f64,
            value: c.value,
            count: c.count,
        })
        .collect();

    SpeciesSection {
        column: Some(column.to_string()),
        top: top_n(counts, TOP_N),
        top_share,
    }
}

fn environmental(table: &Table) -> EnvironmentalSection {
    let temperatures = numeric_values(table, "temperature");

    let temperature_by_season = match (table.column("season"), table.column("temperature")) {
        (Some(seasons), Some(temps)) => Season::ORDER
            .iter()
            .filter_map(|season| {
                let values: Vec<f64> = seasons
                    .iter()
                    .zip(&temps)
                    .filter(|(s, _)| s.as_str().and_then(Season::parse) == Some(*season))
                    .filter_map(|(_, t)| t.as_f64())
                    .collect();
                NumericSummary::compute(&values).map(|summary| GroupSummary {
                    group: season.to_string(),
                    summary,
                })
            })
            .collect(),
        _ => Vec::new(),
    };

    EnvironmentalSection {
        temperature: NumericSummary::compute(&temperatures),
        humidity: NumericSummary::of_column(table, "humidity"),
        temperature_histogram: histogram(&temperatures, HISTOGRAM_BINS),
        temperature_by_season,
    }
}

fn behavior(table: &Table) -> BehaviorSection {
    let distances = numeric_values(table, "distance");
    let flyover_column = if table.has_column("flyover_observed") {
        "flyover_observed"
    } else {
        "flyover"
    };

    BehaviorSection {
        distance: NumericSummary::compute(&distances),
        distance_histogram: histogram(&distances, HISTOGRAM_BINS),
        flyover: value_counts(table, flyover_column),
    }
}

fn top_n(mut counts: Vec<ValueCount>, n: usize) -> Vec<ValueCount> {
    counts.truncate(n);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    fn cleaned() -> Table {
        let rows: Vec<Vec<Cell>> = vec![
            ("2018-01-10", "06:30", "BCCH", "Ann", 2.0, "Forest", 38.9, -77.0, "FALSE"),
            ("2018-04-02", "07:10", "BCCH", "Bob", 12.0, "Grassland", 39.0, -77.1, "TRUE"),
            ("2018-04-20", "07:45", "NOCA", "Bob", 15.0, "Forest", 39.1, -77.2, "FALSE"),
            ("2018-07-04", "06:05", "AMRO", "Cid", 28.0, "", 39.2, -77.3, "FALSE"),
        ]
        .into_iter()
        .map(|(date, start, species, observer, temp, loc, lat, lon, fly)| {
            vec![
                Cell::text(date),
                Cell::text(start),
                Cell::text(species),
                Cell::text(observer),
                Cell::Number(temp),
                Cell::text(loc),
                Cell::Number(lat),
                Cell::Number(lon),
                Cell::text(fly),
            ]
        })
        .collect();

        let table = Table::from_rows(
            [
                "date",
                "start_time",
                "taxoncode",
                "observer",
                "temperature",
                "location_type",
                "latitude",
                "longitude",
                "flyover_observed",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            rows,
        );
        crate::insights::loader::rederive(table)
    }

    fn sections(lens: Lens) -> LensSections {
        summarize(&cleaned(), lens).sections
    }

    #[test]
    fn test_lens_parsing() {
        assert_eq!("Temporal".parse::<Lens>(), Ok(Lens::Temporal));
        assert!("weather".parse::<Lens>().is_err());
        for lens in Lens::ALL {
            assert_eq!(lens.as_str().parse::<Lens>(), Ok(lens));
        }
    }

    #[test]
    fn test_temporal_lens() {
        let LensSections::Temporal(t) = sections(Lens::Temporal) else {
            panic!("wrong section");
        };

        let seasons: Vec<(&str, usize)> = t.seasons.iter().map(|c| (c.value.as_str(), c.count)).collect();
        assert_eq!(
            seasons,
            vec![("Winter", 1), ("Spring", 2), ("Summer", 1), ("Autumn", 0), ("Unknown", 0)]
        );
        assert_eq!(t.seasons.iter().map(|c| c.count).sum::<usize>(), 4);

        let months: Vec<&str> = t.monthly.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(months, vec!["2018-01", "2018-04", "2018-07"]);

        let hours: Vec<(&str, usize)> = t.hourly.iter().map(|c| (c.value.as_str(), c.count)).collect();
        assert_eq!(hours, vec![("6", 2), ("7", 2)]);
    }

    #[test]
    fn test_spatial_lens() {
        let LensSections::Spatial(s) = sections(Lens::Spatial) else {
            panic!("wrong section");
        };
        assert_eq!(s.points.len(), 4);
        assert_eq!(s.points[0].species.as_deref(), Some("BCCH"));
        assert_eq!(s.points[0].season, Some(Season::Winter));
        assert_eq!(s.location_types[0], ValueCount { value: "Forest".into(), count: 2 });
        assert!(s.location_types.iter().any(|c| c.value == "Unknown" && c.count == 1));
    }

    #[test]
    fn test_species_lens() {
        let LensSections::Species(s) = sections(Lens::Species) else {
            panic!("wrong section");
        };
        assert_eq!(s.column.as_deref(), Some("taxoncode"));
        assert_eq!(s.top[0], ValueCount { value: "BCCH".into(), count: 2 });
        assert_eq!(s.top_share.iter().map(|c| c.share).sum::<f64>(), 1.0);
        assert_eq!(s.top_share[0].share, 0.5);
    }

    #[test]
    fn test_environmental_lens() {
        let LensSections::Environmental(e) = sections(Lens::Environmental) else {
            panic!("wrong section");
        };
        assert_eq!(e.temperature.as_ref().map(|s| s.count), Some(4));
        assert!(e.humidity.is_none());
        assert_eq!(e.temperature_histogram.len(), HISTOGRAM_BINS);
        let groups: Vec<&str> = e.temperature_by_season.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(groups, vec!["Winter", "Spring", "Summer"]);
        assert_eq!(e.temperature_by_season[1].summary.median, 13.5);
    }

    #[test]
    fn test_behavior_lens_missing_distance() {
        let LensSections::Behavior(b) = sections(Lens::Behavior) else {
            panic!("wrong section");
        };
        assert!(b.distance.is_none());
        assert!(b.distance_histogram.is_empty());
        assert_eq!(b.flyover[0], ValueCount { value: "FALSE".into(), count: 3 });
    }

    #[test]
    fn test_missing_columns_give_empty_sections() {
        let table = Table::from_rows(vec!["obs".into()], vec![vec![Cell::Int(1)]]);
        for lens in Lens::ALL {
            let summary = summarize(&table, lens);
            assert_eq!(summary.rows, 1);
        }
        let LensSections::Conservation(c) = summarize(&table, Lens::Conservation).sections else {
            panic!("wrong section");
        };
        assert!(c.watchlist.is_empty());
    }
}
