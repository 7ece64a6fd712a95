//! View models assembled from repository rows.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enums::State;
use crate::models::{Artist, Venue};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub id: i64,
    pub name: String,
    pub num_upcoming_shows: usize,
}

/// A venue summary still carrying the location it is grouped under.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedSummary {
    pub city: String,
    pub state: State,
    pub summary: EntitySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Area {
    pub city: String,
    pub state: State,
    pub venues: Vec<EntitySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub count: usize,
    pub data: Vec<EntitySummary>,
}

impl SearchResults {
    pub fn new(data: Vec<EntitySummary>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

/// One show as seen from a detail page: `id`, `name` and `image_link`
/// describe the other side of the booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowCard {
    pub id: i64,
    pub name: String,
    pub image_link: Option<String>,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detail<T> {
    pub record: T,
    pub past_shows: Vec<ShowCard>,
    pub upcoming_shows: Vec<ShowCard>,
    pub past_shows_count: usize,
    pub upcoming_shows_count: usize,
}

pub type VenueDetail = Detail<Venue>;
pub type ArtistDetail = Detail<Artist>;

impl<T> Detail<T> {
    pub fn new(record: T, shows: Vec<ShowCard>, now: DateTime<Utc>) -> Self {
        let (past_shows, upcoming_shows) = partition_shows(shows, now);
        Self {
            record,
            past_shows_count: past_shows.len(),
            upcoming_shows_count: upcoming_shows.len(),
            past_shows,
            upcoming_shows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowListing {
    pub venue_id: i64,
    pub venue_name: String,
    pub artist_id: i64,
    pub artist_name: String,
    pub artist_image_link: Option<String>,
    pub start_time: DateTime<Utc>,
}

/// Splits shows into past (start <= now) and upcoming (start > now),
/// keeping the incoming order within each side.
pub fn partition_shows(
    shows: Vec<ShowCard>,
    now: DateTime<Utc>,
) -> (Vec<ShowCard>, Vec<ShowCard>) {
    shows.into_iter().partition(|show| show.start_time <= now)
}

/// Folds rows sorted by location into one [`Area`] per (city, state) pair.
pub fn group_by_location(rows: Vec<LocatedSummary>) -> Vec<Area> {
    let mut areas: Vec<Area> = Vec::new();
    for row in rows {
        match areas.last_mut() {
            Some(area) if area.city == row.city && area.state == row.state => {
                area.venues.push(row.summary);
            }
            _ => areas.push(Area {
                city: row.city,
                state: row.state,
                venues: vec![row.summary],
            }),
        }
    }
    areas
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn located(city: &str, state: State, id: i64, upcoming: usize) -> LocatedSummary {
        LocatedSummary {
            city: city.to_string(),
            state,
            summary: EntitySummary {
                id,
                name: format!("venue {id}"),
                num_upcoming_shows: upcoming,
            },
        }
    }

    #[test]
    fn groups_consecutive_rows_by_city_and_state() {
        let areas = group_by_location(vec![
            located("San Francisco", State::Ca, 1, 0),
            located("San Francisco", State::Ca, 3, 2),
            located("New York", State::Ny, 2, 1),
            located("Portland", State::Or, 4, 0),
        ]);
        assert_eq!(areas.len(), 3);
        assert_eq!(areas[0].city, "San Francisco");
        assert_eq!(
            areas[0].venues.iter().map(|v| v.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(areas[1].state, State::Ny);
        assert_eq!(areas[2].venues[0].num_upcoming_shows, 0);
    }

    #[test]
    fn same_city_name_in_different_states_stays_apart() {
        let areas = group_by_location(vec![
            located("Portland", State::Me, 1, 0),
            located("Portland", State::Or, 2, 0),
        ]);
        assert_eq!(areas.len(), 2);
    }

    #[test]
    fn show_starting_exactly_now_counts_as_past() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        let card = |id: i64, start| ShowCard {
            id,
            name: format!("artist {id}"),
            image_link: None,
            start_time: start,
        };
        let detail = Detail::new(
            "record",
            vec![
                card(1, now - Duration::days(3)),
                card(2, now),
                card(3, now + Duration::seconds(1)),
            ],
            now,
        );
        assert_eq!(detail.past_shows_count, 2);
        assert_eq!(detail.upcoming_shows_count, 1);
        assert_eq!(detail.upcoming_shows[0].id, 3);
    }

    #[test]
    fn empty_detail_has_zero_counts() {
        let detail = Detail::new((), Vec::new(), Utc::now());
        assert!(detail.past_shows.is_empty());
        assert!(detail.upcoming_shows.is_empty());
        assert_eq!(detail.past_shows_count, 0);
        assert_eq!(detail.upcoming_shows_count, 0);
    }
}
