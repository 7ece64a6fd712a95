use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Genre, State};

/// Editable venue columns, as produced by a successful form validation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VenueFields {
    pub name: String,
    pub city: String,
    pub state: State,
    pub address: String,
    pub phone: String,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website_link: Option<String>,
    pub genres: Vec<Genre>,
    pub seeking_talent: bool,
    pub seeking_description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ArtistFields {
    pub name: String,
    pub city: String,
    pub state: State,
    pub phone: String,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website_link: Option<String>,
    pub genres: Vec<Genre>,
    pub seeking_venue: bool,
    pub seeking_description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShowFields {
    pub artist_id: i64,
    pub venue_id: i64,
    pub start_time: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Venue {
    pub id: i64,
    #[serde(flatten)]
    pub fields: VenueFields,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Artist {
    pub id: i64,
    #[serde(flatten)]
    pub fields: ArtistFields,
}

/// Which directory a search or detail lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Venue,
    Artist,
}

impl RecordKind {
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Venue => "Venue",
            RecordKind::Artist => "Artist",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
