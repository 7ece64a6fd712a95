use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::enums::{Genre, State};
use crate::forms::RecordLookup;
use crate::models::{Artist, ArtistFields, RecordKind, ShowFields, Venue, VenueFields};
use crate::pages::{
    self, ArtistDetail, Detail, EntitySummary, LocatedSummary, SearchResults, ShowCard,
    ShowListing, VenueDetail,
};
use crate::utils;

const BUSY_TIMEOUT: StdDuration = StdDuration::from_secs(5);

const VENUE_COLUMNS: &str = "id, name, city, state, address, phone, image_link, facebook_link,
     website_link, genres, seeking_talent, seeking_description";

const ARTIST_COLUMNS: &str = "id, name, city, state, phone, image_link, facebook_link,
     website_link, genres, seeking_venue, seeking_description";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: i64 },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("genre encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
#[error("unknown state code {0:?}")]
struct UnknownState(String);

/// Where the database lives. Cheap to clone; every operation opens its own
/// [`Store`] from it and drops it when done.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> StoreResult<Store> {
        Store::open(&self.path)
    }

    /// Creates the schema and, when asked, loads demo records into an empty
    /// database.
    pub fn initialize(&self, seed: bool, now: DateTime<Utc>) -> StoreResult<()> {
        utils::ensure_parent(&self.path);
        let mut store = self.open()?;
        if seed {
            store.seed_if_empty(now)?;
        }
        Ok(())
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        register_fold(&conn)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS venues(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                address TEXT NOT NULL,
                phone TEXT NOT NULL,
                image_link TEXT,
                facebook_link TEXT,
                website_link TEXT,
                genres TEXT NOT NULL DEFAULT '[]',
                seeking_talent INTEGER NOT NULL DEFAULT 0,
                seeking_description TEXT
            );
            CREATE TABLE IF NOT EXISTS artists(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                phone TEXT NOT NULL,
                image_link TEXT,
                facebook_link TEXT,
                website_link TEXT,
                genres TEXT NOT NULL DEFAULT '[]',
                seeking_venue INTEGER NOT NULL DEFAULT 0,
                seeking_description TEXT
            );
            CREATE TABLE IF NOT EXISTS shows(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist_id INTEGER NOT NULL REFERENCES artists(id),
                venue_id INTEGER NOT NULL REFERENCES venues(id),
                start_time INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS shows_by_venue ON shows(venue_id, start_time);
            CREATE INDEX IF NOT EXISTS shows_by_artist ON shows(artist_id, start_time);",
        )?;
        Ok(())
    }

    /// Loads the demo venues, artists and shows into an empty database. The
    /// whole set goes in one transaction, so a failure leaves it empty.
    pub fn seed_if_empty(&mut self, now: DateTime<Utc>) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let count: i64 = tx.query_row("SELECT COUNT(*) FROM venues", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        let venues = [
            sample_venue(
                "The Musical Hop",
                "San Francisco",
                State::Ca,
                "1015 Folsom Street",
                "123-123-1234",
                vec![Genre::Jazz, Genre::Reggae, Genre::Folk],
            ),
            sample_venue(
                "The Dueling Pianos Bar",
                "New York",
                State::Ny,
                "335 Delancey Street",
                "914-003-1132",
                vec![Genre::Classical, Genre::RnB, Genre::HipHop],
            ),
            sample_venue(
                "Park Square Live Music & Coffee",
                "San Francisco",
                State::Ca,
                "34 Whiskey Moore Ave",
                "415-000-1234",
                vec![Genre::RockNRoll, Genre::Jazz, Genre::Classical],
            ),
        ];
        let artists = [
            sample_artist(
                "Guns N Petals",
                "San Francisco",
                State::Ca,
                "326-123-5000",
                vec![Genre::RockNRoll],
            ),
            sample_artist(
                "Matt Quevedo",
                "New York",
                State::Ny,
                "300-400-5000",
                vec![Genre::Jazz],
            ),
            sample_artist(
                "The Wild Sax Band",
                "San Francisco",
                State::Ca,
                "432-325-5432",
                vec![Genre::Jazz, Genre::Classical],
            ),
        ];

        let mut venue_ids = Vec::with_capacity(venues.len());
        for venue in &venues {
            venue_ids.push(insert_venue(&tx, venue)?);
        }
        let mut artist_ids = Vec::with_capacity(artists.len());
        for artist in &artists {
            artist_ids.push(insert_artist(&tx, artist)?);
        }

        // (artist, venue, days from now)
        for (artist, venue, offset_days) in [
            (0, 0, -30),
            (1, 2, -10),
            (2, 2, 7),
            (2, 2, 14),
            (2, 1, 21),
        ] {
            insert_show(
                &tx,
                &ShowFields {
                    artist_id: artist_ids[artist],
                    venue_id: venue_ids[venue],
                    start_time: now + Duration::days(offset_days),
                },
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn create_venue(&mut self, venue: &VenueFields) -> StoreResult<i64> {
        let tx = self.conn.transaction()?;
        let id = insert_venue(&tx, venue)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn update_venue(&mut self, id: i64, venue: &VenueFields) -> StoreResult<()> {
        let genres = serde_json::to_string(&venue.genres)?;
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE venues SET name = ?2, city = ?3, state = ?4, address = ?5, phone = ?6,
                image_link = ?7, facebook_link = ?8, website_link = ?9, genres = ?10,
                seeking_talent = ?11, seeking_description = ?12
             WHERE id = ?1",
            params![
                id,
                venue.name,
                venue.city,
                venue.state.as_str(),
                venue.address,
                venue.phone,
                venue.image_link,
                venue.facebook_link,
                venue.website_link,
                genres,
                venue.seeking_talent,
                venue.seeking_description
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: RecordKind::Venue,
                id,
            });
        }
        tx.commit()?;
        Ok(())
    }

    /// Removes the venue and every show booked there. Returns whether a venue
    /// row existed; a missing id is not an error.
    pub fn delete_venue(&mut self, id: i64) -> StoreResult<bool> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM shows WHERE venue_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM venues WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    pub fn create_artist(&mut self, artist: &ArtistFields) -> StoreResult<i64> {
        let tx = self.conn.transaction()?;
        let id = insert_artist(&tx, artist)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn update_artist(&mut self, id: i64, artist: &ArtistFields) -> StoreResult<()> {
        let genres = serde_json::to_string(&artist.genres)?;
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE artists SET name = ?2, city = ?3, state = ?4, phone = ?5, image_link = ?6,
                facebook_link = ?7, website_link = ?8, genres = ?9, seeking_venue = ?10,
                seeking_description = ?11
             WHERE id = ?1",
            params![
                id,
                artist.name,
                artist.city,
                artist.state.as_str(),
                artist.phone,
                artist.image_link,
                artist.facebook_link,
                artist.website_link,
                genres,
                artist.seeking_venue,
                artist.seeking_description
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: RecordKind::Artist,
                id,
            });
        }
        tx.commit()?;
        Ok(())
    }

    pub fn create_show(&mut self, show: &ShowFields) -> StoreResult<i64> {
        let tx = self.conn.transaction()?;
        let id = insert_show(&tx, show)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn get_venue(&self, id: i64) -> StoreResult<Venue> {
        self.conn
            .query_row(
                &format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = ?1"),
                params![id],
                venue_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Venue,
                id,
            })
    }

    pub fn get_artist(&self, id: i64) -> StoreResult<Artist> {
        self.conn
            .query_row(
                &format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = ?1"),
                params![id],
                artist_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Artist,
                id,
            })
    }

    pub fn list_venues_grouped_by_location(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<pages::Area>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.id, v.name, v.city, v.state,
                (SELECT COUNT(*) FROM shows s WHERE s.venue_id = v.id AND s.start_time > ?1)
             FROM venues v
             ORDER BY v.state, v.city, v.name, v.id",
        )?;
        let rows = stmt.query_map(params![now.timestamp()], |row| {
            Ok(LocatedSummary {
                summary: EntitySummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    num_upcoming_shows: count_from(row, 4)?,
                },
                city: row.get(2)?,
                state: state_from(row, 3)?,
            })
        })?;

        let mut located = Vec::new();
        for row in rows {
            located.push(row?);
        }
        Ok(pages::group_by_location(located))
    }

    pub fn list_artists(&self, now: DateTime<Utc>) -> StoreResult<Vec<EntitySummary>> {
        self.summaries(RecordKind::Artist, None, now)
    }

    pub fn search_venues(&self, term: &str, now: DateTime<Utc>) -> StoreResult<SearchResults> {
        self.summaries(RecordKind::Venue, Some(term), now)
            .map(SearchResults::new)
    }

    pub fn search_artists(&self, term: &str, now: DateTime<Utc>) -> StoreResult<SearchResults> {
        self.summaries(RecordKind::Artist, Some(term), now)
            .map(SearchResults::new)
    }

    /// Case-insensitive substring search on `name`.
    pub fn search_by_name_substring(
        &self,
        kind: RecordKind,
        term: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<SearchResults> {
        self.summaries(kind, Some(term), now).map(SearchResults::new)
    }

    /// Summaries with upcoming-show counts; a `None` term lists everything.
    fn summaries(
        &self,
        kind: RecordKind,
        term: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<EntitySummary>> {
        let (table, key) = match kind {
            RecordKind::Venue => ("venues", "venue_id"),
            RecordKind::Artist => ("artists", "artist_id"),
        };
        let pattern = format!("%{}%", escape_like(term.unwrap_or("")));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT r.id, r.name,
                (SELECT COUNT(*) FROM shows s WHERE s.{key} = r.id AND s.start_time > ?1)
             FROM {table} r
             WHERE fold(r.name) LIKE fold(?2) ESCAPE '\\'
             ORDER BY r.name, r.id"
        ))?;
        let rows = stmt.query_map(params![now.timestamp(), pattern], |row| {
            Ok(EntitySummary {
                id: row.get(0)?,
                name: row.get(1)?,
                num_upcoming_shows: count_from(row, 2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn venue_detail(&mut self, id: i64, now: DateTime<Utc>) -> StoreResult<VenueDetail> {
        let tx = self.conn.transaction()?;
        let venue = tx
            .query_row(
                &format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = ?1"),
                params![id],
                venue_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Venue,
                id,
            })?;
        let shows = show_cards(
            &tx,
            "SELECT a.id, a.name, a.image_link, s.start_time
             FROM shows s JOIN artists a ON a.id = s.artist_id
             WHERE s.venue_id = ?1
             ORDER BY s.start_time, s.id",
            id,
        )?;
        tx.commit()?;
        Ok(Detail::new(venue, shows, now))
    }

    pub fn artist_detail(&mut self, id: i64, now: DateTime<Utc>) -> StoreResult<ArtistDetail> {
        let tx = self.conn.transaction()?;
        let artist = tx
            .query_row(
                &format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = ?1"),
                params![id],
                artist_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                kind: RecordKind::Artist,
                id,
            })?;
        let shows = show_cards(
            &tx,
            "SELECT v.id, v.name, v.image_link, s.start_time
             FROM shows s JOIN venues v ON v.id = s.venue_id
             WHERE s.artist_id = ?1
             ORDER BY s.start_time, s.id",
            id,
        )?;
        tx.commit()?;
        Ok(Detail::new(artist, shows, now))
    }

    pub fn list_shows(&self) -> StoreResult<Vec<ShowListing>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.id, v.name, a.id, a.name, a.image_link, s.start_time
             FROM shows s
             JOIN venues v ON v.id = s.venue_id
             JOIN artists a ON a.id = s.artist_id
             ORDER BY s.start_time DESC, s.id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ShowListing {
                venue_id: row.get(0)?,
                venue_name: row.get(1)?,
                artist_id: row.get(2)?,
                artist_name: row.get(3)?,
                artist_image_link: row.get(4)?,
                start_time: timestamp_from(row, 5)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// `(id, name)` pairs for the show form's select boxes.
    pub fn list_choices(&self, kind: RecordKind) -> StoreResult<Vec<(i64, String)>> {
        let table = match kind {
            RecordKind::Venue => "venues",
            RecordKind::Artist => "artists",
        };
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, name FROM {table} ORDER BY name, id"))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn exists(&self, table: &str, id: i64) -> rusqlite::Result<bool> {
        self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
            params![id],
            |row| row.get(0),
        )
    }
}

impl RecordLookup for Store {
    type Error = StoreError;

    fn artist_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.exists("artists", id)?)
    }

    fn venue_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.exists("venues", id)?)
    }
}

fn insert_venue(conn: &Connection, venue: &VenueFields) -> StoreResult<i64> {
    let genres = serde_json::to_string(&venue.genres)?;
    conn.execute(
        "INSERT INTO venues (name, city, state, address, phone, image_link, facebook_link,
            website_link, genres, seeking_talent, seeking_description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            venue.name,
            venue.city,
            venue.state.as_str(),
            venue.address,
            venue.phone,
            venue.image_link,
            venue.facebook_link,
            venue.website_link,
            genres,
            venue.seeking_talent,
            venue.seeking_description
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_artist(conn: &Connection, artist: &ArtistFields) -> StoreResult<i64> {
    let genres = serde_json::to_string(&artist.genres)?;
    conn.execute(
        "INSERT INTO artists (name, city, state, phone, image_link, facebook_link,
            website_link, genres, seeking_venue, seeking_description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            artist.name,
            artist.city,
            artist.state.as_str(),
            artist.phone,
            artist.image_link,
            artist.facebook_link,
            artist.website_link,
            genres,
            artist.seeking_venue,
            artist.seeking_description
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_show(conn: &Connection, show: &ShowFields) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO shows (artist_id, venue_id, start_time) VALUES (?1, ?2, ?3)",
        params![show.artist_id, show.venue_id, show.start_time.timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// `fold(text)`: Unicode lowercase, so name search ignores case beyond ASCII.
fn register_fold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: String = ctx.get(0)?;
            Ok(text.to_lowercase())
        },
    )
}

fn show_cards(conn: &Connection, sql: &str, id: i64) -> rusqlite::Result<Vec<ShowCard>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![id], |row| {
        Ok(ShowCard {
            id: row.get(0)?,
            name: row.get(1)?,
            image_link: row.get(2)?,
            start_time: timestamp_from(row, 3)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn venue_from_row(row: &Row<'_>) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(0)?,
        fields: VenueFields {
            name: row.get(1)?,
            city: row.get(2)?,
            state: state_from(row, 3)?,
            address: row.get(4)?,
            phone: row.get(5)?,
            image_link: row.get(6)?,
            facebook_link: row.get(7)?,
            website_link: row.get(8)?,
            genres: genres_from(row, 9)?,
            seeking_talent: row.get(10)?,
            seeking_description: row.get(11)?,
        },
    })
}

fn artist_from_row(row: &Row<'_>) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        fields: ArtistFields {
            name: row.get(1)?,
            city: row.get(2)?,
            state: state_from(row, 3)?,
            phone: row.get(4)?,
            image_link: row.get(5)?,
            facebook_link: row.get(6)?,
            website_link: row.get(7)?,
            genres: genres_from(row, 8)?,
            seeking_venue: row.get(9)?,
            seeking_description: row.get(10)?,
        },
    })
}

fn state_from(row: &Row<'_>, idx: usize) -> rusqlite::Result<State> {
    let raw: String = row.get(idx)?;
    raw.parse::<State>().map_err(|()| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(UnknownState(raw.clone())),
        )
    })
}

fn genres_from(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<Genre>> {
    let payload: String = row.get(idx)?;
    serde_json::from_str(&payload).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(err),
        )
    })
}

fn timestamp_from(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

fn count_from(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    let count: i64 = row.get(idx)?;
    usize::try_from(count).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, count))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn sample_venue(
    name: &str,
    city: &str,
    state: State,
    address: &str,
    phone: &str,
    genres: Vec<Genre>,
) -> VenueFields {
    VenueFields {
        name: name.to_string(),
        city: city.to_string(),
        state,
        address: address.to_string(),
        phone: phone.to_string(),
        image_link: None,
        facebook_link: None,
        website_link: None,
        genres,
        seeking_talent: false,
        seeking_description: None,
    }
}

fn sample_artist(
    name: &str,
    city: &str,
    state: State,
    phone: &str,
    genres: Vec<Genre>,
) -> ArtistFields {
    ArtistFields {
        name: name.to_string(),
        city: city.to_string(),
        state,
        phone: phone.to_string(),
        image_link: None,
        facebook_link: None,
        website_link: None,
        genres,
        seeking_venue: false,
        seeking_description: None,
    }
}
