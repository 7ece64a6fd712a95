//! Form decoding and field validation for venue, artist and show submissions.
//!
//! Every rule runs on every submission; failures are accumulated into a
//! [`FieldErrors`] map so a form can be redisplayed with all messages at once.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use url::{form_urlencoded, Url};

use crate::enums::{Genre, State};
use crate::models::{ArtistFields, ShowFields, VenueFields};

pub const REQUIRED: &str = "This field is required.";

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?([0-9]{3})\)?[-. ]?([0-9]{3})[-. ]?([0-9]{4})$").expect("valid phone regex")
});

const START_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Raw submitted fields. Keys may repeat (multi-selects such as `genres`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Self {
        Self {
            pairs: form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.pairs.push((name.to_string(), value.into()));
    }

    /// First value submitted under `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn values(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key == name)
    }
}

impl From<&VenueFields> for FormData {
    fn from(venue: &VenueFields) -> Self {
        let mut form = FormData::from_pairs([
            ("name", venue.name.as_str()),
            ("city", venue.city.as_str()),
            ("state", venue.state.as_str()),
            ("address", venue.address.as_str()),
            ("phone", venue.phone.as_str()),
        ]);
        push_links(
            &mut form,
            &venue.image_link,
            &venue.facebook_link,
            &venue.website_link,
        );
        push_tail(
            &mut form,
            &venue.genres,
            ("seeking_talent", venue.seeking_talent),
            &venue.seeking_description,
        );
        form
    }
}

impl From<&ArtistFields> for FormData {
    fn from(artist: &ArtistFields) -> Self {
        let mut form = FormData::from_pairs([
            ("name", artist.name.as_str()),
            ("city", artist.city.as_str()),
            ("state", artist.state.as_str()),
            ("phone", artist.phone.as_str()),
        ]);
        push_links(
            &mut form,
            &artist.image_link,
            &artist.facebook_link,
            &artist.website_link,
        );
        push_tail(
            &mut form,
            &artist.genres,
            ("seeking_venue", artist.seeking_venue),
            &artist.seeking_description,
        );
        form
    }
}

fn push_links(
    form: &mut FormData,
    image: &Option<String>,
    facebook: &Option<String>,
    website: &Option<String>,
) {
    for (name, value) in [
        ("image_link", image),
        ("facebook_link", facebook),
        ("website_link", website),
    ] {
        if let Some(value) = value {
            form.push(name, value.as_str());
        }
    }
}

fn push_tail(
    form: &mut FormData,
    genres: &[Genre],
    (flag_name, flag): (&str, bool),
    description: &Option<String>,
) {
    for genre in genres {
        form.push("genres", genre.as_str());
    }
    if flag {
        form.push(flag_name, "y");
    }
    if let Some(description) = description {
        form.push("seeking_description", description.as_str());
    }
}

/// Field name → human readable messages, in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Existence checks the show form needs. Implemented by the store; the
/// validator never writes through it.
pub trait RecordLookup {
    type Error;

    fn artist_exists(&self, id: i64) -> Result<bool, Self::Error>;
    fn venue_exists(&self, id: i64) -> Result<bool, Self::Error>;
}

struct FieldCheck<'a> {
    form: &'a FormData,
    errors: FieldErrors,
}

impl<'a> FieldCheck<'a> {
    fn new(form: &'a FormData) -> Self {
        Self {
            form,
            errors: FieldErrors::default(),
        }
    }

    fn trimmed(&self, name: &str) -> Option<&'a str> {
        self.form
            .value(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn required_text(&mut self, name: &str) -> Option<String> {
        match self.trimmed(name) {
            Some(value) => Some(value.to_string()),
            None => {
                self.errors.add(name, REQUIRED);
                None
            }
        }
    }

    fn optional_text(&self, name: &str) -> Option<String> {
        self.trimmed(name).map(str::to_string)
    }

    fn state(&mut self, name: &str) -> Option<State> {
        let raw = self.required_text(name)?;
        match raw.parse::<State>() {
            Ok(state) => Some(state),
            Err(()) => {
                self.errors.add(name, "Invalid State");
                None
            }
        }
    }

    fn phone(&mut self, name: &str) -> Option<String> {
        let raw = self.required_text(name)?;
        if PHONE_RE.is_match(&raw) {
            Some(raw)
        } else {
            self.errors.add(name, "Invalid phone number");
            None
        }
    }

    fn url(&mut self, name: &str, message: &str) -> Option<String> {
        let raw = self.trimmed(name)?;
        if is_well_formed_url(raw) {
            Some(raw.to_string())
        } else {
            self.errors.add(name, message);
            None
        }
    }

    fn genres(&mut self, name: &str) -> Option<Vec<Genre>> {
        let raw: Vec<&str> = self
            .form
            .values(name)
            .into_iter()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect();
        if raw.is_empty() {
            self.errors.add(name, REQUIRED);
            return None;
        }

        let mut genres = Vec::with_capacity(raw.len());
        for value in raw {
            match value.parse::<Genre>() {
                Ok(genre) if !genres.contains(&genre) => genres.push(genre),
                Ok(_) => {}
                Err(()) => {
                    self.errors.add(name, "Invalid Genre Selection");
                    return None;
                }
            }
        }
        Some(genres)
    }

    fn flag(&self, name: &str) -> bool {
        is_checked(self.form, name)
    }

    fn record_id(&mut self, name: &str, label: &str) -> Option<i64> {
        let raw = self.required_text(name)?;
        match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                self.errors.add(name, format!("Invalid {label} id"));
                None
            }
        }
    }

    fn start_time(&mut self, name: &str, tz: Tz) -> Option<DateTime<Utc>> {
        let raw = self.required_text(name)?;
        match parse_start_time(&raw, tz) {
            Some(start) => Some(start),
            None => {
                self.errors.add(name, "Not a valid datetime value.");
                None
            }
        }
    }

    fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Checkbox semantics: present means checked unless the value is empty or
/// `false`.
pub(crate) fn is_checked(form: &FormData, name: &str) -> bool {
    match form.value(name) {
        None => false,
        Some(value) => {
            let value = value.trim();
            !(value.is_empty() || value.eq_ignore_ascii_case("false"))
        }
    }
}

pub fn is_valid_phone(raw: &str) -> bool {
    PHONE_RE.is_match(raw)
}

pub fn is_well_formed_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| host.contains('.'))
        }
        Err(_) => false,
    }
}

/// Accepts RFC 3339, or a naive `YYYY-MM-DD[ T]HH:MM[:SS]` read in `tz`.
pub fn parse_start_time(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = START_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

pub fn validate_venue(form: &FormData) -> Result<VenueFields, FieldErrors> {
    let mut check = FieldCheck::new(form);
    let name = check.required_text("name");
    let city = check.required_text("city");
    let state = check.state("state");
    let address = check.required_text("address");
    let phone = check.phone("phone");
    let image_link = check.url("image_link", "Invalid Image Link");
    let facebook_link = check.url("facebook_link", "Invalid Facebook Link");
    let website_link = check.url("website_link", "Invalid Website Link");
    let genres = check.genres("genres");
    let seeking_talent = check.flag("seeking_talent");
    let seeking_description = check.optional_text("seeking_description");

    let (Some(name), Some(city), Some(state), Some(address), Some(phone), Some(genres)) =
        (name, city, state, address, phone, genres)
    else {
        return Err(check.errors);
    };
    check.finish()?;

    Ok(VenueFields {
        name,
        city,
        state,
        address,
        phone,
        image_link,
        facebook_link,
        website_link,
        genres,
        seeking_talent,
        seeking_description,
    })
}

pub fn validate_artist(form: &FormData) -> Result<ArtistFields, FieldErrors> {
    let mut check = FieldCheck::new(form);
    let name = check.required_text("name");
    let city = check.required_text("city");
    let state = check.state("state");
    let phone = check.phone("phone");
    let image_link = check.url("image_link", "Invalid Image Link");
    let facebook_link = check.url("facebook_link", "Invalid Facebook Link");
    let website_link = check.url("website_link", "Invalid Website Link");
    let genres = check.genres("genres");
    let seeking_venue = check.flag("seeking_venue");
    let seeking_description = check.optional_text("seeking_description");

    let (Some(name), Some(city), Some(state), Some(phone), Some(genres)) =
        (name, city, state, phone, genres)
    else {
        return Err(check.errors);
    };
    check.finish()?;

    Ok(ArtistFields {
        name,
        city,
        state,
        phone,
        image_link,
        facebook_link,
        website_link,
        genres,
        seeking_venue,
        seeking_description,
    })
}

/// Validates a show submission. The outer error is a lookup failure; the
/// inner one is the field error map.
pub fn validate_show<L>(
    form: &FormData,
    lookup: &L,
    tz: Tz,
) -> Result<Result<ShowFields, FieldErrors>, L::Error>
where
    L: RecordLookup + ?Sized,
{
    let mut check = FieldCheck::new(form);
    let artist_id = check.record_id("artist_id", "artist");
    let venue_id = check.record_id("venue_id", "venue");
    let start_time = check.start_time("start_time", tz);

    if let Some(id) = artist_id {
        if !lookup.artist_exists(id)? {
            check.errors.add("artist_id", "Artist does not exist");
        }
    }
    if let Some(id) = venue_id {
        if !lookup.venue_exists(id)? {
            check.errors.add("venue_id", "Venue does not exist");
        }
    }

    let (Some(artist_id), Some(venue_id), Some(start_time)) = (artist_id, venue_id, start_time)
    else {
        return Ok(Err(check.errors));
    };
    if let Err(errors) = check.finish() {
        return Ok(Err(errors));
    }

    Ok(Ok(ShowFields {
        artist_id,
        venue_id,
        start_time,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;

    use chrono::TimeZone;

    fn venue_form() -> FormData {
        FormData::from_pairs([
            ("name", "The Musical Hop"),
            ("city", "San Francisco"),
            ("state", "CA"),
            ("address", "1015 Folsom Street"),
            ("phone", "(123) 123-1234"),
            ("image_link", "https://images.example.com/hop.jpg"),
            ("facebook_link", "https://www.facebook.com/TheMusicalHop"),
            ("website_link", "https://www.themusicalhop.com"),
            ("genres", "Jazz"),
            ("genres", "Reggae"),
            ("seeking_talent", "y"),
            ("seeking_description", "Looking for local artists"),
        ])
    }

    fn artist_form() -> FormData {
        FormData::from_pairs([
            ("name", "Guns N Petals"),
            ("city", "San Francisco"),
            ("state", "CA"),
            ("phone", "326-123-5000"),
            ("genres", "Rock n Roll"),
        ])
    }

    struct Known {
        artists: Vec<i64>,
        venues: Vec<i64>,
        lookups: Cell<usize>,
    }

    impl Known {
        fn new(artists: &[i64], venues: &[i64]) -> Self {
            Self {
                artists: artists.to_vec(),
                venues: venues.to_vec(),
                lookups: Cell::new(0),
            }
        }
    }

    impl RecordLookup for Known {
        type Error = Infallible;

        fn artist_exists(&self, id: i64) -> Result<bool, Infallible> {
            self.lookups.set(self.lookups.get() + 1);
            Ok(self.artists.contains(&id))
        }

        fn venue_exists(&self, id: i64) -> Result<bool, Infallible> {
            self.lookups.set(self.lookups.get() + 1);
            Ok(self.venues.contains(&id))
        }
    }

    #[test]
    fn parses_repeated_keys_from_urlencoded_body() {
        let form = FormData::parse(
            b"name=The+Dueling+Pianos&genres=Jazz&genres=R%26B&seeking_talent=y",
        );
        assert_eq!(form.value("name"), Some("The Dueling Pianos"));
        assert_eq!(form.values("genres"), vec!["Jazz", "R&B"]);
        assert!(form.contains("seeking_talent"));
        assert!(!form.contains("seeking_description"));
    }

    #[test]
    fn phone_pattern_accepts_ten_digits_with_optional_separators() {
        for ok in [
            "(555) 123-4567",
            "555-123-4567",
            "555.123.4567",
            "555 123 4567",
            "5551234567",
            "(555)123-4567",
        ] {
            assert!(is_valid_phone(ok), "{ok} should pass");
        }
        for bad in [
            "12345",
            "555-1234-567",
            "555--123-4567",
            "55512345678",
            "555-123-456a",
            "",
        ] {
            assert!(!is_valid_phone(bad), "{bad} should fail");
        }
    }

    #[test]
    fn valid_venue_form_produces_typed_fields() {
        let fields = validate_venue(&venue_form()).expect("valid venue");
        assert_eq!(fields.name, "The Musical Hop");
        assert_eq!(fields.state, State::Ca);
        assert_eq!(fields.genres, vec![Genre::Jazz, Genre::Reggae]);
        assert!(fields.seeking_talent);
        assert_eq!(
            fields.website_link.as_deref(),
            Some("https://www.themusicalhop.com")
        );
    }

    #[test]
    fn venue_validation_collects_every_failing_field() {
        let form = FormData::from_pairs([
            ("name", "  "),
            ("state", "XX"),
            ("phone", "12345"),
            ("image_link", "not a url"),
            ("genres", "Jazz"),
            ("genres", "Polka"),
        ]);
        let errors = validate_venue(&form).expect_err("invalid venue");
        assert_eq!(errors.messages("name"), [REQUIRED]);
        assert_eq!(errors.messages("city"), [REQUIRED]);
        assert_eq!(errors.messages("address"), [REQUIRED]);
        assert_eq!(errors.messages("state"), ["Invalid State"]);
        assert_eq!(errors.messages("phone"), ["Invalid phone number"]);
        assert_eq!(errors.messages("image_link"), ["Invalid Image Link"]);
        assert_eq!(errors.messages("genres"), ["Invalid Genre Selection"]);
        assert!(errors.messages("facebook_link").is_empty());
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn url_error_alone_still_fails_validation() {
        let mut form = artist_form();
        form.push("facebook_link", "ftp://facebook.com/someone");
        let errors = validate_artist(&form).expect_err("bad link");
        assert_eq!(errors.messages("facebook_link"), ["Invalid Facebook Link"]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn links_are_optional() {
        let fields = validate_artist(&artist_form()).expect("valid artist");
        assert_eq!(fields.image_link, None);
        assert_eq!(fields.facebook_link, None);
        assert_eq!(fields.website_link, None);
        assert!(!fields.seeking_venue);
        assert_eq!(fields.seeking_description, None);
    }

    #[test]
    fn url_shape() {
        assert!(is_well_formed_url("https://www.example.com/path?q=1"));
        assert!(is_well_formed_url("http://example.org"));
        assert!(!is_well_formed_url("www.example.com"));
        assert!(!is_well_formed_url("https://localhost"));
        assert!(!is_well_formed_url("mailto:someone@example.com"));
    }

    #[test]
    fn genre_validation_fails_iff_an_element_is_outside_the_set() {
        let all_known = ["Blues", "Hip-Hop", "Musical Theatre"];
        let mut form = artist_form();
        for genre in all_known {
            form.push("genres", genre);
        }
        assert!(validate_artist(&form).is_ok());

        form.push("genres", "Vaporwave");
        let errors = validate_artist(&form).expect_err("unknown genre");
        assert_eq!(errors.messages("genres"), ["Invalid Genre Selection"]);

        let empty = FormData::from_pairs([
            ("name", "x"),
            ("city", "y"),
            ("state", "NY"),
            ("phone", "5551234567"),
        ]);
        let errors = validate_artist(&empty).expect_err("missing genres");
        assert_eq!(errors.messages("genres"), [REQUIRED]);
    }

    #[test]
    fn seeking_flag_follows_checkbox_presence() {
        let mut form = artist_form();
        assert!(!validate_artist(&form).expect("valid").seeking_venue);
        form.push("seeking_venue", "false");
        assert!(!validate_artist(&form).expect("valid").seeking_venue);

        let mut form = artist_form();
        form.push("seeking_venue", "on");
        assert!(validate_artist(&form).expect("valid").seeking_venue);
    }

    #[test]
    fn prefilled_form_validates_back_to_the_same_fields() {
        let fields = validate_venue(&venue_form()).expect("valid venue");
        let again = validate_venue(&FormData::from(&fields)).expect("prefill validates");
        assert_eq!(fields, again);
    }

    #[test]
    fn show_with_unknown_artist_fails_validation() {
        let lookup = Known::new(&[1], &[1]);
        let form = FormData::from_pairs([
            ("artist_id", "42"),
            ("venue_id", "1"),
            ("start_time", "2035-04-01 20:00:00"),
        ]);
        let errors = validate_show(&form, &lookup, Tz::UTC)
            .expect("lookup")
            .expect_err("unknown artist");
        assert_eq!(errors.messages("artist_id"), ["Artist does not exist"]);
        assert!(errors.messages("venue_id").is_empty());
    }

    #[test]
    fn show_start_time_is_read_in_display_zone() {
        let lookup = Known::new(&[1], &[2]);
        let form = FormData::from_pairs([
            ("artist_id", "1"),
            ("venue_id", "2"),
            ("start_time", "2035-04-01T20:00"),
        ]);
        let fields = validate_show(&form, &lookup, chrono_tz::America::New_York)
            .expect("lookup")
            .expect("valid show");
        assert_eq!(
            fields.start_time,
            Utc.with_ymd_and_hms(2035, 4, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(lookup.lookups.get(), 2);
    }

    #[test]
    fn malformed_show_fields_skip_lookups() {
        let lookup = Known::new(&[], &[]);
        let form = FormData::from_pairs([("artist_id", "abc"), ("start_time", "tomorrow")]);
        let errors = validate_show(&form, &lookup, Tz::UTC)
            .expect("lookup")
            .expect_err("invalid show");
        assert_eq!(errors.messages("artist_id"), ["Invalid artist id"]);
        assert_eq!(errors.messages("venue_id"), [REQUIRED]);
        assert_eq!(
            errors.messages("start_time"),
            ["Not a valid datetime value."]
        );
        assert_eq!(lookup.lookups.get(), 0);
    }
}
