//! Server-rendered HTML for every page.
//!
//! Markup is assembled with `write!` into a `String`; every interpolated
//! value goes through [`escape`].

use std::fmt::Write;

use chrono_tz::Tz;

use crate::enums::{Genre, State};
use crate::filters::{format_datetime, DateFormat};
use crate::forms::{self, FieldErrors, FormData};
use crate::models::RecordKind;
use crate::pages::{Area, ArtistDetail, Detail, EntitySummary, SearchResults, ShowCard, ShowListing, VenueDetail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// One-shot banner shown above the page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Whether a record form creates a new row or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i64),
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn layout(title: &str, notice: Option<&Notice>, body: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} | Fyyur</title>\n</head>\n<body>\n<nav>\
         <a href=\"/\">Fyyur</a> <a href=\"/venues\">Venues</a> \
         <a href=\"/artists\">Artists</a> <a href=\"/shows\">Shows</a>\
         </nav>\n<main>\n",
        escape(title)
    );
    if let Some(notice) = notice {
        let class = match notice.kind {
            NoticeKind::Success => "notice notice-success",
            NoticeKind::Error => "notice notice-error",
        };
        let _ = writeln!(html, "<p class=\"{class}\">{}</p>", escape(&notice.text));
    }
    html.push_str(body);
    html.push_str("\n</main>\n</body>\n</html>\n");
    html
}

pub fn home(notice: Option<&Notice>) -> String {
    layout(
        "Home",
        notice,
        "<h1>Fyyur</h1>\n<ul class=\"actions\">\
         <li><a href=\"/venues/create\">Post a venue</a></li>\
         <li><a href=\"/artists/create\">Post an artist</a></li>\
         <li><a href=\"/shows/create\">Post a show</a></li></ul>\n\
         <form method=\"post\" action=\"/venues/search\">\
         <input type=\"search\" name=\"search_term\" placeholder=\"Find a venue\">\
         </form>\n\
         <form method=\"post\" action=\"/artists/search\">\
         <input type=\"search\" name=\"search_term\" placeholder=\"Find an artist\">\
         </form>",
    )
}

fn summary_item(out: &mut String, base: &str, summary: &EntitySummary) {
    let _ = writeln!(
        out,
        "<li class=\"summary\"><a href=\"/{base}/{}\">{}</a> \
         <span class=\"upcoming\">{} upcoming shows</span></li>",
        summary.id,
        escape(&summary.name),
        summary.num_upcoming_shows
    );
}

pub fn venues_index(areas: &[Area]) -> String {
    let mut body = String::from("<h1>Venues</h1>\n");
    if areas.is_empty() {
        body.push_str("<p class=\"empty\">No venues listed yet.</p>\n");
    }
    for area in areas {
        let _ = writeln!(
            body,
            "<section class=\"area\"><h2>{}, {}</h2>\n<ul>",
            escape(&area.city),
            area.state
        );
        for venue in &area.venues {
            summary_item(&mut body, "venues", venue);
        }
        body.push_str("</ul></section>\n");
    }
    layout("Venues", None, &body)
}

pub fn artists_index(artists: &[EntitySummary]) -> String {
    let mut body = String::from("<h1>Artists</h1>\n<ul>\n");
    for artist in artists {
        summary_item(&mut body, "artists", artist);
    }
    body.push_str("</ul>");
    layout("Artists", None, &body)
}

pub fn search_results(kind: RecordKind, term: &str, results: &SearchResults) -> String {
    let base = match kind {
        RecordKind::Venue => "venues",
        RecordKind::Artist => "artists",
    };
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<h1>Search results for \"{}\"</h1>\n<p class=\"count\">Number of search results: {}</p>\n<ul>",
        escape(term),
        results.count
    );
    for item in &results.data {
        summary_item(&mut body, base, item);
    }
    body.push_str("</ul>");
    layout("Search", None, &body)
}

fn show_cards(out: &mut String, heading: &str, base: &str, shows: &[ShowCard], tz: Tz) {
    let _ = writeln!(
        out,
        "<section class=\"{}\"><h2>{} {}</h2>\n<ul>",
        heading.to_lowercase().replace(' ', "-"),
        shows.len(),
        escape(heading)
    );
    for show in shows {
        let image = show
            .image_link
            .as_deref()
            .map(|src| format!("<img src=\"{}\" alt=\"\"> ", escape(src)))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "<li class=\"show\">{image}<a href=\"/{base}/{}\">{}</a> \
             <time>{}</time></li>",
            show.id,
            escape(&show.name),
            format_datetime(show.start_time, tz, DateFormat::Full)
        );
    }
    out.push_str("</ul></section>\n");
}

fn optional_link(out: &mut String, label: &str, value: &Option<String>) {
    if let Some(href) = value {
        let _ = writeln!(
            out,
            "<p class=\"link\">{label}: <a href=\"{0}\">{0}</a></p>",
            escape(href)
        );
    }
}

fn genre_tags(out: &mut String, genres: &[Genre]) {
    out.push_str("<ul class=\"genres\">");
    for genre in genres {
        let _ = write!(out, "<li>{}</li>", escape(genre.as_str()));
    }
    out.push_str("</ul>\n");
}

fn detail_tail<T>(out: &mut String, detail: &Detail<T>, base: &str, tz: Tz) {
    show_cards(out, "Past Shows", base, &detail.past_shows, tz);
    show_cards(out, "Upcoming Shows", base, &detail.upcoming_shows, tz);
}

pub fn venue_detail(detail: &VenueDetail, tz: Tz) -> String {
    let venue = &detail.record;
    let fields = &venue.fields;
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<h1 class=\"record-name\">{}</h1>\n<p class=\"record-id\">ID: {}</p>",
        escape(&fields.name),
        venue.id
    );
    genre_tags(&mut body, &fields.genres);
    let _ = writeln!(
        body,
        "<p class=\"address\">{}</p>\n<p class=\"location\">{}, {}</p>\n<p class=\"phone\">{}</p>",
        escape(&fields.address),
        escape(&fields.city),
        fields.state,
        escape(&fields.phone)
    );
    optional_link(&mut body, "Website", &fields.website_link);
    optional_link(&mut body, "Facebook", &fields.facebook_link);
    seeking(
        &mut body,
        fields.seeking_talent,
        "Currently seeking talent",
        "Not currently seeking talent",
        &fields.seeking_description,
    );
    if let Some(src) = &fields.image_link {
        let _ = writeln!(body, "<img class=\"record-image\" src=\"{}\" alt=\"\">", escape(src));
    }
    detail_tail(&mut body, detail, "artists", tz);
    let _ = writeln!(
        body,
        "<p><a href=\"/venues/{0}/edit\">Edit</a></p>\n\
         <form method=\"post\" action=\"/venues/{0}\"><button type=\"submit\">Delete</button></form>",
        venue.id
    );
    layout(&fields.name, None, &body)
}

pub fn artist_detail(detail: &ArtistDetail, tz: Tz) -> String {
    let artist = &detail.record;
    let fields = &artist.fields;
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<h1 class=\"record-name\">{}</h1>\n<p class=\"record-id\">ID: {}</p>",
        escape(&fields.name),
        artist.id
    );
    genre_tags(&mut body, &fields.genres);
    let _ = writeln!(
        body,
        "<p class=\"location\">{}, {}</p>\n<p class=\"phone\">{}</p>",
        escape(&fields.city),
        fields.state,
        escape(&fields.phone)
    );
    optional_link(&mut body, "Website", &fields.website_link);
    optional_link(&mut body, "Facebook", &fields.facebook_link);
    seeking(
        &mut body,
        fields.seeking_venue,
        "Currently seeking performance venues",
        "Not currently seeking performance venues",
        &fields.seeking_description,
    );
    if let Some(src) = &fields.image_link {
        let _ = writeln!(body, "<img class=\"record-image\" src=\"{}\" alt=\"\">", escape(src));
    }
    detail_tail(&mut body, detail, "venues", tz);
    let _ = writeln!(body, "<p><a href=\"/artists/{}/edit\">Edit</a></p>", artist.id);
    layout(&fields.name, None, &body)
}

fn seeking(out: &mut String, flag: bool, yes: &str, no: &str, description: &Option<String>) {
    if flag {
        let _ = writeln!(out, "<div class=\"seeking\"><p>{yes}</p>");
        if let Some(text) = description {
            let _ = writeln!(out, "<p class=\"seeking-description\">{}</p>", escape(text));
        }
        out.push_str("</div>\n");
    } else {
        let _ = writeln!(out, "<p class=\"not-seeking\">{no}</p>");
    }
}

pub fn shows_index(shows: &[ShowListing], tz: Tz) -> String {
    let mut body = String::from("<h1>Shows</h1>\n<ul>\n");
    for show in shows {
        let image = show
            .artist_image_link
            .as_deref()
            .map(|src| format!("<img src=\"{}\" alt=\"\"> ", escape(src)))
            .unwrap_or_default();
        let _ = writeln!(
            body,
            "<li class=\"show\">{image}<time>{}</time> \
             <a class=\"artist\" href=\"/artists/{}\">{}</a> playing at \
             <a class=\"venue\" href=\"/venues/{}\">{}</a></li>",
            format_datetime(show.start_time, tz, DateFormat::Medium),
            show.artist_id,
            escape(&show.artist_name),
            show.venue_id,
            escape(&show.venue_name)
        );
    }
    body.push_str("</ul>");
    layout("Shows", None, &body)
}

fn field_errors(out: &mut String, errors: &FieldErrors, name: &str) {
    let messages = errors.messages(name);
    if messages.is_empty() {
        return;
    }
    let _ = write!(out, "<ul class=\"errors\" data-field=\"{name}\">");
    for message in messages {
        let _ = write!(out, "<li>{}</li>", escape(message));
    }
    out.push_str("</ul>");
}

fn text_input(out: &mut String, form: &FormData, errors: &FieldErrors, name: &str, label: &str) {
    let _ = write!(
        out,
        "<p><label for=\"{name}\">{label}</label> \
         <input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{}\">",
        escape(form.value(name).unwrap_or(""))
    );
    field_errors(out, errors, name);
    out.push_str("</p>\n");
}

fn state_select(out: &mut String, form: &FormData, errors: &FieldErrors) {
    let selected = form.value("state").unwrap_or("");
    out.push_str("<p><label for=\"state\">State</label> <select id=\"state\" name=\"state\">");
    for state in State::ALL {
        let code = state.as_str();
        let mark = if code == selected { " selected" } else { "" };
        let _ = write!(out, "<option value=\"{code}\"{mark}>{code}</option>");
    }
    out.push_str("</select>");
    field_errors(out, errors, "state");
    out.push_str("</p>\n");
}

fn genre_select(out: &mut String, form: &FormData, errors: &FieldErrors) {
    let selected = form.values("genres");
    out.push_str(
        "<p><label for=\"genres\">Genres</label> <select id=\"genres\" name=\"genres\" multiple>",
    );
    for genre in Genre::ALL {
        let label = genre.as_str();
        let mark = if selected.contains(&label) { " selected" } else { "" };
        let _ = write!(
            out,
            "<option value=\"{0}\"{mark}>{0}</option>",
            escape(label)
        );
    }
    out.push_str("</select>");
    field_errors(out, errors, "genres");
    out.push_str("</p>\n");
}

fn checkbox(out: &mut String, form: &FormData, name: &str, label: &str) {
    let mark = if forms::is_checked(form, name) { " checked" } else { "" };
    let _ = writeln!(
        out,
        "<p><label><input type=\"checkbox\" name=\"{name}\" value=\"y\"{mark}> {label}</label></p>"
    );
}

fn error_summary(errors: &FieldErrors) -> Option<Notice> {
    if errors.is_empty() {
        return None;
    }
    let messages: Vec<&str> = errors
        .iter()
        .flat_map(|(_, messages)| messages.iter().map(String::as_str))
        .collect();
    Some(Notice::error(format!("Error: {}", messages.join(" "))))
}

fn form_target(mode: FormMode, base: &str) -> (String, &'static str) {
    match mode {
        FormMode::Create => (format!("/{base}/create"), "Create"),
        FormMode::Edit(id) => (format!("/{base}/{id}/edit"), "Save"),
    }
}

pub fn venue_form(
    mode: FormMode,
    form: &FormData,
    errors: &FieldErrors,
    notice: Option<&Notice>,
) -> String {
    let (action, submit) = form_target(mode, "venues");
    let title = match mode {
        FormMode::Create => "List a new venue",
        FormMode::Edit(_) => "Edit venue",
    };
    let mut body = String::new();
    let _ = writeln!(body, "<h1>{title}</h1>\n<form method=\"post\" action=\"{action}\">");
    text_input(&mut body, form, errors, "name", "Name");
    text_input(&mut body, form, errors, "city", "City");
    state_select(&mut body, form, errors);
    text_input(&mut body, form, errors, "address", "Address");
    text_input(&mut body, form, errors, "phone", "Phone");
    text_input(&mut body, form, errors, "image_link", "Image link");
    genre_select(&mut body, form, errors);
    text_input(&mut body, form, errors, "facebook_link", "Facebook link");
    text_input(&mut body, form, errors, "website_link", "Website link");
    checkbox(&mut body, form, "seeking_talent", "Seeking talent");
    text_input(&mut body, form, errors, "seeking_description", "Seeking description");
    let _ = writeln!(body, "<button type=\"submit\">{submit}</button>\n</form>");

    let summary = error_summary(errors);
    layout(title, notice.or(summary.as_ref()), &body)
}

pub fn artist_form(
    mode: FormMode,
    form: &FormData,
    errors: &FieldErrors,
    notice: Option<&Notice>,
) -> String {
    let (action, submit) = form_target(mode, "artists");
    let title = match mode {
        FormMode::Create => "List a new artist",
        FormMode::Edit(_) => "Edit artist",
    };
    let mut body = String::new();
    let _ = writeln!(body, "<h1>{title}</h1>\n<form method=\"post\" action=\"{action}\">");
    text_input(&mut body, form, errors, "name", "Name");
    text_input(&mut body, form, errors, "city", "City");
    state_select(&mut body, form, errors);
    text_input(&mut body, form, errors, "phone", "Phone");
    text_input(&mut body, form, errors, "image_link", "Image link");
    genre_select(&mut body, form, errors);
    text_input(&mut body, form, errors, "facebook_link", "Facebook link");
    text_input(&mut body, form, errors, "website_link", "Website link");
    checkbox(&mut body, form, "seeking_venue", "Seeking venue");
    text_input(&mut body, form, errors, "seeking_description", "Seeking description");
    let _ = writeln!(body, "<button type=\"submit\">{submit}</button>\n</form>");

    let summary = error_summary(errors);
    layout(title, notice.or(summary.as_ref()), &body)
}

fn record_select(
    out: &mut String,
    form: &FormData,
    errors: &FieldErrors,
    name: &str,
    label: &str,
    choices: &[(i64, String)],
) {
    let selected = form.value(name).unwrap_or("");
    let _ = write!(
        out,
        "<p><label for=\"{name}\">{label}</label> <select id=\"{name}\" name=\"{name}\">"
    );
    for (id, display) in choices {
        let value = id.to_string();
        let mark = if value == selected { " selected" } else { "" };
        let _ = write!(
            out,
            "<option value=\"{value}\"{mark}>{}</option>",
            escape(display)
        );
    }
    out.push_str("</select>");
    field_errors(out, errors, name);
    out.push_str("</p>\n");
}

/// Select-box options for the show form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowChoices {
    pub artists: Vec<(i64, String)>,
    pub venues: Vec<(i64, String)>,
}

pub fn show_form(form: &FormData, errors: &FieldErrors, choices: &ShowChoices) -> String {
    let mut body = String::from(
        "<h1>List a new show</h1>\n<form method=\"post\" action=\"/shows/create\">\n",
    );
    record_select(&mut body, form, errors, "artist_id", "Artist", &choices.artists);
    record_select(&mut body, form, errors, "venue_id", "Venue", &choices.venues);
    let _ = write!(
        body,
        "<p><label for=\"start_time\">Start time</label> \
         <input type=\"datetime-local\" id=\"start_time\" name=\"start_time\" value=\"{}\">",
        escape(form.value("start_time").unwrap_or(""))
    );
    field_errors(&mut body, errors, "start_time");
    body.push_str("</p>\n<button type=\"submit\">Create</button>\n</form>");

    let summary = error_summary(errors);
    layout("List a new show", summary.as_ref(), &body)
}

pub fn not_found() -> String {
    layout(
        "Not Found",
        None,
        "<h1>404</h1>\n<p>Sorry, we could not find that page.</p>",
    )
}

pub fn server_error() -> String {
    layout(
        "Server Error",
        None,
        "<h1>500</h1>\n<p>Something went wrong on our end. Please try again.</p>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::REQUIRED;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;"
        );
    }

    #[test]
    fn form_redisplays_values_and_messages() {
        let form = FormData::from_pairs([
            ("name", "<b>Loud</b>"),
            ("state", "NY"),
            ("genres", "Jazz"),
            ("seeking_talent", "y"),
        ]);
        let mut errors = FieldErrors::default();
        errors.add("phone", "Invalid phone number");
        errors.add("city", REQUIRED);

        let html = venue_form(FormMode::Create, &form, &errors, None);
        assert!(html.contains("value=\"&lt;b&gt;Loud&lt;/b&gt;\""));
        assert!(html.contains("<option value=\"NY\" selected>"));
        assert!(html.contains("<option value=\"Jazz\" selected>"));
        assert!(html.contains("name=\"seeking_talent\" value=\"y\" checked"));
        assert!(html.contains("data-field=\"phone\"><li>Invalid phone number</li>"));
        assert!(html.contains("class=\"notice notice-error\""));
    }

    #[test]
    fn rendered_checkbox_matches_stored_flag() {
        for value in ["y", "on", "false", "FALSE", "", " false "] {
            let form = FormData::from_pairs([
                ("name", "Guns N Petals"),
                ("city", "San Francisco"),
                ("state", "CA"),
                ("phone", "326-123-5000"),
                ("genres", "Jazz"),
                ("seeking_venue", value),
            ]);
            let stored = forms::validate_artist(&form)
                .expect("valid artist")
                .seeking_venue;
            let html = artist_form(FormMode::Create, &form, &FieldErrors::default(), None);
            let rendered = html.contains("name=\"seeking_venue\" value=\"y\" checked");
            assert_eq!(rendered, stored, "value {value:?}");
        }
    }

    #[test]
    fn edit_form_posts_back_to_the_record() {
        let html = artist_form(
            FormMode::Edit(7),
            &FormData::default(),
            &FieldErrors::default(),
            None,
        );
        assert!(html.contains("action=\"/artists/7/edit\""));
        assert!(!html.contains("class=\"notice"));
    }
}
