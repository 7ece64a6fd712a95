use axum::extract::{Path, RawForm, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::context::SharedContext;
use crate::db::{Store, StoreResult};
use crate::error::AppError;
use crate::filters::{format_datetime, DateFormat};
use crate::forms::{self, FieldErrors, FormData};
use crate::models::RecordKind;
use crate::views::{self, FormMode, Notice, ShowChoices};

pub fn router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/venues", get(venues))
        .route("/venues/search", post(search_venues))
        .route(
            "/venues/create",
            get(create_venue_form).post(create_venue_submission),
        )
        .route(
            "/venues/{id}",
            get(show_venue).post(delete_venue).delete(delete_venue),
        )
        .route(
            "/venues/{id}/edit",
            get(edit_venue).post(edit_venue_submission),
        )
        .route("/artists", get(artists))
        .route("/artists/search", post(search_artists))
        .route(
            "/artists/create",
            get(create_artist_form).post(create_artist_submission),
        )
        .route("/artists/{id}", get(show_artist))
        .route(
            "/artists/{id}/edit",
            get(edit_artist).post(edit_artist_submission),
        )
        .route("/shows", get(shows))
        .route(
            "/shows/create",
            get(create_show_form).post(create_show_submission),
        )
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn parse_id(raw: &str, kind: RecordKind) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::NotFound(format!("{kind} {raw:?}")))
}

fn invalid(body: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(body)).into_response()
}

fn home_with(notice: Notice) -> Response {
    Html(views::home(Some(&notice))).into_response()
}

async fn fallback() -> AppError {
    AppError::NotFound("page".to_string())
}

async fn index() -> Html<String> {
    Html(views::home(None))
}

//  Venues
//  ----------------------------------------------------------------

async fn venues(State(ctx): State<SharedContext>) -> Result<Html<String>, AppError> {
    let now = Utc::now();
    let areas = ctx
        .with_store(move |store| Ok(store.list_venues_grouped_by_location(now)?))
        .await?;
    Ok(Html(views::venues_index(&areas)))
}

async fn search_venues(
    State(ctx): State<SharedContext>,
    RawForm(body): RawForm,
) -> Result<Html<String>, AppError> {
    let term = FormData::parse(&body)
        .value("search_term")
        .unwrap_or("")
        .to_string();
    let now = Utc::now();
    let query = term.clone();
    let results = ctx
        .with_store(move |store| Ok(store.search_venues(&query, now)?))
        .await?;
    Ok(Html(views::search_results(
        RecordKind::Venue,
        &term,
        &results,
    )))
}

async fn show_venue(
    State(ctx): State<SharedContext>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let id = parse_id(&id, RecordKind::Venue)?;
    let now = Utc::now();
    let detail = ctx
        .with_store(move |store| Ok(store.venue_detail(id, now)?))
        .await?;
    Ok(Html(views::venue_detail(&detail, ctx.tz())))
}

async fn create_venue_form() -> Html<String> {
    Html(views::venue_form(
        FormMode::Create,
        &FormData::default(),
        &FieldErrors::default(),
        None,
    ))
}

async fn create_venue_submission(
    State(ctx): State<SharedContext>,
    RawForm(body): RawForm,
) -> Response {
    let form = FormData::parse(&body);
    let fields = match forms::validate_venue(&form) {
        Ok(fields) => fields,
        Err(errors) => {
            warn!(%errors, "venue form rejected");
            return invalid(views::venue_form(FormMode::Create, &form, &errors, None));
        }
    };

    let name = fields.name.clone();
    match ctx
        .with_store(move |store| Ok(store.create_venue(&fields)?))
        .await
    {
        Ok(id) => {
            info!(id, %name, "venue listed");
            home_with(Notice::success(format!(
                "Venue {name} was successfully listed!"
            )))
        }
        Err(err) => {
            error!(error = %err, %name, "venue insert failed");
            home_with(Notice::error(format!(
                "An error occurred. Venue {name} could not be listed."
            )))
        }
    }
}

async fn delete_venue(State(ctx): State<SharedContext>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id, RecordKind::Venue) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    match ctx
        .with_store(move |store| Ok(store.delete_venue(id)?))
        .await
    {
        Ok(removed) => {
            info!(id, removed, "venue delete");
            home_with(Notice::success("Venue was successfully removed!"))
        }
        Err(err) => {
            error!(error = %err, id, "venue delete failed");
            home_with(Notice::error(
                "An error occurred. Venue could not be removed.",
            ))
        }
    }
}

async fn edit_venue(
    State(ctx): State<SharedContext>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let id = parse_id(&id, RecordKind::Venue)?;
    let venue = ctx.with_store(move |store| Ok(store.get_venue(id)?)).await?;
    Ok(Html(views::venue_form(
        FormMode::Edit(id),
        &FormData::from(&venue.fields),
        &FieldErrors::default(),
        None,
    )))
}

async fn edit_venue_submission(
    State(ctx): State<SharedContext>,
    Path(id): Path<String>,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let id = parse_id(&id, RecordKind::Venue)?;
    let form = FormData::parse(&body);
    let fields = match forms::validate_venue(&form) {
        Ok(fields) => fields,
        Err(errors) => {
            warn!(id, %errors, "venue edit rejected");
            return Ok(invalid(views::venue_form(
                FormMode::Edit(id),
                &form,
                &errors,
                None,
            )));
        }
    };

    let name = fields.name.clone();
    match ctx
        .with_store(move |store| Ok(store.update_venue(id, &fields)?))
        .await
    {
        Ok(()) => {
            info!(id, %name, "venue updated");
            Ok(Redirect::to(&format!("/venues/{id}")).into_response())
        }
        Err(err) if err.is_not_found() => Err(err),
        Err(err) => {
            error!(error = %err, id, "venue update failed");
            let notice = Notice::error(format!(
                "An error occurred. Venue {name} could not be updated."
            ));
            Ok(Html(views::venue_form(
                FormMode::Edit(id),
                &form,
                &FieldErrors::default(),
                Some(&notice),
            ))
            .into_response())
        }
    }
}

//  Artists
//  ----------------------------------------------------------------

async fn artists(State(ctx): State<SharedContext>) -> Result<Html<String>, AppError> {
    let now = Utc::now();
    let artists = ctx
        .with_store(move |store| Ok(store.list_artists(now)?))
        .await?;
    Ok(Html(views::artists_index(&artists)))
}

async fn search_artists(
    State(ctx): State<SharedContext>,
    RawForm(body): RawForm,
) -> Result<Html<String>, AppError> {
    let term = FormData::parse(&body)
        .value("search_term")
        .unwrap_or("")
        .to_string();
    let now = Utc::now();
    let query = term.clone();
    let results = ctx
        .with_store(move |store| Ok(store.search_artists(&query, now)?))
        .await?;
    Ok(Html(views::search_results(
        RecordKind::Artist,
        &term,
        &results,
    )))
}

async fn show_artist(
    State(ctx): State<SharedContext>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let id = parse_id(&id, RecordKind::Artist)?;
    let now = Utc::now();
    let detail = ctx
        .with_store(move |store| Ok(store.artist_detail(id, now)?))
        .await?;
    Ok(Html(views::artist_detail(&detail, ctx.tz())))
}

async fn create_artist_form() -> Html<String> {
    Html(views::artist_form(
        FormMode::Create,
        &FormData::default(),
        &FieldErrors::default(),
        None,
    ))
}

async fn create_artist_submission(
    State(ctx): State<SharedContext>,
    RawForm(body): RawForm,
) -> Response {
    let form = FormData::parse(&body);
    let fields = match forms::validate_artist(&form) {
        Ok(fields) => fields,
        Err(errors) => {
            warn!(%errors, "artist form rejected");
            return invalid(views::artist_form(FormMode::Create, &form, &errors, None));
        }
    };

    let name = fields.name.clone();
    match ctx
        .with_store(move |store| Ok(store.create_artist(&fields)?))
        .await
    {
        Ok(id) => {
            info!(id, %name, "artist listed");
            home_with(Notice::success(format!(
                "Artist {name} was successfully listed!"
            )))
        }
        Err(err) => {
            error!(error = %err, %name, "artist insert failed");
            home_with(Notice::error(format!(
                "An error occurred. Artist {name} could not be listed."
            )))
        }
    }
}

async fn edit_artist(
    State(ctx): State<SharedContext>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let id = parse_id(&id, RecordKind::Artist)?;
    let artist = ctx
        .with_store(move |store| Ok(store.get_artist(id)?))
        .await?;
    Ok(Html(views::artist_form(
        FormMode::Edit(id),
        &FormData::from(&artist.fields),
        &FieldErrors::default(),
        None,
    )))
}

async fn edit_artist_submission(
    State(ctx): State<SharedContext>,
    Path(id): Path<String>,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let id = parse_id(&id, RecordKind::Artist)?;
    let form = FormData::parse(&body);
    let fields = match forms::validate_artist(&form) {
        Ok(fields) => fields,
        Err(errors) => {
            warn!(id, %errors, "artist edit rejected");
            return Ok(invalid(views::artist_form(
                FormMode::Edit(id),
                &form,
                &errors,
                None,
            )));
        }
    };

    let name = fields.name.clone();
    match ctx
        .with_store(move |store| Ok(store.update_artist(id, &fields)?))
        .await
    {
        Ok(()) => {
            info!(id, %name, "artist updated");
            Ok(Redirect::to(&format!("/artists/{id}")).into_response())
        }
        Err(err) if err.is_not_found() => Err(err),
        Err(err) => {
            error!(error = %err, id, "artist update failed");
            let notice = Notice::error(format!(
                "An error occurred. Artist {name} could not be updated."
            ));
            Ok(Html(views::artist_form(
                FormMode::Edit(id),
                &form,
                &FieldErrors::default(),
                Some(&notice),
            ))
            .into_response())
        }
    }
}

//  Shows
//  ----------------------------------------------------------------

async fn shows(State(ctx): State<SharedContext>) -> Result<Html<String>, AppError> {
    let shows = ctx.with_store(|store| Ok(store.list_shows()?)).await?;
    Ok(Html(views::shows_index(&shows, ctx.tz())))
}

fn show_choices(store: &Store) -> StoreResult<ShowChoices> {
    Ok(ShowChoices {
        artists: store.list_choices(RecordKind::Artist)?,
        venues: store.list_choices(RecordKind::Venue)?,
    })
}

async fn create_show_form(State(ctx): State<SharedContext>) -> Result<Html<String>, AppError> {
    let choices = ctx.with_store(|store| Ok(show_choices(store)?)).await?;
    let mut form = FormData::default();
    form.push(
        "start_time",
        format_datetime(Utc::now(), ctx.tz(), DateFormat::Input),
    );
    Ok(Html(views::show_form(
        &form,
        &FieldErrors::default(),
        &choices,
    )))
}

enum ShowSubmission {
    Listed(i64),
    Rejected(FieldErrors, ShowChoices),
}

async fn create_show_submission(
    State(ctx): State<SharedContext>,
    RawForm(body): RawForm,
) -> Response {
    let form = FormData::parse(&body);
    let tz = ctx.tz();
    let submitted = form.clone();
    let outcome = ctx
        .with_store(move |store| {
            match forms::validate_show(&submitted, &*store, tz)? {
                Ok(fields) => Ok(ShowSubmission::Listed(store.create_show(&fields)?)),
                Err(errors) => Ok(ShowSubmission::Rejected(errors, show_choices(store)?)),
            }
        })
        .await;

    match outcome {
        Ok(ShowSubmission::Listed(id)) => {
            info!(id, "show listed");
            home_with(Notice::success("Show was successfully listed!"))
        }
        Ok(ShowSubmission::Rejected(errors, choices)) => {
            warn!(%errors, "show form rejected");
            invalid(views::show_form(&form, &errors, &choices))
        }
        Err(err) => {
            error!(error = %err, "show insert failed");
            home_with(Notice::error(
                "An error occurred. Show could not be listed.",
            ))
        }
    }
}
