// Request handlers: one use case per route, all state in the store

use axum::{
    extract::{FromRef, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use rusqlite::Connection;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::db::{self, InsertOutcome};
use crate::error::AppError;
use crate::flash::{self, FlashKey, Flashes};
use crate::rating;
use crate::views;

pub const DUPLICATE_COURSE_MESSAGE: &str = "This course is already registered.";
pub const BAD_PASSWORD_MESSAGE: &str = "Incorrect password.";

const MAX_NAME_LEN: usize = 100;
const MAX_REVIEW_LEN: usize = 300;

/// Shared application state, handed to every handler
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    admin_password: Arc<str>,
    flash_key: FlashKey,
}

impl AppState {
    /// `conn` must already have the schema set up
    pub fn new(conn: Connection, admin_password: &str, secret_key: &str) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            admin_password: Arc::from(admin_password),
            flash_key: FlashKey::new(secret_key),
        }
    }

    /// Handle on the underlying store
    pub fn store(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }

    /// Lock the store for the rest of the request
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("database lock poisoned")))
    }
}

impl FromRef<AppState> for FlashKey {
    fn from_ref(state: &AppState) -> Self {
        state.flash_key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add", post(add_course))
        .route("/delete/:id", get(delete_course))
        .route("/search", get(search_form).post(search))
        .route("/manage", get(manage))
        .route("/course/:id", get(course_detail))
        .route("/admin_login", post(admin_login))
        .route("/add_review/:id", post(add_review))
        .route("/delete_review/:id", get(delete_review).post(delete_review))
        .route("/course_admin/:id", get(course_detail_admin))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Form Payloads (fields optional so absence is a validation error, not a 500)
// ============================================================================

#[derive(Deserialize)]
pub struct CourseForm {
    name: Option<String>,
    teacher: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchForm {
    search: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    password: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewForm {
    review: Option<String>,
    rating: Option<String>,
}

/// Present, non-blank and within `max` characters
fn required_text(value: Option<String>, field: &'static str, max: usize) -> Result<String, AppError> {
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingField(field))?;

    if value.chars().count() > max {
        return Err(AppError::FieldTooLong { field, max });
    }

    Ok(value)
}

/// Any `i32` is accepted; the 1-5 range is a form convention only
fn parse_rating(value: Option<String>) -> Result<i64, AppError> {
    let raw = value
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingField("rating"))?;

    raw.trim()
        .parse::<i32>()
        .map(i64::from)
        .map_err(|e| AppError::InvalidField {
            field: "rating",
            reason: e.to_string(),
        })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - All courses
async fn index(State(state): State<AppState>, flashes: Flashes) -> Result<Response, AppError> {
    let courses = db::get_all_courses(&*state.conn()?)?;
    let page = views::list_page(&courses, flashes.messages());

    Ok((flashes, Html(page)).into_response())
}

/// POST /add - Register a course unless (name, teacher) already exists
async fn add_course(
    State(state): State<AppState>,
    Form(form): Form<CourseForm>,
) -> Result<Response, AppError> {
    let name = required_text(form.name, "name", MAX_NAME_LEN)?;
    let teacher = required_text(form.teacher, "teacher", MAX_NAME_LEN)?;

    let outcome = {
        let conn = state.conn()?;
        match db::find_course_by_name_and_teacher(&conn, &name, &teacher)? {
            Some(_) => InsertOutcome::Duplicate,
            None => db::insert_course(&conn, &name, &teacher)?,
        }
    };

    match outcome {
        InsertOutcome::Inserted(id) => {
            info!(course_id = id, %name, %teacher, "course added");
            Ok(Redirect::to(&format!("/course/{id}")).into_response())
        }
        InsertOutcome::Duplicate => {
            warn!(%name, %teacher, "duplicate course rejected");
            Ok(flash::redirect_with_flash(
                &state.flash_key,
                "/",
                flash::COURSE_ERROR,
                DUPLICATE_COURSE_MESSAGE,
            ))
        }
    }
}

/// GET /delete/:id - Delete a course and, through the cascade, its reviews
async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    if !db::delete_course(&*state.conn()?, id)? {
        return Err(AppError::NotFound);
    }

    info!(course_id = id, "course deleted");
    Ok(Redirect::to("/manage"))
}

/// GET /search - Empty search page
async fn search_form() -> Html<String> {
    Html(views::search_page(&[]))
}

/// POST /search - Courses whose name or teacher contains the term
async fn search(
    State(state): State<AppState>,
    Form(form): Form<SearchForm>,
) -> Result<Html<String>, AppError> {
    let term = form.search.ok_or(AppError::MissingField("search"))?;
    let results = db::search_courses(&*state.conn()?, &term)?;

    Ok(Html(views::search_page(&results)))
}

/// GET /manage - All courses with admin controls
async fn manage(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let courses = db::get_all_courses(&*state.conn()?)?;
    Ok(Html(views::manage_page(&courses)))
}

/// GET /course/:id - Public course page with reviews
async fn course_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let conn = state.conn()?;
    let course = db::get_course(&conn, id)?.ok_or(AppError::NotFound)?;
    let reviews = db::get_reviews_for_course(&conn, id)?;

    Ok(Html(views::detail_page(&course, &reviews)))
}

/// POST /admin_login - Check the shared admin password. No session is kept.
async fn admin_login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let password = form.password.ok_or(AppError::MissingField("password"))?;

    if password == *state.admin_password {
        info!("admin login accepted");
        return Ok(Redirect::to("/manage").into_response());
    }

    warn!("admin login rejected");
    Ok(flash::redirect_with_flash(
        &state.flash_key,
        "/",
        flash::ADMIN_ERROR,
        BAD_PASSWORD_MESSAGE,
    ))
}

/// POST /add_review/:id - Store a review and refresh the course rating
async fn add_review(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect, AppError> {
    let text = required_text(form.review, "review", MAX_REVIEW_LEN)?;
    let rating = parse_rating(form.rating)?;

    let mut conn = state.conn()?;
    let tx = conn.transaction().map_err(anyhow::Error::from)?;

    let review_id = db::insert_review(&tx, course_id, &text, rating)?.ok_or(AppError::NotFound)?;
    rating::recompute(&tx, course_id)?;

    tx.commit().map_err(anyhow::Error::from)?;

    info!(course_id, review_id, rating, "review added");
    Ok(Redirect::to(&format!("/course/{course_id}")))
}

/// GET|POST /delete_review/:id - Remove a review, back to the admin page
async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
) -> Result<Redirect, AppError> {
    let mut conn = state.conn()?;
    let tx = conn.transaction().map_err(anyhow::Error::from)?;

    let removed = db::delete_review(&tx, review_id)?.ok_or(AppError::NotFound)?;
    rating::recompute(&tx, removed.course_id)?;

    tx.commit().map_err(anyhow::Error::from)?;

    info!(review_id, course_id = removed.course_id, "review deleted");
    Ok(Redirect::to(&format!("/course_admin/{}", removed.course_id)))
}

/// GET /course_admin/:id - Course page with review delete controls
async fn course_detail_admin(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let conn = state.conn()?;
    let course = db::get_course(&conn, id)?.ok_or(AppError::NotFound)?;
    let reviews = db::get_reviews_for_course(&conn, id)?;

    Ok(Html(views::admin_detail_page(&course, &reviews)))
}

/// GET /health - Health check
async fn health_check() -> &'static str {
    "OK"
}
