use anyhow::{Context, Result};
use rusqlite::{ffi, params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

/// A catalogued course, unique by (name, teacher)
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub teacher: String,

    /// Mean of the course's review ratings, truncated to two decimals.
    /// Only the rating aggregator writes this column.
    pub star_rating: f64,
}

/// A text review with a numeric rating, owned by exactly one course
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Review {
    pub review_id: i64,
    pub course_id: i64,
    pub review: String,
    pub rating: i64,
}

/// Result of trying to register a new course
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// A course with the same name and teacher already exists
    Duplicate,
}

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // SQLite leaves foreign keys off unless asked, per connection
    conn.pragma_update(None, "foreign_keys", true)?;

    // ==========================================================================
    // Course Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS course (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            teacher TEXT NOT NULL,
            star_rating REAL NOT NULL DEFAULT 0.0,
            UNIQUE (name, teacher)
        )",
        [],
    )?;

    // ==========================================================================
    // Review Table (deleting a course removes its reviews)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS review (
            review_id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
            review TEXT NOT NULL,
            rating INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_review_course_id ON review(course_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// COURSES
// ============================================================================

pub fn insert_course(conn: &Connection, name: &str, teacher: &str) -> Result<InsertOutcome> {
    let result = conn.execute(
        "INSERT INTO course (name, teacher) VALUES (?1, ?2)",
        params![name, teacher],
    );

    match result {
        Ok(_) => Ok(InsertOutcome::Inserted(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(InsertOutcome::Duplicate)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn find_course_by_name_and_teacher(
    conn: &Connection,
    name: &str,
    teacher: &str,
) -> Result<Option<Course>> {
    let course = conn
        .query_row(
            "SELECT id, name, teacher, star_rating FROM course
             WHERE name = ?1 AND teacher = ?2",
            params![name, teacher],
            course_from_row,
        )
        .optional()?;

    Ok(course)
}

pub fn get_course(conn: &Connection, id: i64) -> Result<Option<Course>> {
    let course = conn
        .query_row(
            "SELECT id, name, teacher, star_rating FROM course WHERE id = ?1",
            [id],
            course_from_row,
        )
        .optional()?;

    Ok(course)
}

pub fn get_all_courses(conn: &Connection) -> Result<Vec<Course>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, teacher, star_rating FROM course ORDER BY id",
    )?;

    let courses = stmt
        .query_map([], course_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(courses)
}

/// Courses whose name or teacher contains `term`.
///
/// Matching uses SQLite `LIKE`, so it ignores ASCII case. Wildcards in the
/// term are escaped and match literally. An empty term matches every course.
pub fn search_courses(conn: &Connection, term: &str) -> Result<Vec<Course>> {
    let pattern = format!("%{}%", escape_like(term));

    let mut stmt = conn.prepare(
        "SELECT id, name, teacher, star_rating FROM course
         WHERE name LIKE ?1 ESCAPE '\\' OR teacher LIKE ?1 ESCAPE '\\'
         ORDER BY id",
    )?;

    let courses = stmt
        .query_map([pattern], course_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(courses)
}

/// Returns false when no course had this id
pub fn delete_course(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM course WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

pub fn set_star_rating(conn: &Connection, course_id: i64, star_rating: f64) -> Result<()> {
    conn.execute(
        "UPDATE course SET star_rating = ?1 WHERE id = ?2",
        params![star_rating, course_id],
    )?;
    Ok(())
}

pub fn count_courses(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM course", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// REVIEWS
// ============================================================================

/// Insert a review, or `None` if the course does not exist
pub fn insert_review(
    conn: &Connection,
    course_id: i64,
    review: &str,
    rating: i64,
) -> Result<Option<i64>> {
    let result = conn.execute(
        "INSERT INTO review (course_id, review, rating) VALUES (?1, ?2, ?3)",
        params![course_id, review, rating],
    );

    match result {
        Ok(_) => Ok(Some(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_review(conn: &Connection, review_id: i64) -> Result<Option<Review>> {
    let review = conn
        .query_row(
            "SELECT review_id, course_id, review, rating FROM review WHERE review_id = ?1",
            [review_id],
            review_from_row,
        )
        .optional()?;

    Ok(review)
}

pub fn get_reviews_for_course(conn: &Connection, course_id: i64) -> Result<Vec<Review>> {
    let mut stmt = conn.prepare(
        "SELECT review_id, course_id, review, rating FROM review
         WHERE course_id = ?1
         ORDER BY review_id",
    )?;

    let reviews = stmt
        .query_map([course_id], review_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(reviews)
}

pub fn get_ratings_for_course(conn: &Connection, course_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT rating FROM review WHERE course_id = ?1")?;

    let ratings = stmt
        .query_map([course_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;

    Ok(ratings)
}

/// Delete a review and hand back what was removed (its course id is
/// needed for the redirect and re-aggregation)
pub fn delete_review(conn: &Connection, review_id: i64) -> Result<Option<Review>> {
    let Some(review) = get_review(conn, review_id)? else {
        return Ok(None);
    };

    conn.execute("DELETE FROM review WHERE review_id = ?1", [review_id])?;

    Ok(Some(review))
}

pub fn count_reviews(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM review", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn course_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        teacher: row.get(2)?,
        star_rating: row.get(3)?,
    })
}

fn review_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        review_id: row.get(0)?,
        course_id: row.get(1)?,
        review: row.get(2)?,
        rating: row.get(3)?,
    })
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
