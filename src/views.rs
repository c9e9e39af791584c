// Server-rendered HTML pages
//
// Each page takes exactly the data its handler passes (courses, results,
// course + reviews). Every user-supplied value goes through `escape`.

use axum::http::StatusCode;
use std::fmt::Write;

use crate::db::{Course, Review};
use crate::flash::FlashMessage;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<nav><a href="/">Courses</a> | <a href="/search">Search</a></nav>
{body}
</body>
</html>
"#,
        title = escape(title),
    )
}

fn flash_list(flashes: &[FlashMessage]) -> String {
    if flashes.is_empty() {
        return String::new();
    }

    let mut html = String::from("<ul class=\"flashes\">\n");
    for flash in flashes {
        let _ = writeln!(
            html,
            "<li class=\"{}\">{}</li>",
            escape(&flash.category),
            escape(&flash.message)
        );
    }
    html.push_str("</ul>\n");
    html
}

fn stars(rating: f64) -> String {
    format!("{rating:.2}")
}

/// Table of courses; `link` builds the href for each row
fn course_table(courses: &[Course], link: impl Fn(&Course) -> String, admin: bool) -> String {
    if courses.is_empty() {
        return "<p>No courses.</p>\n".to_string();
    }

    let mut html = String::from(
        "<table>\n<tr><th>Course</th><th>Teacher</th><th>Rating</th>",
    );
    if admin {
        html.push_str("<th></th>");
    }
    html.push_str("</tr>\n");

    for course in courses {
        let _ = write!(
            html,
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td>",
            link(course),
            escape(&course.name),
            escape(&course.teacher),
            stars(course.star_rating)
        );
        if admin {
            let _ = write!(html, "<td><a href=\"/delete/{}\">Delete</a></td>", course.id);
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    html
}

/// Top page: every course, the add form and the admin login
pub fn list_page(courses: &[Course], flashes: &[FlashMessage]) -> String {
    let mut body = String::from("<h1>Courses</h1>\n");
    body.push_str(&flash_list(flashes));
    body.push_str(&course_table(courses, |c| format!("/course/{}", c.id), false));
    body.push_str(
        r#"<h2>Add a course</h2>
<form method="post" action="/add">
<input name="name" maxlength="100" placeholder="Course name" required>
<input name="teacher" maxlength="100" placeholder="Teacher" required>
<button type="submit">Add</button>
</form>
<h2>Admin</h2>
<form method="post" action="/admin_login">
<input type="password" name="password" placeholder="Password">
<button type="submit">Log in</button>
</form>
"#,
    );
    layout("Courses", &body)
}

pub fn search_page(results: &[Course]) -> String {
    let mut body = String::from(
        r#"<h1>Search</h1>
<form method="post" action="/search">
<input name="search" placeholder="Course or teacher">
<button type="submit">Search</button>
</form>
"#,
    );
    body.push_str(&course_table(results, |c| format!("/course/{}", c.id), false));
    layout("Search", &body)
}

pub fn manage_page(results: &[Course]) -> String {
    let mut body = String::from("<h1>Manage courses</h1>\n");
    body.push_str(&course_table(results, |c| format!("/course_admin/{}", c.id), true));
    layout("Manage courses", &body)
}

fn course_header(course: &Course) -> String {
    format!(
        "<h1>{}</h1>\n<p>Teacher: {}</p>\n<p>Rating: {}</p>\n",
        escape(&course.name),
        escape(&course.teacher),
        stars(course.star_rating)
    )
}

pub fn detail_page(course: &Course, reviews: &[Review]) -> String {
    let mut body = course_header(course);

    body.push_str("<h2>Reviews</h2>\n<ul>\n");
    for review in reviews {
        let _ = writeln!(
            body,
            "<li>{} ({}/5)</li>",
            escape(&review.review),
            review.rating
        );
    }
    body.push_str("</ul>\n");

    let _ = write!(
        body,
        r#"<h2>Write a review</h2>
<form method="post" action="/add_review/{id}">
<textarea name="review" maxlength="300" required></textarea>
<select name="rating">
<option value="5">5</option>
<option value="4">4</option>
<option value="3">3</option>
<option value="2">2</option>
<option value="1">1</option>
</select>
<button type="submit">Post</button>
</form>
"#,
        id = course.id
    );

    layout(&course.name, &body)
}

/// Same as the public detail page plus a delete control per review
pub fn admin_detail_page(course: &Course, reviews: &[Review]) -> String {
    let mut body = course_header(course);

    body.push_str("<h2>Reviews</h2>\n<ul>\n");
    for review in reviews {
        let _ = writeln!(
            body,
            "<li>{} ({}/5) <a href=\"/delete_review/{}\">Delete</a></li>",
            escape(&review.review),
            review.rating,
            review.review_id
        );
    }
    body.push_str("</ul>\n<p><a href=\"/manage\">Back to management</a></p>\n");

    layout(&course.name, &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n",
        status.as_u16(),
        escape(message)
    );
    layout(status.canonical_reason().unwrap_or("Error"), &body)
}
