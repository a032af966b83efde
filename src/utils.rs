use rocket::response::{Flash, Redirect};
use url::{form_urlencoded, Url};

/// Sends an anonymous visitor to the login page, remembering where they wanted to go.
pub fn requires_login(message: &str, url: &str) -> Flash<Redirect> {
    Flash::new(Redirect::to(login_url(Some(url))), "info", message)
}

/// The login page, sending back to `next` once logged in.
pub fn login_url(next: Option<&str>) -> String {
    match next {
        Some(next) => format!("/login?next={}", encode(next)),
        None => "/login".to_owned(),
    }
}

/// Percent-encodes `s` so it fits in a query parameter or a single path segment.
pub fn encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Where to go after logging in.
///
/// Only local absolute paths are accepted, anything else falls back to `/`.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(next)
            if next.starts_with('/')
                && !next.starts_with("//")
                && !next.starts_with("/\\")
                && !next.chars().any(char::is_control)
                && Url::parse(next).is_err() =>
        {
            next.to_owned()
        }
        _ => "/".to_owned(),
    }
}
