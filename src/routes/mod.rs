use crate::template_utils::Ructe;
use microblog_models::CONFIG;
use rocket::{
    http::RawStr,
    request::FromFormValue,
    response::{Flash, NamedFile, Redirect},
};
use std::path::{Path, PathBuf};

/// Page number of a listing, starting at 1.
///
/// Numbers below 1 are read as 1.
#[derive(Shrinkwrap, Copy, Clone, Debug, PartialEq)]
pub struct Page(i32);

impl<'v> FromFormValue<'v> for Page {
    type Error = &'v RawStr;
    fn from_form_value(form_value: &'v RawStr) -> Result<Page, &'v RawStr> {
        match form_value.parse::<i32>() {
            Ok(page) => Ok(Page(page.max(1))),
            _ => Err(form_value),
        }
    }
}

impl Page {
    /// Computes the total number of pages needed to display n_items
    pub fn total(n_items: i32) -> i32 {
        Self::total_for(n_items, CONFIG.posts_per_page)
    }

    fn total_for(n_items: i32, per_page: i32) -> i32 {
        if n_items % per_page == 0 {
            n_items / per_page
        } else {
            (n_items / per_page) + 1
        }
    }

    /// The `(offset, end)` of this page's items.
    pub fn limits(self) -> (i32, i32) {
        self.limits_for(CONFIG.posts_per_page)
    }

    fn limits_for(self, per_page: i32) -> (i32, i32) {
        (
            (self.0 - 1).saturating_mul(per_page),
            self.0.saturating_mul(per_page),
        )
    }
}

impl Default for Page {
    fn default() -> Self {
        Page(1)
    }
}

#[derive(Responder)]
pub enum RespondOrRedirect {
    Response(Ructe),
    FlashResponse(Flash<Ructe>),
    Redirect(Redirect),
    FlashRedirect(Flash<Redirect>),
}

impl From<Ructe> for RespondOrRedirect {
    fn from(response: Ructe) -> Self {
        RespondOrRedirect::Response(response)
    }
}

impl From<Flash<Ructe>> for RespondOrRedirect {
    fn from(response: Flash<Ructe>) -> Self {
        RespondOrRedirect::FlashResponse(response)
    }
}

impl From<Redirect> for RespondOrRedirect {
    fn from(redirect: Redirect) -> Self {
        RespondOrRedirect::Redirect(redirect)
    }
}

impl From<Flash<Redirect>> for RespondOrRedirect {
    fn from(redirect: Flash<Redirect>) -> Self {
        RespondOrRedirect::FlashRedirect(redirect)
    }
}

pub mod errors;
pub mod posts;
pub mod search;
pub mod session;
pub mod user;

#[get("/static/<file..>", rank = 2)]
pub fn static_files(file: PathBuf) -> Option<NamedFile> {
    NamedFile::open(Path::new("static/").join(file)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_from_query() {
        let parse = |s: &'static str| Page::from_form_value(RawStr::from_str(s));
        assert_eq!(parse("3"), Ok(Page(3)));
        assert_eq!(parse("0"), Ok(Page(1)));
        assert_eq!(parse("-4"), Ok(Page(1)));
        assert!(parse("two").is_err());
    }

    #[test]
    fn limits_and_totals() {
        assert_eq!(Page(1).limits_for(25), (0, 25));
        assert_eq!(Page(3).limits_for(25), (50, 75));
        assert_eq!(Page(i32::MAX).limits_for(25), (i32::MAX, i32::MAX));

        assert_eq!(Page::total_for(0, 25), 0);
        assert_eq!(Page::total_for(25, 25), 1);
        assert_eq!(Page::total_for(26, 25), 2);
        assert_eq!(Page::total_for(50, 25), 2);
    }
}
