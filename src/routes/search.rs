use crate::{
    routes::{errors::ErrorPage, Page, RespondOrRedirect},
    template_utils::{IntoContext, Ructe},
    utils,
};
use microblog_models::{users::User, Error, MicroblogRocket};
use rocket::{http::RawStr, request::LenientForm, response::Redirect};
use validator::{Validate, ValidationErrors};

#[derive(Default, FromForm, Validate)]
pub struct SearchForm {
    #[validate(length(min = 1, message = "Please type something to search for"))]
    pub q: String,
}

#[get("/search")]
pub fn index(_user: User, rockets: MicroblogRocket) -> Ructe {
    render!(search::index(
        &rockets.to_context(),
        &SearchForm::default(),
        ValidationErrors::default()
    ))
}

#[post("/search", data = "<form>")]
pub fn query(
    _user: User,
    form: LenientForm<SearchForm>,
    rockets: MicroblogRocket,
) -> RespondOrRedirect {
    let mut form = form.into_inner();
    form.q = form.q.trim().to_owned();
    match form.validate() {
        Ok(_) => Redirect::to(format!("/search_results/{}", utils::encode(&form.q))).into(),
        Err(errors) => render!(search::index(&rockets.to_context(), &form, errors)).into(),
    }
}

#[get("/search_results/<query>?<page>")]
pub fn results(
    _user: User,
    query: &RawStr,
    page: Option<Page>,
    rockets: MicroblogRocket,
) -> Result<Ructe, ErrorPage> {
    let query = query.url_decode().map_err(|_| Error::NotFound)?;
    let page = page.unwrap_or_default();
    let (posts, total) = rockets
        .searcher
        .search_document(&*rockets.conn, &query, page.limits())?;
    Ok(render!(search::results(
        &rockets.to_context(),
        &query,
        posts,
        *page,
        Page::total(total as i32)
    )))
}
