use crate::{
    routes::{errors::ErrorPage, Page, RespondOrRedirect},
    template_utils::{IntoContext, Ructe},
};
use microblog_models::{
    posts::{NewPost, Post},
    users::User,
    MicroblogRocket,
};
use rocket::{
    request::LenientForm,
    response::{Flash, Redirect},
};
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

#[derive(Default, FromForm, Validate)]
pub struct NewPostForm {
    #[validate(length(
        min = 1,
        max = 140,
        message = "A post should be between 1 and 140 characters long"
    ))]
    pub body: String,
}

fn feed(
    user: &User,
    page: Page,
    form: &NewPostForm,
    errors: ValidationErrors,
    rockets: &MicroblogRocket,
) -> Result<Ructe, ErrorPage> {
    let conn = &*rockets.conn;
    let posts = Post::feed_page(conn, user, page.limits())?;
    let total = Post::count_for_feed(conn, user)?;
    Ok(render!(posts::index(
        &rockets.to_context(),
        "Home",
        Some((form, errors)),
        posts,
        *page,
        Page::total(total as i32)
    )))
}

#[get("/?<page>")]
pub fn index(user: User, page: Option<Page>, rockets: MicroblogRocket) -> Result<Ructe, ErrorPage> {
    feed(
        &user,
        page.unwrap_or_default(),
        &NewPostForm::default(),
        ValidationErrors::default(),
        &rockets,
    )
}

#[get("/index?<page>")]
pub fn index_alias(
    user: User,
    page: Option<Page>,
    rockets: MicroblogRocket,
) -> Result<Ructe, ErrorPage> {
    index(user, page, rockets)
}

#[post("/", data = "<form>")]
pub fn create(
    user: User,
    form: LenientForm<NewPostForm>,
    rockets: MicroblogRocket,
) -> Result<RespondOrRedirect, ErrorPage> {
    let mut form = form.into_inner();
    form.body = form.body.trim().to_owned();
    if let Err(errors) = form.validate() {
        return Ok(feed(&user, Page::default(), &form, errors, &rockets)?.into());
    }

    let post = Post::insert(&*rockets.conn, NewPost::new(&user, &form.body), &rockets.searcher)?;
    info!("{} published post {}", user.username, post.id);

    let searcher = rockets.searcher.clone();
    rockets.worker.execute(move || {
        if let Err(e) = searcher.commit() {
            warn!("couldn't commit post {} to the search index: {:?}", post.id, e);
        }
    });

    Ok(Flash::success(Redirect::to("/"), "Your post is now live!").into())
}

#[post("/index", data = "<form>")]
pub fn create_alias(
    user: User,
    form: LenientForm<NewPostForm>,
    rockets: MicroblogRocket,
) -> Result<RespondOrRedirect, ErrorPage> {
    create(user, form, rockets)
}

#[get("/explore?<page>")]
pub fn explore(_user: User, page: Option<Page>, rockets: MicroblogRocket) -> Result<Ructe, ErrorPage> {
    let conn = &*rockets.conn;
    let page = page.unwrap_or_default();
    let posts = Post::explore_page(conn, page.limits())?;
    let total = Post::count(conn)?;
    Ok(render!(posts::index(
        &rockets.to_context(),
        "Explore",
        None,
        posts,
        *page,
        Page::total(total as i32)
    )))
}
