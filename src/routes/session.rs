use crate::{
    routes::RespondOrRedirect,
    template_utils::{IntoContext, Ructe},
    utils,
};
use microblog_models::{
    users::{User, AUTH_COOKIE},
    MicroblogRocket,
};
use rocket::{
    http::{Cookie, Cookies},
    request::LenientForm,
    response::{Flash, Redirect},
};
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

#[derive(Default, FromForm, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "We need a username"))]
    pub username: String,
    #[validate(length(min = 1, message = "Your password can't be empty"))]
    pub password: String,
    pub remember_me: bool,
}

#[get("/login?<next>")]
pub fn new(next: Option<String>, rockets: MicroblogRocket) -> RespondOrRedirect {
    if rockets.user.is_some() {
        return Redirect::to("/").into();
    }
    render!(session::login(
        &rockets.to_context(),
        utils::login_url(next.as_deref()),
        &LoginForm::default(),
        ValidationErrors::default()
    ))
    .into()
}

#[post("/login?<next>", data = "<form>")]
pub fn create(
    next: Option<String>,
    form: LenientForm<LoginForm>,
    rockets: MicroblogRocket,
    mut cookies: Cookies<'_>,
) -> Result<RespondOrRedirect, Ructe> {
    if rockets.user.is_some() {
        return Ok(Redirect::to("/").into());
    }
    let action = utils::login_url(next.as_deref());
    if let Err(errors) = form.validate() {
        return Err(render!(session::login(
            &rockets.to_context(),
            action,
            &form,
            errors
        )));
    }

    let user = match User::login(&*rockets.conn, &form.username, &form.password) {
        Ok(user) => user,
        Err(e) => {
            warn!("failed login for {}: {:?}", form.username, e);
            return Ok(Flash::error(Redirect::to(action), "Invalid username or password").into());
        }
    };

    let mut cookie = Cookie::new(AUTH_COOKIE, user.id.to_string());
    if form.remember_me {
        cookie.make_permanent();
    }
    cookies.add_private(cookie);
    info!("{} logged in", user.username);

    Ok(Redirect::to(utils::safe_next(next.as_deref())).into())
}

#[get("/logout")]
pub fn delete(mut cookies: Cookies<'_>) -> Redirect {
    if let Some(cookie) = cookies.get_private(AUTH_COOKIE) {
        cookies.remove_private(cookie);
    }
    Redirect::to("/")
}
