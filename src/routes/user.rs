use crate::{
    routes::{errors::ErrorPage, Page, RespondOrRedirect},
    template_utils::{IntoContext, Ructe},
};
use microblog_models::{
    follows::FollowOutcome,
    posts::Post,
    users::{NewUser, User},
    Error, MicroblogRocket,
};
use rocket::{
    request::LenientForm,
    response::{Flash, Redirect},
};
use std::{borrow::Cow, collections::HashMap};
use tracing::info;
use validator::{Validate, ValidationError, ValidationErrors};

#[get("/user/<name>?<page>")]
pub fn details(
    user: User,
    name: String,
    page: Option<Page>,
    rockets: MicroblogRocket,
) -> Result<Ructe, ErrorPage> {
    let conn = &*rockets.conn;
    let page = page.unwrap_or_default();
    let target = User::find_by_name(conn, &name)?;
    let posts = Post::author_page(conn, &target, page.limits())?;
    let posts_count = Post::count_for_author(conn, &target)?;

    Ok(render!(users::details(
        &rockets.to_context(),
        target.clone(),
        user.is_following(conn, target.id)?,
        target.count_followers(conn)?,
        target.count_followed(conn)?,
        posts,
        *page,
        Page::total(posts_count as i32)
    )))
}

#[get("/user/<name>/followers?<page>")]
pub fn followers(
    _user: User,
    name: String,
    page: Option<Page>,
    rockets: MicroblogRocket,
) -> Result<Ructe, ErrorPage> {
    let conn = &*rockets.conn;
    let page = page.unwrap_or_default();
    let target = User::find_by_name(conn, &name)?;
    let followers_count = target.count_followers(conn)?;

    Ok(render!(users::follows(
        &rockets.to_context(),
        format!("Followers of {}", target.username),
        target.get_followers_page(conn, page.limits())?,
        *page,
        Page::total(followers_count as i32)
    )))
}

#[get("/user/<name>/following?<page>")]
pub fn following(
    _user: User,
    name: String,
    page: Option<Page>,
    rockets: MicroblogRocket,
) -> Result<Ructe, ErrorPage> {
    let conn = &*rockets.conn;
    let page = page.unwrap_or_default();
    let target = User::find_by_name(conn, &name)?;
    let followed_count = target.count_followed(conn)?;

    Ok(render!(users::follows(
        &rockets.to_context(),
        format!("Followed by {}", target.username),
        target.get_followed_page(conn, page.limits())?,
        *page,
        Page::total(followed_count as i32)
    )))
}

#[get("/follow/<name>")]
pub fn follow(user: User, name: String, rockets: MicroblogRocket) -> Result<Flash<Redirect>, ErrorPage> {
    Ok(match user.follow_by_name(&*rockets.conn, &name)? {
        FollowOutcome::UnknownUser => {
            Flash::error(Redirect::to("/"), format!("User {} not found", name))
        }
        FollowOutcome::SelfTarget(target) => Flash::error(
            Redirect::to(uri!(details: name = target.username.clone(), page = _)),
            "You cannot follow yourself!",
        ),
        FollowOutcome::Done(target) => Flash::success(
            Redirect::to(uri!(details: name = target.username.clone(), page = _)),
            format!("You are following {}!", target.username),
        ),
    })
}

#[get("/unfollow/<name>")]
pub fn unfollow(user: User, name: String, rockets: MicroblogRocket) -> Result<Flash<Redirect>, ErrorPage> {
    Ok(match user.unfollow_by_name(&*rockets.conn, &name)? {
        FollowOutcome::UnknownUser => {
            Flash::error(Redirect::to("/"), format!("User {} not found", name))
        }
        FollowOutcome::SelfTarget(target) => Flash::error(
            Redirect::to(uri!(details: name = target.username.clone(), page = _)),
            "You cannot unfollow yourself!",
        ),
        FollowOutcome::Done(target) => Flash::success(
            Redirect::to(uri!(details: name = target.username.clone(), page = _)),
            format!("You are no longer following {}!", target.username),
        ),
    })
}

#[derive(Default, FromForm, Validate)]
pub struct EditProfileForm {
    #[validate(
        length(min = 1, max = 64, message = "Username should be between 1 and 64 characters long"),
        custom(
            function = "validate_username",
            message = "User name is not allowed to contain any of < > & @ ' or \""
        )
    )]
    pub username: String,
    #[validate(length(max = 140, message = "About me can't be longer than 140 characters"))]
    pub about_me: String,
}

#[get("/edit_profile")]
pub fn edit_profile(user: User, rockets: MicroblogRocket) -> Ructe {
    render!(users::edit(
        &rockets.to_context(),
        &EditProfileForm {
            username: user.username.clone(),
            about_me: user.about_me.clone(),
        },
        ValidationErrors::default()
    ))
}

#[post("/edit_profile", data = "<form>")]
pub fn update_profile(
    user: User,
    form: LenientForm<EditProfileForm>,
    rockets: MicroblogRocket,
) -> Result<RespondOrRedirect, ErrorPage> {
    let conn = &*rockets.conn;
    let mut form = form.into_inner();
    form.username = form.username.trim().to_owned();

    let mut errors = match form.validate() {
        Ok(_) => ValidationErrors::new(),
        Err(errors) => errors,
    };
    if form.username != user.username && User::username_used(conn, &form.username)? {
        errors.add("username", taken("username", "Please use a different username."));
    }
    if errors.is_empty() {
        match user.update_profile(conn, &form.username, &form.about_me) {
            Ok(updated) => {
                info!("{} updated their profile", updated.username);
                return Ok(Flash::success(
                    Redirect::to(uri!(edit_profile)),
                    "Your changes have been saved",
                )
                .into());
            }
            Err(Error::UserAlreadyExists) => {
                errors.add("username", taken("username", "Please use a different username."))
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(render!(users::edit(&rockets.to_context(), &form, errors)).into())
}

#[derive(Default, FromForm, Validate)]
#[validate(schema(
    function = "passwords_match",
    skip_on_field_errors = false,
    message = "Passwords are not matching"
))]
pub struct NewUserForm {
    #[validate(
        length(min = 1, max = 64, message = "Username should be between 1 and 64 characters long"),
        custom(
            function = "validate_username",
            message = "User name is not allowed to contain any of < > & @ ' or \""
        )
    )]
    pub username: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password should be at least 8 characters long"))]
    pub password: String,
    #[validate(length(min = 8, message = "Password should be at least 8 characters long"))]
    pub password_confirmation: String,
}

pub fn passwords_match(form: &NewUserForm) -> Result<(), ValidationError> {
    if form.password != form.password_confirmation {
        Err(ValidationError::new("password_match"))
    } else {
        Ok(())
    }
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.contains(&['<', '>', '&', '@', '\'', '"'][..])
        || username.chars().any(char::is_whitespace)
    {
        Err(ValidationError::new("username_illegal_char"))
    } else {
        Ok(())
    }
}

fn taken(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError {
        code: Cow::from(code),
        message: Some(Cow::from(message)),
        params: HashMap::new(),
    }
}

#[get("/register")]
pub fn register(rockets: MicroblogRocket) -> RespondOrRedirect {
    if rockets.user.is_some() {
        return Redirect::to("/").into();
    }
    render!(users::new(
        &rockets.to_context(),
        &NewUserForm::default(),
        ValidationErrors::default()
    ))
    .into()
}

#[post("/register", data = "<form>")]
pub fn create(
    form: LenientForm<NewUserForm>,
    rockets: MicroblogRocket,
) -> Result<RespondOrRedirect, ErrorPage> {
    if rockets.user.is_some() {
        return Ok(Redirect::to("/").into());
    }
    let conn = &*rockets.conn;
    let mut form = form.into_inner();
    form.username = form.username.trim().to_owned();
    form.email = form.email.trim().to_owned();

    let mut errors = match form.validate() {
        Ok(_) => ValidationErrors::new(),
        Err(errors) => errors,
    };
    if User::username_used(conn, &form.username)? {
        errors.add("username", taken("username", "Please use a different username."));
    }
    if User::email_used(conn, &form.email)? {
        errors.add("email", taken("email", "Please use a different email address."));
    }
    if errors.is_empty() {
        match NewUser::new_local(
            conn,
            form.username.clone(),
            form.email.clone(),
            "",
            &form.password,
        ) {
            Ok(user) => {
                info!("new user registered: {}", user.username);
                return Ok(Flash::success(
                    Redirect::to("/login"),
                    "Congratulations! You are now a registered user!",
                )
                .into());
            }
            Err(Error::UserAlreadyExists) => errors.add(
                "username",
                taken("username", "Please use a different username."),
            ),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(render!(users::new(&rockets.to_context(), &form, errors)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, password: &str, confirmation: &str) -> NewUserForm {
        NewUserForm {
            username: username.to_owned(),
            email: "alice@example.com".to_owned(),
            password: password.to_owned(),
            password_confirmation: confirmation.to_owned(),
        }
    }

    #[test]
    fn usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("alice_42").is_ok());
        for name in &["al ice", "<alice>", "alice@home", "a&b", "it's", "say\"hi\"", "tab\t"] {
            assert!(validate_username(name).is_err(), "{:?} was accepted", name);
        }
    }

    #[test]
    fn registration_form() {
        assert!(form("alice", "long enough", "long enough").validate().is_ok());
        assert!(form("alice", "short", "short").validate().is_err());
        assert!(form("", "long enough", "long enough").validate().is_err());

        let errors = form("alice", "long enough", "not the same").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("__all__"));

        let mut bad_email = form("alice", "long enough", "long enough");
        bad_email.email = "not an email".to_owned();
        let errors = bad_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn profile_form() {
        let ok = EditProfileForm {
            username: "alice".to_owned(),
            about_me: "x".repeat(140),
        };
        assert!(ok.validate().is_ok());
        let too_long = EditProfileForm {
            username: "alice".to_owned(),
            about_me: "x".repeat(141),
        };
        assert!(too_long.validate().is_err());
    }
}
