use crate::{
    template_utils::{IntoContext, Ructe},
    utils,
};
use microblog_models::{Error, MicroblogRocket};
use rocket::{
    http::Status,
    response::{self, Flash, Redirect, Responder},
    Request,
};
use tracing::warn;

/// Turns a model error into the matching error page.
#[derive(Debug)]
pub struct ErrorPage(Error);

impl From<Error> for ErrorPage {
    fn from(err: Error) -> ErrorPage {
        ErrorPage(err)
    }
}

impl<'r> Responder<'r> for ErrorPage {
    fn respond_to(self, _req: &Request<'_>) -> response::Result<'r> {
        match self.0 {
            Error::NotFound => Err(Status::NotFound),
            e => {
                warn!("{:?}", e);
                Err(Status::InternalServerError)
            }
        }
    }
}

#[catch(401)]
pub fn unauthorized(req: &Request<'_>) -> Flash<Redirect> {
    utils::requires_login("Please log in to access this page.", &req.uri().to_string())
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Option<Ructe> {
    let rockets = req.guard::<MicroblogRocket>().succeeded()?;
    Some(render!(errors::not_found(&rockets.to_context())))
}

#[catch(422)]
pub fn unprocessable_entity(req: &Request<'_>) -> Option<Ructe> {
    let rockets = req.guard::<MicroblogRocket>().succeeded()?;
    Some(render!(errors::unprocessable_entity(&rockets.to_context())))
}

#[catch(500)]
pub fn server_error(req: &Request<'_>) -> Option<Ructe> {
    let rockets = req.guard::<MicroblogRocket>().succeeded()?;
    Some(render!(errors::server_error(&rockets.to_context())))
}
