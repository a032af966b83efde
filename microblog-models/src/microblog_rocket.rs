use crate::{db_conn::DbConn, search, users};
use rocket::{
    request::{self, FlashMessage, FromRequest, Request},
    Outcome, State,
};
use scheduled_thread_pool::ScheduledThreadPool;
use std::sync::Arc;

/// Common context needed by most routes and operations on models
pub struct MicroblogRocket {
    pub conn: DbConn,
    pub user: Option<users::User>,
    pub searcher: Arc<search::Searcher>,
    pub worker: Arc<ScheduledThreadPool>,
    pub flash_msg: Option<(String, String)>,
}

impl<'a, 'r> FromRequest<'a, 'r> for MicroblogRocket {
    type Error = ();

    fn from_request(request: &'a Request<'r>) -> request::Outcome<Self, Self::Error> {
        // the user guard returns its own connection before this one is taken
        let user = request.guard::<users::User>().succeeded();
        let conn = request.guard::<DbConn>()?;
        let worker = request.guard::<State<'_, Arc<ScheduledThreadPool>>>()?;
        let searcher = request.guard::<State<'_, Arc<search::Searcher>>>()?;
        let flash_msg = request.guard::<FlashMessage<'_, '_>>().succeeded();
        Outcome::Success(MicroblogRocket {
            conn,
            user,
            flash_msg: flash_msg.map(|f| (f.name().into(), f.msg().into())),
            worker: worker.inner().clone(),
            searcher: searcher.inner().clone(),
        })
    }
}
