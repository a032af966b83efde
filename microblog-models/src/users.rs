use crate::{
    db_conn::DbConn, follows::Follow, schema::users, Connection, Error, Result,
};
use chrono::{NaiveDateTime, Utc};
use diesel::{self, BelongingToDsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use rocket::{
    http::Status,
    outcome::IntoOutcome,
    request::{self, FromRequest, Request},
};
use std::{
    cmp::PartialEq,
    hash::{Hash, Hasher},
};
use tracing::warn;

#[derive(Queryable, Identifiable, Clone, Debug)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub about_me: String,
    pub last_seen: NaiveDateTime,
    pub creation_date: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "users"]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub about_me: String,
    pub last_seen: NaiveDateTime,
    pub creation_date: NaiveDateTime,
}

pub const AUTH_COOKIE: &str = "user_id";

impl User {
    insert!(users, NewUser);
    get!(users);
    find_by!(users, find_by_name, username as &str);
    #[cfg(test)]
    find_by!(users, find_by_email, email as &str);

    #[cfg(test)]
    pub fn count(conn: &Connection) -> Result<i64> {
        users::table
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn username_used(conn: &Connection, username: &str) -> Result<bool> {
        users::table
            .filter(users::username.eq(username))
            .count()
            .get_result(conn)
            .map(|c: i64| c > 0)
            .map_err(Error::from)
    }

    pub fn email_used(conn: &Connection, email: &str) -> Result<bool> {
        users::table
            .filter(users::email.eq(email))
            .count()
            .get_result(conn)
            .map(|c: i64| c > 0)
            .map_err(Error::from)
    }

    pub fn hash_pass(pass: &str) -> Result<String> {
        bcrypt::hash(pass, 10).map_err(Error::from)
    }

    pub fn check_password(&self, pass: &str) -> bool {
        bcrypt::verify(pass, &self.hashed_password).unwrap_or(false)
    }

    /// Looks a user up by name and checks its password.
    ///
    /// Fails with `Error::NotFound` for an unknown name as well as for a wrong password.
    pub fn login(conn: &Connection, username: &str, password: &str) -> Result<User> {
        match User::find_by_name(conn, username) {
            Ok(user) if user.check_password(password) => Ok(user),
            Ok(_) => Err(Error::NotFound),
            Err(Error::NotFound) => {
                // no user with this name: still spend the time of a hash check
                let _ = bcrypt::verify(password, &DUMMY_HASH);
                Err(Error::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub fn reset_password(&self, conn: &Connection, pass: &str) -> Result<()> {
        diesel::update(self)
            .set(users::hashed_password.eq(User::hash_pass(pass)?))
            .execute(conn)?;
        Ok(())
    }

    /// Records that this user was seen right now.
    pub fn touch(&self, conn: &Connection) -> Result<User> {
        diesel::update(self)
            .set(users::last_seen.eq(Utc::now().naive_utc()))
            .execute(conn)?;
        User::get(conn, self.id)
    }

    pub fn update_profile(&self, conn: &Connection, username: &str, about_me: &str) -> Result<User> {
        if username != self.username && User::username_used(conn, username)? {
            return Err(Error::UserAlreadyExists);
        }
        diesel::update(self)
            .set((
                users::username.eq(username),
                users::about_me.eq(about_me),
            ))
            .execute(conn)
            .map_err(|e| match Error::from(e) {
                e if e.is_unique_violation() => Error::UserAlreadyExists,
                e => e,
            })?;
        User::get(conn, self.id)
    }

    #[cfg(test)]
    pub fn get_followers(&self, conn: &Connection) -> Result<Vec<User>> {
        use crate::schema::follows;
        let follows = Follow::belonging_to(self).select(follows::follower_id);
        users::table
            .filter(users::id.eq_any(follows))
            .order(users::username.asc())
            .load::<User>(conn)
            .map_err(Error::from)
    }

    pub fn count_followers(&self, conn: &Connection) -> Result<i64> {
        use crate::schema::follows;
        follows::table
            .filter(follows::following_id.eq(self.id))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn get_followers_page(
        &self,
        conn: &Connection,
        (min, max): (i32, i32),
    ) -> Result<Vec<User>> {
        use crate::schema::follows;
        let follows = Follow::belonging_to(self).select(follows::follower_id);
        users::table
            .filter(users::id.eq_any(follows))
            .order(users::username.asc())
            .offset(min.into())
            .limit((max - min).into())
            .load::<User>(conn)
            .map_err(Error::from)
    }

    #[cfg(test)]
    pub fn get_followed(&self, conn: &Connection) -> Result<Vec<User>> {
        use crate::schema::follows::dsl::*;
        let f = follows.filter(follower_id.eq(self.id)).select(following_id);
        users::table
            .filter(users::id.eq_any(f))
            .order(users::username.asc())
            .load::<User>(conn)
            .map_err(Error::from)
    }

    pub fn count_followed(&self, conn: &Connection) -> Result<i64> {
        use crate::schema::follows;
        follows::table
            .filter(follows::follower_id.eq(self.id))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn get_followed_page(
        &self,
        conn: &Connection,
        (min, max): (i32, i32),
    ) -> Result<Vec<User>> {
        use crate::schema::follows;
        let follows = follows::table
            .filter(follows::follower_id.eq(self.id))
            .select(follows::following_id);
        users::table
            .filter(users::id.eq_any(follows))
            .order(users::username.asc())
            .offset(min.into())
            .limit((max - min).into())
            .load::<User>(conn)
            .map_err(Error::from)
    }

    pub fn is_following(&self, conn: &Connection, other_id: i32) -> Result<bool> {
        use crate::schema::follows;
        follows::table
            .filter(follows::follower_id.eq(self.id))
            .filter(follows::following_id.eq(other_id))
            .count()
            .get_result::<i64>(conn)
            .map_err(Error::from)
            .map(|r| r > 0)
    }
}

lazy_static! {
    /// Checked against when the user doesn't exist, so that failed logins take as long as successful ones.
    static ref DUMMY_HASH: String = bcrypt::hash("microblog", 10).unwrap_or_default();
}

/// The currently logged in user, read from the private `user_id` cookie.
///
/// The lookup happens once per request, and refreshes `last_seen`.
/// Without a valid session, the guard fails with `Unauthorized`.
impl<'a, 'r> FromRequest<'a, 'r> for User {
    type Error = ();

    fn from_request(request: &'a Request<'r>) -> request::Outcome<User, ()> {
        let user = request.local_cache(|| {
            let conn = request.guard::<DbConn>().succeeded()?;
            let id = request
                .cookies()
                .get_private(AUTH_COOKIE)
                .and_then(|cookie| cookie.value().parse::<i32>().ok())?;
            let user = User::get(&*conn, id).ok()?;
            match user.touch(&*conn) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Couldn't update last_seen for {}: {:?}", user.username, e);
                    Some(user)
                }
            }
        });
        user.clone().into_outcome((Status::Unauthorized, ()))
    }
}

impl Eq for User {}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl NewUser {
    /// Creates a new user with a hashed password.
    ///
    /// Fails with `Error::UserAlreadyExists` if the name or the email is taken.
    pub fn new_local(
        conn: &Connection,
        username: String,
        email: String,
        about_me: &str,
        password: &str,
    ) -> Result<User> {
        if User::username_used(conn, &username)? || User::email_used(conn, &email)? {
            return Err(Error::UserAlreadyExists);
        }
        let now = Utc::now().naive_utc();
        User::insert(
            conn,
            NewUser {
                username,
                email,
                hashed_password: User::hash_pass(password)?,
                about_me: about_me.to_owned(),
                last_seen: now,
                creation_date: now,
            },
        )
        .map_err(|e| {
            if e.is_unique_violation() {
                Error::UserAlreadyExists
            } else {
                e
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{tests::db, Connection as Conn};
    use diesel::Connection;

    pub(crate) fn fill_database(conn: &Conn) -> Vec<User> {
        let admin = NewUser::new_local(
            conn,
            "admin".to_owned(),
            "admin@example.com".to_owned(),
            "Hello there, I'm the admin",
            "invalid_admin_password",
        )
        .unwrap();
        let user = NewUser::new_local(
            conn,
            "user".to_owned(),
            "user@example.com".to_owned(),
            "Hello there, I'm no one",
            "invalid_user_password",
        )
        .unwrap();
        let other = NewUser::new_local(
            conn,
            "other".to_owned(),
            "other@example.com".to_owned(),
            "Hello there, I'm someone else",
            "invalid_other_password",
        )
        .unwrap();
        vec![admin, user, other]
    }

    #[test]
    fn find_by() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            fill_database(&conn);
            let test_user = NewUser::new_local(
                &conn,
                "test".to_owned(),
                "test@example.com".to_owned(),
                "Hello I'm a test",
                "test_password",
            )
            .unwrap();
            assert_eq!(test_user.id, User::find_by_name(&conn, "test").unwrap().id);
            assert_eq!(
                test_user.id,
                User::find_by_email(&conn, "test@example.com").unwrap().id
            );
            assert_eq!(test_user.id, User::get(&conn, test_user.id).unwrap().id);
            assert!(matches!(
                User::find_by_name(&conn, "nobody"),
                Err(Error::NotFound)
            ));
            Ok(())
        });
    }

    #[test]
    fn duplicates_are_rejected() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            fill_database(&conn);
            let same_name = NewUser::new_local(
                &conn,
                "user".to_owned(),
                "fresh@example.com".to_owned(),
                "",
                "some_password",
            );
            assert!(matches!(same_name, Err(Error::UserAlreadyExists)));
            let same_email = NewUser::new_local(
                &conn,
                "fresh".to_owned(),
                "user@example.com".to_owned(),
                "",
                "some_password",
            );
            assert!(matches!(same_email, Err(Error::UserAlreadyExists)));

            // a row slipping past the checks is stopped by the unique index
            let now = Utc::now().naive_utc();
            let raw = User::insert(
                &conn,
                NewUser {
                    username: "user".to_owned(),
                    email: "another@example.com".to_owned(),
                    hashed_password: String::new(),
                    about_me: String::new(),
                    last_seen: now,
                    creation_date: now,
                },
            );
            assert!(raw.unwrap_err().is_unique_violation());
            assert_eq!(User::count(&conn).unwrap(), 3);
            Ok(())
        });
    }

    #[test]
    fn auth() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            fill_database(&conn);
            let test_user = NewUser::new_local(
                &conn,
                "test".to_owned(),
                "test@example.com".to_owned(),
                "Hello I'm a test",
                "test_password",
            )
            .unwrap();

            assert_eq!(
                User::login(&conn, "test", "test_password").unwrap().id,
                test_user.id
            );
            assert!(User::login(&conn, "test", "other_password").is_err());
            assert!(User::login(&conn, "nobody", "test_password").is_err());

            test_user.reset_password(&conn, "new_password").unwrap();
            assert!(User::login(&conn, "test", "test_password").is_err());
            assert!(User::login(&conn, "test", "new_password").is_ok());
            Ok(())
        });
    }

    #[test]
    fn touch_updates_last_seen() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let user = &fill_database(&conn)[1];
            let before = user.last_seen;
            std::thread::sleep(std::time::Duration::from_millis(5));
            let touched = user.touch(&conn).unwrap();
            assert!(touched.last_seen > before);
            assert_eq!(
                User::get(&conn, user.id).unwrap().last_seen,
                touched.last_seen
            );
            Ok(())
        });
    }

    #[test]
    fn update_profile() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let users = fill_database(&conn);
            let user = &users[1];

            let updated = user.update_profile(&conn, "renamed", "New bio").unwrap();
            assert_eq!(updated.username, "renamed");
            assert_eq!(updated.about_me, "New bio");
            assert!(User::find_by_name(&conn, "user").is_err());

            // keeping its own name is fine, taking another one is not
            assert!(updated.update_profile(&conn, "renamed", "").is_ok());
            assert!(matches!(
                updated.update_profile(&conn, "other", ""),
                Err(Error::UserAlreadyExists)
            ));
            Ok(())
        });
    }
}
