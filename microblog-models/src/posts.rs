use crate::{
    schema::{follows, posts},
    search::Searcher,
    users::User,
    Connection, Error, Result,
};
use chrono::{NaiveDateTime, Utc};
use diesel::{self, BoolExpressionMethods, ExpressionMethods, QueryDsl, RunQueryDsl};

#[derive(Queryable, Identifiable, Associations, Clone, Debug)]
#[belongs_to(User, foreign_key = "user_id")]
pub struct Post {
    pub id: i32,
    pub body: String,
    pub timestamp: NaiveDateTime,
    pub user_id: i32,
}

#[derive(Insertable)]
#[table_name = "posts"]
pub struct NewPost {
    pub body: String,
    pub timestamp: NaiveDateTime,
    pub user_id: i32,
}

impl NewPost {
    /// A post written by `author` right now.
    pub fn new(author: &User, body: impl ToString) -> NewPost {
        NewPost {
            body: body.to_string(),
            timestamp: Utc::now().naive_utc(),
            user_id: author.id,
        }
    }
}

impl Post {
    get!(posts);
    insert!(posts, NewPost, insert_row);

    pub fn insert(conn: &Connection, new: NewPost, searcher: &Searcher) -> Result<Self> {
        let post = Self::insert_row(conn, new)?;
        searcher.add_document(conn, &post)?;
        Ok(post)
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        posts::table
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn get_author(&self, conn: &Connection) -> Result<User> {
        User::get(conn, self.user_id)
    }

    /// Every post, newest first.
    pub fn explore_page(conn: &Connection, (min, max): (i32, i32)) -> Result<Vec<Post>> {
        posts::table
            .order((posts::timestamp.desc(), posts::id.desc()))
            .offset(min.into())
            .limit((max - min).into())
            .load::<Post>(conn)
            .map_err(Error::from)
    }

    pub fn author_page(
        conn: &Connection,
        author: &User,
        (min, max): (i32, i32),
    ) -> Result<Vec<Post>> {
        posts::table
            .filter(posts::user_id.eq(author.id))
            .order((posts::timestamp.desc(), posts::id.desc()))
            .offset(min.into())
            .limit((max - min).into())
            .load::<Post>(conn)
            .map_err(Error::from)
    }

    pub fn count_for_author(conn: &Connection, author: &User) -> Result<i64> {
        posts::table
            .filter(posts::user_id.eq(author.id))
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    /// The posts of `user` and of everyone `user` follows, newest first.
    pub fn feed_page(conn: &Connection, user: &User, (min, max): (i32, i32)) -> Result<Vec<Post>> {
        let followed = follows::table
            .filter(follows::follower_id.eq(user.id))
            .select(follows::following_id);
        posts::table
            .filter(
                posts::user_id
                    .eq(user.id)
                    .or(posts::user_id.eq_any(followed)),
            )
            .order((posts::timestamp.desc(), posts::id.desc()))
            .offset(min.into())
            .limit((max - min).into())
            .load::<Post>(conn)
            .map_err(Error::from)
    }

    pub fn count_for_feed(conn: &Connection, user: &User) -> Result<i64> {
        let followed = follows::table
            .filter(follows::follower_id.eq(user.id))
            .select(follows::following_id);
        posts::table
            .filter(
                posts::user_id
                    .eq(user.id)
                    .or(posts::user_id.eq_any(followed)),
            )
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    /// Used to rebuild the search index in batches.
    pub fn list_after(conn: &Connection, cursor: i32, limit: i64) -> Result<Vec<Post>> {
        posts::table
            .filter(posts::id.gt(cursor))
            .order(posts::id.asc())
            .limit(limit)
            .load::<Post>(conn)
            .map_err(Error::from)
    }
}
