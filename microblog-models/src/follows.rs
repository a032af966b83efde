use crate::{schema::follows, users::User, Connection, Error, Result};
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};
use tracing::info;

#[derive(Clone, Debug, Queryable, Identifiable, Associations)]
#[belongs_to(User, foreign_key = "following_id")]
pub struct Follow {
    pub id: i32,
    pub follower_id: i32,
    pub following_id: i32,
}

#[derive(Insertable)]
#[table_name = "follows"]
pub struct NewFollow {
    pub follower_id: i32,
    pub following_id: i32,
}

/// What a follow or unfollow request by name ended up doing.
#[derive(Debug)]
pub enum FollowOutcome {
    /// Nobody has this name, nothing changed.
    UnknownUser,
    /// The user targeted themselves, nothing changed.
    SelfTarget(User),
    /// The edge is now in the requested state.
    Done(User),
}

impl Follow {
    insert!(follows, NewFollow);
    #[cfg(test)]
    list_by!(follows, list_by_follower, follower_id as i32);

    /// Inserts the edge, or returns the existing one when a concurrent
    /// request added it first.
    pub fn insert_or_existing(conn: &Connection, new: NewFollow) -> Result<Follow> {
        let (from, to) = (new.follower_id, new.following_id);
        match Follow::insert(conn, new) {
            Err(ref e) if e.is_unique_violation() => Follow::find(conn, from, to),
            res => res,
        }
    }

    pub fn find(conn: &Connection, from: i32, to: i32) -> Result<Follow> {
        follows::table
            .filter(follows::follower_id.eq(from))
            .filter(follows::following_id.eq(to))
            .get_result(conn)
            .map_err(Error::from)
    }

    #[cfg(test)]
    pub fn count(conn: &Connection) -> Result<i64> {
        follows::table
            .count()
            .get_result(conn)
            .map_err(Error::from)
    }

    pub fn delete(&self, conn: &Connection) -> Result<()> {
        diesel::delete(self).execute(conn)?;
        Ok(())
    }
}

impl User {
    /// Adds the `self -> target` edge, unless it already exists.
    pub fn follow(&self, conn: &Connection, target: &User) -> Result<Follow> {
        match Follow::find(conn, self.id, target.id) {
            Ok(follow) => Ok(follow),
            Err(Error::NotFound) => Follow::insert_or_existing(
                conn,
                NewFollow {
                    follower_id: self.id,
                    following_id: target.id,
                },
            ),
            Err(e) => Err(e),
        }
    }

    /// Removes the `self -> target` edge. Does nothing if there is none.
    pub fn unfollow(&self, conn: &Connection, target: &User) -> Result<()> {
        match Follow::find(conn, self.id, target.id) {
            Ok(follow) => follow.delete(conn),
            Err(Error::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn follow_by_name(&self, conn: &Connection, name: &str) -> Result<FollowOutcome> {
        self.change_edge_by_name(conn, name, |target| {
            self.follow(conn, target)?;
            info!("{} is now following {}", self.username, target.username);
            Ok(())
        })
    }

    pub fn unfollow_by_name(&self, conn: &Connection, name: &str) -> Result<FollowOutcome> {
        self.change_edge_by_name(conn, name, |target| {
            self.unfollow(conn, target)?;
            info!("{} stopped following {}", self.username, target.username);
            Ok(())
        })
    }

    fn change_edge_by_name<F>(&self, conn: &Connection, name: &str, change: F) -> Result<FollowOutcome>
    where
        F: FnOnce(&User) -> Result<()>,
    {
        let target = match User::find_by_name(conn, name) {
            Ok(target) => target,
            Err(Error::NotFound) => return Ok(FollowOutcome::UnknownUser),
            Err(e) => return Err(e),
        };
        if target == *self {
            return Ok(FollowOutcome::SelfTarget(target));
        }
        change(&target)?;
        Ok(FollowOutcome::Done(target))
    }
}
