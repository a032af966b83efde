#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate tantivy;

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("Either feature \"sqlite\" or \"postgres\" must be enabled for this crate.");
#[cfg(all(feature = "sqlite", feature = "postgres"))]
compile_error!("Either feature \"sqlite\" or \"postgres\" must be enabled for this crate.");

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type Connection = diesel::SqliteConnection;

#[cfg(all(not(feature = "sqlite"), feature = "postgres"))]
pub type Connection = diesel::PgConnection;

/// All the possible errors that can be encoutered in this crate
#[derive(Debug)]
pub enum Error {
    Db(diesel::result::Error),
    DbPool,
    Io(std::io::Error),
    Migration(diesel_migrations::RunMigrationsError),
    NotFound,
    PasswordHash,
    Search(search::SearcherError),
    UserAlreadyExists,
}

impl From<bcrypt::BcryptError> for Error {
    fn from(_: bcrypt::BcryptError) -> Self {
        Error::PasswordHash
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Error::NotFound,
            err => Error::Db(err),
        }
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(_: diesel::r2d2::PoolError) -> Self {
        Error::DbPool
    }
}

impl From<diesel_migrations::RunMigrationsError> for Error {
    fn from(err: diesel_migrations::RunMigrationsError) -> Self {
        Error::Migration(err)
    }
}

impl From<search::SearcherError> for Error {
    fn from(err: search::SearcherError) -> Self {
        Error::Search(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl Error {
    /// The write was rejected by a unique index.
    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Error::Db(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Adds a function to a model, that returns the first
/// matching row for a given list of fields.
///
/// Usage:
///
/// ```ignore
/// impl Model {
///     find_by!(model_table, name_of_the_function, field1 as &str, field2 as i32);
/// }
///
/// // Get the Model with field1 == "", and field2 == 0
/// Model::name_of_the_function(connection, "", 0);
/// ```
macro_rules! find_by {
    ($table:ident, $fn:ident, $($col:ident as $type:ty),+) => {
        /// First row of $table matching the given columns
        pub fn $fn(conn: &crate::Connection, $($col: $type),+) -> Result<Self> {
            $table::table
                $(.filter($table::$col.eq($col)))+
                .first(conn)
                .map_err(Error::from)
        }
    };
}

/// List all rows of a model, with field-based filtering.
///
/// Usage:
///
/// ```ignore
/// impl Model {
///     list_by!(model_table, name_of_the_function, field1 as &str);
/// }
///
/// // To get all Models with field1 == "hello"
/// Model::name_of_the_function(connection, "hello");
/// ```
macro_rules! list_by {
    ($table:ident, $fn:ident, $($col:ident as $type:ty),+) => {
        /// Every row of $table matching the given columns
        pub fn $fn(conn: &crate::Connection, $($col: $type),+) -> Result<Vec<Self>> {
            $table::table
                $(.filter($table::$col.eq($col)))+
                .load::<Self>(conn)
                .map_err(Error::from)
        }
    };
}

/// Adds a function to a model to retrieve a row by ID
///
/// # Usage
///
/// ```ignore
/// impl Model {
///     get!(model_table);
/// }
///
/// // Get the Model with ID 1
/// Model::get(connection, 1);
/// ```
macro_rules! get {
    ($table:ident) => {
        pub fn get(conn: &crate::Connection, id: i32) -> Result<Self> {
            $table::table
                .filter($table::id.eq(id))
                .first(conn)
                .map_err(Error::from)
        }
    };
}

/// Adds a function to a model to insert a new row and read it back
///
/// # Usage
///
/// ```ignore
/// impl Model {
///     insert!(model_table, NewModelType);
///     // or, with another name and visibility
///     insert!(model_table, NewModelType, insert_row);
/// }
///
/// // Insert a new row
/// Model::insert(connection, NewModelType::new());
/// ```
macro_rules! insert {
    ($table:ident, $from:ty) => {
        insert!($table, $from, pub insert);
    };
    ($table:ident, $from:ty, $vis:vis $fn:ident) => {
        // In a transaction, so that a failed insert only rolls back its own savepoint.
        #[cfg(feature = "postgres")]
        $vis fn $fn(conn: &crate::Connection, new: $from) -> Result<Self> {
            diesel::Connection::transaction(conn, || {
                diesel::insert_into($table::table)
                    .values(new)
                    .get_result(conn)
                    .map_err(Error::from)
            })
        }

        // SQLite has no RETURNING: the write lock taken by the insert keeps
        // other writers out until the row is read back.
        #[cfg(feature = "sqlite")]
        $vis fn $fn(conn: &crate::Connection, new: $from) -> Result<Self> {
            diesel::Connection::transaction(conn, || {
                diesel::insert_into($table::table)
                    .values(new)
                    .execute(conn)?;
                $table::table
                    .order_by($table::id.desc())
                    .first(conn)
                    .map_err(Error::from)
            })
        }
    };
}


pub mod config;
pub mod db_conn;
pub mod follows;
pub mod microblog_rocket;
pub mod migrations;
pub mod posts;
pub mod schema;
pub mod search;
pub mod users;
pub use config::CONFIG;
pub use microblog_rocket::MicroblogRocket;
