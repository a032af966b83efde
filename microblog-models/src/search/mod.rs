mod searcher;
pub use self::searcher::*;

#[cfg(test)]
pub(crate) mod tests {
    use super::{Searcher, SearcherError};
    use crate::{
        posts::{NewPost, Post},
        tests::db,
        users::tests::fill_database,
        Error,
    };
    use diesel::Connection;
    use guid_create::GUID;
    use std::env::temp_dir;
    use std::fs::{create_dir_all, write};

    pub(crate) fn get_searcher() -> Searcher {
        Searcher::create_in_ram().unwrap()
    }

    fn test_dir() -> std::path::PathBuf {
        temp_dir().join(format!("microblog-test-{}", GUID::rand()))
    }

    #[test]
    fn open() {
        let dir = test_dir();
        {
            Searcher::create(&dir).unwrap();
        }
        Searcher::open(&dir).unwrap();
    }

    #[test]
    fn create() {
        let dir = test_dir();

        assert!(Searcher::open(&dir).is_err());
        {
            Searcher::create(&dir).unwrap();
        }
        Searcher::open(&dir).unwrap(); //verify it's well created
    }

    #[test]
    fn writer_lock() {
        let dir = test_dir();
        let searcher = Searcher::create(&dir).unwrap();
        assert!(matches!(
            Searcher::open(&dir),
            Err(Error::Search(SearcherError::WriteLockAcquisitionError))
        ));
        searcher.drop_writer();
        Searcher::open(&dir).unwrap();
    }

    #[test]
    fn open_or_recreate() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let author = &fill_database(&conn)[0];
            let post = Post::insert(
                &conn,
                NewPost::new(author, "already there before the index"),
                &get_searcher(),
            )
            .unwrap();

            // a missing index is created and filled from the database
            let dir = test_dir();
            {
                let searcher = Searcher::open_or_recreate(&dir, &conn).unwrap();
                let (found, total) = searcher.search_document(&conn, "already", (0, 10)).unwrap();
                assert_eq!(total, 1);
                assert_eq!(found[0].id, post.id);
            }
            Searcher::open_or_recreate(&dir, &conn).unwrap();

            // a directory holding something else is left alone
            let dir = test_dir();
            create_dir_all(&dir).unwrap();
            write(dir.join("notes.txt"), "not an index").unwrap();
            assert!(Searcher::open_or_recreate(&dir, &conn).is_err());
            Ok(())
        });
    }

    #[test]
    fn search() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let searcher = get_searcher();
            let users = fill_database(&conn);

            let post = Post::insert(
                &conn,
                NewPost::new(&users[0], "Rustaceans love borrow checkers"),
                &searcher,
            )
            .unwrap();
            Post::insert(&conn, NewPost::new(&users[1], "Nothing to see here"), &searcher).unwrap();

            // not committed yet
            assert_eq!(
                searcher.search_document(&conn, "borrow", (0, 10)).unwrap().1,
                0
            );
            searcher.commit().unwrap();

            let (found, total) = searcher.search_document(&conn, "borrow", (0, 10)).unwrap();
            assert_eq!(total, 1);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, post.id);

            let (found, _) = searcher.search_document(&conn, "author:user", (0, 10)).unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].user_id, users[1].id);

            searcher.delete_document(&post).unwrap();
            searcher.commit().unwrap();
            assert!(searcher
                .search_document(&conn, "borrow", (0, 10))
                .unwrap()
                .0
                .is_empty());
            Ok(())
        });
    }

    #[test]
    fn search_pages() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let searcher = get_searcher();
            let author = &fill_database(&conn)[0];
            for i in 0..5 {
                Post::insert(&conn, NewPost::new(author, format!("kitten number {}", i)), &searcher)
                    .unwrap();
            }
            searcher.commit().unwrap();

            let (first, total) = searcher.search_document(&conn, "kitten", (0, 2)).unwrap();
            let (last, _) = searcher.search_document(&conn, "kitten", (4, 6)).unwrap();
            let (beyond, _) = searcher.search_document(&conn, "kitten", (6, 8)).unwrap();
            assert_eq!(total, 5);
            assert_eq!(first.len(), 2);
            assert_eq!(last.len(), 1);
            assert!(beyond.is_empty());

            let (far_away, total) = searcher
                .search_document(&conn, "kitten", (i32::MAX, i32::MAX))
                .unwrap();
            assert!(far_away.is_empty());
            assert_eq!(total, 5);
            Ok(())
        });
    }

    #[test]
    fn huge_page_on_a_small_index() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let searcher = get_searcher();
            let author = &fill_database(&conn)[0];
            Post::insert(&conn, NewPost::new(author, "a lonely puppy"), &searcher).unwrap();
            searcher.commit().unwrap();

            let (found, total) = searcher
                .search_document(&conn, "puppy", (0, i32::MAX))
                .unwrap();
            assert_eq!(total, 1);
            assert_eq!(found.len(), 1);
            Ok(())
        });
    }

    #[test]
    fn invalid_query_matches_nothing() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let searcher = get_searcher();
            let author = &fill_database(&conn)[0];
            Post::insert(&conn, NewPost::new(author, "some words"), &searcher).unwrap();
            searcher.commit().unwrap();

            let (found, total) = searcher.search_document(&conn, "nosuchfield:words", (0, 10)).unwrap();
            assert!(found.is_empty());
            assert_eq!(total, 0);
            Ok(())
        });
    }

    #[test]
    fn refill() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let stale = get_searcher();
            let author = &fill_database(&conn)[0];
            Post::insert(&conn, NewPost::new(author, "indexed elsewhere"), &stale).unwrap();

            let searcher = get_searcher();
            assert_eq!(searcher.search_document(&conn, "elsewhere", (0, 10)).unwrap().1, 0);
            searcher.fill(&conn).unwrap();
            searcher.commit().unwrap();
            assert_eq!(searcher.search_document(&conn, "elsewhere", (0, 10)).unwrap().1, 1);
            Ok(())
        });
    }
}
