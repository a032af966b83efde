use crate::{posts::Post, Connection, Error, Result};
use chrono::Utc;
use std::{
    cmp, fs,
    fs::create_dir_all,
    io,
    path::Path,
    sync::{Mutex, MutexGuard},
};
use tantivy::{
    collector::{Count, TopDocs},
    directory::MmapDirectory,
    query::QueryParser,
    schema::*,
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyError,
};
use tracing::{info, warn};

#[derive(Debug)]
pub enum SearcherError {
    IndexCreationError,
    WriteLockAcquisitionError,
    IndexOpeningError,
    IndexEditionError,
    InvalidIndexDataError,
}

/// Full-text index of post bodies.
///
/// Documents added with `add_document` become visible to `search_document`
/// after the next `commit`.
pub struct Searcher {
    index: Index,
    reader: IndexReader,
    writer: Mutex<Option<IndexWriter>>,
}

impl Searcher {
    pub fn schema() -> Schema {
        let tag_indexing = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("raw")
                .set_index_option(IndexRecordOption::Basic),
        );

        let content_indexing = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("default")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let mut schema_builder = SchemaBuilder::default();

        schema_builder.add_i64_field("post_id", STORED | INDEXED);
        schema_builder.add_i64_field("creation_date", INDEXED);

        schema_builder.add_text_field("author", tag_indexing);
        schema_builder.add_text_field("body", content_indexing);

        schema_builder.build()
    }

    /// Opens the index at `path`, creating and filling it from the database
    /// when there is none yet, or when it was written by an incompatible
    /// version of the search engine.
    pub fn open_or_recreate(path: &dyn AsRef<Path>, conn: &Connection) -> Result<Self> {
        match Self::open(path) {
            Err(Error::Search(SearcherError::InvalidIndexDataError)) => {
                let backup_path = format!("{}.{}", path.as_ref().display(), Utc::now().timestamp());
                let backup_path = Path::new(&backup_path);
                warn!(
                    "search index uses an old format, moving it to {} and recreating it",
                    backup_path.display()
                );
                fs::rename(path, backup_path)?;
                let searcher = Self::create_filled(path, conn)?;
                if fs::remove_dir_all(backup_path).is_err() {
                    warn!(
                        "error on removing backup directory: {}. it remains",
                        backup_path.display()
                    );
                }
                Ok(searcher)
            }
            Err(Error::Search(SearcherError::IndexOpeningError)) if Self::is_empty_dir(path) => {
                info!("no search index found, creating one");
                Self::create_filled(path, conn)
            }
            res => res,
        }
    }

    fn is_empty_dir(path: &dyn AsRef<Path>) -> bool {
        match fs::read_dir(path) {
            Ok(mut contents) => contents.next().is_none(),
            Err(e) => e.kind() == io::ErrorKind::NotFound,
        }
    }

    fn create_filled(path: &dyn AsRef<Path>, conn: &Connection) -> Result<Self> {
        let searcher = Self::create(path)?;
        searcher.fill(conn)?;
        searcher.commit()?;
        Ok(searcher)
    }

    pub fn create(path: &dyn AsRef<Path>) -> Result<Self> {
        let schema = Self::schema();

        create_dir_all(path).map_err(|_| SearcherError::IndexCreationError)?;
        let index = Index::create(
            MmapDirectory::open(path).map_err(|_| SearcherError::IndexCreationError)?,
            schema,
        )
        .map_err(|_| SearcherError::IndexCreationError)?;

        Self::from_index(index, SearcherError::IndexCreationError)
    }

    pub fn open(path: &dyn AsRef<Path>) -> Result<Self> {
        let index =
            Index::open(MmapDirectory::open(path).map_err(|_| SearcherError::IndexOpeningError)?)
                .map_err(|_| SearcherError::IndexOpeningError)?;

        Self::from_index(index, SearcherError::IndexOpeningError)
    }

    /// An index that only lives in memory.
    pub fn create_in_ram() -> Result<Self> {
        Self::from_index(
            Index::create_in_ram(Self::schema()),
            SearcherError::IndexCreationError,
        )
    }

    fn from_index(index: Index, reader_error: SearcherError) -> Result<Self> {
        let writer = index
            .writer(50_000_000)
            .map_err(|_| SearcherError::WriteLockAcquisitionError)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| {
                if let TantivyError::IOError(err) = e {
                    let err: io::Error = err.into();
                    if err.kind() == io::ErrorKind::InvalidData {
                        // Search index was created in older Tantivy format.
                        SearcherError::InvalidIndexDataError
                    } else {
                        reader_error
                    }
                } else {
                    reader_error
                }
            })?;
        Ok(Self {
            writer: Mutex::new(Some(writer)),
            reader,
            index,
        })
    }

    fn field(&self, name: &str) -> Result<Field> {
        self.index
            .schema()
            .get_field(name)
            .ok_or(Error::Search(SearcherError::InvalidIndexDataError))
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, Option<IndexWriter>>> {
        self.writer
            .lock()
            .map_err(|_| Error::Search(SearcherError::IndexEditionError))
    }

    pub fn add_document(&self, conn: &Connection, post: &Post) -> Result<()> {
        let post_id = self.field("post_id")?;
        let creation_date = self.field("creation_date")?;
        let author = self.field("author")?;
        let body = self.field("body")?;

        let author_name = post.get_author(conn)?.username;

        let mut writer = self.lock_writer()?;
        let writer = writer
            .as_mut()
            .ok_or(SearcherError::WriteLockAcquisitionError)?;
        writer.add_document(doc!(
            post_id => i64::from(post.id),
            creation_date => post.timestamp.timestamp(),
            author => author_name,
            body => post.body.clone(),
        ));
        Ok(())
    }

    #[cfg(test)]
    pub fn delete_document(&self, post: &Post) -> Result<()> {
        let post_id = self.field("post_id")?;

        let doc_id = tantivy::Term::from_field_i64(post_id, i64::from(post.id));
        let mut writer = self.lock_writer()?;
        let writer = writer
            .as_mut()
            .ok_or(SearcherError::WriteLockAcquisitionError)?;
        writer.delete_term(doc_id);
        Ok(())
    }

    /// Runs `query` against post bodies (and `author:<name>` terms), best match first.
    ///
    /// Returns the posts in `(min, max)` and the total number of matches.
    /// A query that can't be parsed matches nothing.
    pub fn search_document(
        &self,
        conn: &Connection,
        query: &str,
        (min, max): (i32, i32),
    ) -> Result<(Vec<Post>, i64)> {
        let post_id = self.field("post_id")?;
        let author = self.field("author")?;
        let body = self.field("body")?;

        let parser = QueryParser::for_index(&self.index, vec![body, author]);
        let query = match parser.parse_query(query) {
            Ok(query) => query,
            Err(e) => {
                warn!("invalid search query {:?}: {:?}", query, e);
                return Ok((vec![], 0));
            }
        };

        let searcher = self.reader.searcher();
        let total = searcher
            .search(&*query, &Count)
            .map_err(|_| SearcherError::IndexEditionError)?;
        let min = cmp::max(0, min) as usize;
        if min >= total {
            return Ok((vec![], total as i64));
        }

        // the collector allocates `limit` slots up front
        let limit = cmp::min(cmp::max(1, max) as usize, total);
        let res = searcher
            .search(&*query, &TopDocs::with_limit(limit))
            .map_err(|_| SearcherError::IndexEditionError)?;

        let posts = res
            .get(min..)
            .unwrap_or(&[])
            .iter()
            .filter_map(|(_, doc_add)| {
                let doc = searcher.doc(*doc_add).ok()?;
                let id = doc.get_first(post_id)?;
                Post::get(conn, id.i64_value() as i32).ok()
            })
            .collect();
        Ok((posts, total as i64))
    }

    /// Drops every document, and indexes all the posts again.
    pub fn fill(&self, conn: &Connection) -> Result<()> {
        self.lock_writer()?
            .as_mut()
            .ok_or(SearcherError::WriteLockAcquisitionError)?
            .delete_all_documents()
            .map_err(|_| SearcherError::IndexEditionError)?;

        const PAGE_SIZE: i64 = 16384;
        let mut cursor = -1;
        loop {
            let posts = Post::list_after(conn, cursor, PAGE_SIZE)?;
            for post in posts.iter() {
                self.add_document(conn, post)?;
                cursor = post.id;
            }
            if posts.len() < PAGE_SIZE as usize {
                break Ok(());
            }
        }
    }

    pub fn commit(&self) -> Result<()> {
        let mut writer = self.lock_writer()?;
        if let Some(writer) = writer.as_mut() {
            writer
                .commit()
                .map_err(|_| SearcherError::IndexEditionError)?;
        }
        self.reader
            .reload()
            .map_err(|_| SearcherError::IndexEditionError)?;
        Ok(())
    }

    /// Releases the writer and its lock. Later writes fail.
    pub fn drop_writer(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            writer.take();
        }
    }
}
