use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::{Identifier, Slug};
use metadata::{ArtistLookup, MetadataError};
use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

mod albums;
mod artists;
mod files;
pub mod filesystem;
pub mod hooks;
mod libraries;
mod lyrics;
pub mod resolver;
mod songs;
pub mod sync;
mod tracks;

pub use albums::ReleaseDraft;
pub use filesystem::{FileSystem, LocalFileSystem};
pub use hooks::{IllustrationTrigger, LyricsTrigger, NoopTriggers};
pub use resolver::{ResolvedTrack, Resolver};
pub use songs::SongDraft;
pub use sync::Synchronizer;
pub use tracks::TrackDraft;

const KEY_SEP: char = '\x1f';

const SEQUENCES_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequences");
const LIBRARIES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("libraries");
const LIBRARIES_BY_SLUG_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("libraries_by_slug");
const FILES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("files");
const FILES_BY_PATH_TABLE: TableDefinition<&str, u64> = TableDefinition::new("files_by_path");
const ARTISTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("artists");
const ARTISTS_BY_SLUG_TABLE: TableDefinition<&str, u64> = TableDefinition::new("artists_by_slug");
const GENRES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("genres");
const GENRES_BY_SLUG_TABLE: TableDefinition<&str, u64> = TableDefinition::new("genres_by_slug");
const SONG_GROUPS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("song_groups");
const SONG_GROUPS_BY_SLUG_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("song_groups_by_slug");
const SONGS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("songs");
const SONGS_BY_SLUG_TABLE: TableDefinition<&str, u64> = TableDefinition::new("songs_by_slug");
const ALBUMS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("albums");
const ALBUMS_BY_KEY_TABLE: TableDefinition<&str, u64> = TableDefinition::new("albums_by_key");
const RELEASES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("releases");
const RELEASES_BY_KEY_TABLE: TableDefinition<&str, u64> = TableDefinition::new("releases_by_key");
const TRACKS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("tracks");
const TRACKS_BY_FILE_TABLE: TableDefinition<u64, u64> = TableDefinition::new("tracks_by_file");
const LYRICS_TABLE: TableDefinition<u64, &str> = TableDefinition::new("lyrics");

/// The persisted entity graph. Every mutating method runs in its own write
/// transaction, so a get-or-create is atomic with respect to other writers.
#[derive(Clone)]
pub struct Catalog {
    db: Arc<Database>,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let db = open_or_create_db(path)?;
        Self::with_db(Arc::new(db))
    }

    pub fn with_db(db: Arc<Database>) -> Result<Self, CatalogError> {
        ensure_tables(&db)?;
        Ok(Self { db })
    }

    pub fn db(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }
}

impl ArtistLookup for Catalog {
    fn find_artist(&self, name: &str) -> Option<String> {
        let slug = Slug::from_name(name);
        if slug.is_empty() {
            return None;
        }
        match self.get_artist(&Identifier::Slug(slug.into_string())) {
            Ok(artist) => Some(artist.name),
            Err(CatalogError::NotFound { .. }) => None,
            Err(err) => {
                debug!("Artist lookup failed for {}: {}", name, err);
                None
            }
        }
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Redb(redb::Error),
    Bincode(Box<bincode::ErrorKind>),
    KeyParse(String),
    NotFound { kind: &'static str, key: String },
    AlreadyExists { kind: &'static str, key: String },
    InvalidName { kind: &'static str, name: String },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "io error: {}", err),
            CatalogError::Redb(err) => write!(f, "db error: {}", err),
            CatalogError::Bincode(err) => write!(f, "bincode error: {}", err),
            CatalogError::KeyParse(value) => write!(f, "key parse error: {}", value),
            CatalogError::NotFound { kind, key } => write!(f, "{} not found: {}", kind, key),
            CatalogError::AlreadyExists { kind, key } => {
                write!(f, "{} already exists: {}", kind, key)
            }
            CatalogError::InvalidName { kind, name } => {
                write!(f, "invalid {} name: {:?}", kind, name)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<redb::Error> for CatalogError {
    fn from(err: redb::Error) -> Self {
        CatalogError::Redb(err)
    }
}

impl From<DatabaseError> for CatalogError {
    fn from(err: DatabaseError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<TableError> for CatalogError {
    fn from(err: TableError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<TransactionError> for CatalogError {
    fn from(err: TransactionError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<CommitError> for CatalogError {
    fn from(err: CommitError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<Box<bincode::ErrorKind>> for CatalogError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        CatalogError::Bincode(err)
    }
}

/// Why one file could not be registered.
#[derive(Debug)]
pub enum RegistrationError {
    Metadata(MetadataError),
    Catalog(CatalogError),
}

impl std::fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationError::Metadata(err) => write!(f, "metadata error: {}", err),
            RegistrationError::Catalog(err) => write!(f, "catalog error: {}", err),
        }
    }
}

impl std::error::Error for RegistrationError {}

impl From<MetadataError> for RegistrationError {
    fn from(err: MetadataError) -> Self {
        RegistrationError::Metadata(err)
    }
}

impl From<CatalogError> for RegistrationError {
    fn from(err: CatalogError) -> Self {
        RegistrationError::Catalog(err)
    }
}

fn open_or_create_db(path: &Path) -> Result<Database, CatalogError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        Ok(Database::open(path)?)
    } else {
        Ok(Database::create(path)?)
    }
}

fn ensure_tables(db: &Database) -> Result<(), CatalogError> {
    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(SEQUENCES_TABLE)?;
        for table in [
            LIBRARIES_TABLE,
            FILES_TABLE,
            ARTISTS_TABLE,
            GENRES_TABLE,
            SONG_GROUPS_TABLE,
            SONGS_TABLE,
            ALBUMS_TABLE,
            RELEASES_TABLE,
            TRACKS_TABLE,
        ] {
            write_txn.open_table(table)?;
        }
        for table in [
            LIBRARIES_BY_SLUG_TABLE,
            FILES_BY_PATH_TABLE,
            ARTISTS_BY_SLUG_TABLE,
            GENRES_BY_SLUG_TABLE,
            SONG_GROUPS_BY_SLUG_TABLE,
            SONGS_BY_SLUG_TABLE,
            ALBUMS_BY_KEY_TABLE,
            RELEASES_BY_KEY_TABLE,
        ] {
            write_txn.open_table(table)?;
        }
        write_txn.open_table(TRACKS_BY_FILE_TABLE)?;
        write_txn.open_table(LYRICS_TABLE)?;
    }
    write_txn.commit()?;
    Ok(())
}

fn next_id(txn: &WriteTransaction, kind: &str) -> Result<u64, CatalogError> {
    let mut table = txn.open_table(SEQUENCES_TABLE)?;
    let next = match table.get(kind)? {
        Some(value) => value.value() + 1,
        None => 1,
    };
    table.insert(kind, next)?;
    Ok(next)
}

fn load<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: TableDefinition<u64, &[u8]>,
    id: u64,
) -> Result<Option<T>, CatalogError> {
    let table = txn.open_table(table)?;
    let value = match table.get(id)? {
        Some(value) => Some(decode_value(value.value())?),
        None => None,
    };
    Ok(value)
}

fn load_required<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: TableDefinition<u64, &[u8]>,
    kind: &'static str,
    id: u64,
) -> Result<T, CatalogError> {
    load(txn, table, id)?.ok_or_else(|| CatalogError::NotFound {
        kind,
        key: id.to_string(),
    })
}

fn store<T: Serialize>(
    txn: &WriteTransaction,
    table: TableDefinition<u64, &[u8]>,
    id: u64,
    value: &T,
) -> Result<(), CatalogError> {
    let mut table = txn.open_table(table)?;
    let bytes = encode_value(value)?;
    table.insert(id, bytes.as_slice())?;
    Ok(())
}

fn lookup(
    txn: &WriteTransaction,
    index: TableDefinition<&str, u64>,
    key: &str,
) -> Result<Option<u64>, CatalogError> {
    let table = txn.open_table(index)?;
    let id = table.get(key)?.map(|value| value.value());
    Ok(id)
}

fn link(
    txn: &WriteTransaction,
    index: TableDefinition<&str, u64>,
    key: &str,
    id: u64,
) -> Result<(), CatalogError> {
    let mut table = txn.open_table(index)?;
    table.insert(key, id)?;
    Ok(())
}

impl Catalog {
    fn read<T: DeserializeOwned>(
        &self,
        table: TableDefinition<u64, &[u8]>,
        id: u64,
    ) -> Result<Option<T>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let value = match table.get(id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(value)
    }

    /// Resolves an id or a slug through `index` and loads the entity.
    fn read_identified<T: DeserializeOwned>(
        &self,
        table: TableDefinition<u64, &[u8]>,
        index: TableDefinition<&str, u64>,
        kind: &'static str,
        identifier: &Identifier,
    ) -> Result<T, CatalogError> {
        let id = match identifier {
            Identifier::Id(id) => Some(*id),
            Identifier::Slug(slug) => {
                let read_txn = self.db.begin_read()?;
                let index = read_txn.open_table(index)?;
                let id = index.get(slug.as_str())?.map(|value| value.value());
                id
            }
        };
        let found = match id {
            Some(id) => self.read(table, id)?,
            None => None,
        };
        found.ok_or_else(|| CatalogError::NotFound {
            kind,
            key: identifier.to_string(),
        })
    }

    fn read_all<T: DeserializeOwned>(
        &self,
        table: TableDefinition<u64, &[u8]>,
    ) -> Result<Vec<T>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let mut items = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        Ok(items)
    }
}

fn valid_slug<S: AsRef<str>>(kind: &'static str, parts: &[S]) -> Result<Slug, CatalogError> {
    let slug = Slug::new(parts);
    if slug.is_empty() {
        let name = parts
            .iter()
            .map(|part| part.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        return Err(CatalogError::InvalidName { kind, name });
    }
    Ok(slug)
}

fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, CatalogError> {
    Ok(bincode::serialize(value)?)
}

fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CatalogError> {
    Ok(bincode::deserialize(bytes)?)
}

fn compound_key(scope: &str, key: &str) -> String {
    let mut out = prefix_key(scope);
    out.push_str(key);
    out
}

fn prefix_key(prefix: &str) -> String {
    let mut out = String::new();
    out.push_str(prefix);
    out.push(KEY_SEP);
    out
}

fn split_key_last(value: &str) -> Result<(&str, &str), CatalogError> {
    let idx = value
        .rfind(KEY_SEP)
        .ok_or_else(|| CatalogError::KeyParse(value.to_string()))?;
    let next = idx + KEY_SEP.len_utf8();
    Ok((&value[..idx], &value[next..]))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
