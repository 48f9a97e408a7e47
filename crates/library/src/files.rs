use common::{File, Track};
use redb::ReadableTable;

use crate::tracks::remove_track_of_file;
use crate::{
    compound_key, decode_value, link, load, lookup, next_id, now_secs, prefix_key, split_key_last,
    store, Catalog, CatalogError, FILES_BY_PATH_TABLE, FILES_TABLE,
};

fn path_key(library_id: u64, path: &str) -> String {
    compound_key(&library_id.to_string(), path)
}

impl Catalog {
    /// Fails with `AlreadyExists` when the library already has a file at `path`.
    pub fn create_file(
        &self,
        library_id: u64,
        path: &str,
        checksum: &str,
    ) -> Result<File, CatalogError> {
        let key = path_key(library_id, path);
        let write_txn = self.db.begin_write()?;
        if lookup(&write_txn, FILES_BY_PATH_TABLE, &key)?.is_some() {
            return Err(CatalogError::AlreadyExists {
                kind: "file",
                key: path.to_string(),
            });
        }
        let file = File {
            id: next_id(&write_txn, "file")?,
            library_id,
            path: path.to_string(),
            checksum: checksum.to_string(),
            register_date: now_secs(),
        };
        store(&write_txn, FILES_TABLE, file.id, &file)?;
        link(&write_txn, FILES_BY_PATH_TABLE, &key, file.id)?;
        write_txn.commit()?;
        Ok(file)
    }

    pub fn get_file(&self, id: u64) -> Result<File, CatalogError> {
        self.read(FILES_TABLE, id)?.ok_or_else(|| CatalogError::NotFound {
            kind: "file",
            key: id.to_string(),
        })
    }

    pub fn find_file(&self, library_id: u64, path: &str) -> Result<Option<File>, CatalogError> {
        let key = path_key(library_id, path);
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(FILES_BY_PATH_TABLE)?;
        let table = read_txn.open_table(FILES_TABLE)?;
        let id = match index.get(key.as_str())? {
            Some(value) => value.value(),
            None => return Ok(None),
        };
        let file = match table.get(id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(file)
    }

    /// Files registered for a library, ordered by relative path.
    pub fn list_files(&self, library_id: u64) -> Result<Vec<File>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(FILES_BY_PATH_TABLE)?;
        let table = read_txn.open_table(FILES_TABLE)?;

        let prefix = prefix_key(&library_id.to_string());
        let mut end = prefix.clone();
        end.push('\u{10ffff}');
        let mut files = Vec::new();

        for entry in index.range(prefix.as_str()..end.as_str())? {
            let entry = entry?;
            let (scope, _) = split_key_last(entry.0.value())?;
            if scope != library_id.to_string() {
                continue;
            }
            if let Some(value) = table.get(entry.1.value())? {
                files.push(decode_value(value.value())?);
            }
        }

        Ok(files)
    }

    /// Deletes the file and the track it backs, in one transaction. Returns
    /// the removed track, if there was one.
    pub fn delete_file(&self, id: u64) -> Result<Option<Track>, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let file: File = match load(&write_txn, FILES_TABLE, id)? {
            Some(file) => file,
            None => {
                return Err(CatalogError::NotFound {
                    kind: "file",
                    key: id.to_string(),
                })
            }
        };
        let track = remove_track_of_file(&write_txn, id)?;
        {
            let mut index = write_txn.open_table(FILES_BY_PATH_TABLE)?;
            index.remove(path_key(file.library_id, &file.path).as_str())?;
            let mut table = write_txn.open_table(FILES_TABLE)?;
            table.remove(id)?;
        }
        write_txn.commit()?;
        Ok(track)
    }
}
