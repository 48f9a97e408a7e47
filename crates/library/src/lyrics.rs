use redb::ReadableTable;

use crate::{Catalog, CatalogError, LYRICS_TABLE};

impl Catalog {
    pub fn get_lyrics(&self, song_id: u64) -> Result<Option<String>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LYRICS_TABLE)?;
        let lyrics = table.get(song_id)?.map(|value| value.value().to_string());
        Ok(lyrics)
    }

    /// Stores lyrics for a song. Without `replace`, lyrics already stored are
    /// kept. Returns whether anything was written.
    pub fn save_lyrics(&self, song_id: u64, text: &str, replace: bool) -> Result<bool, CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LYRICS_TABLE)?;
            if !replace && table.get(song_id)?.is_some() {
                return Ok(false);
            }
            table.insert(song_id, text)?;
        }
        write_txn.commit()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::catalog;

    #[test]
    fn lyrics_are_kept_unless_replaced() {
        let (_dir, catalog) = catalog();
        assert_eq!(catalog.get_lyrics(1).unwrap(), None);
        assert!(catalog.save_lyrics(1, "first", false).unwrap());
        assert!(!catalog.save_lyrics(1, "second", false).unwrap());
        assert_eq!(catalog.get_lyrics(1).unwrap().as_deref(), Some("first"));
        assert!(catalog.save_lyrics(1, "third", true).unwrap());
        assert_eq!(catalog.get_lyrics(1).unwrap().as_deref(), Some("third"));
    }
}
