use common::{Album, AlbumType, Artist, Release, COMPILATION_KEYWORD};
use redb::ReadableTable;
use time::Date;

use crate::{
    compound_key, link, load_required, lookup, next_id, now_secs, store, valid_slug, Catalog,
    CatalogError, ALBUMS_BY_KEY_TABLE, ALBUMS_TABLE, RELEASES_BY_KEY_TABLE, RELEASES_TABLE,
};

pub struct ReleaseDraft<'a> {
    pub name: &'a str,
    pub album_id: u64,
    pub release_date: Option<Date>,
    pub extensions: Vec<String>,
    pub discogs_id: Option<String>,
}

fn album_key(artist: Option<&Artist>, slug: &str) -> String {
    match artist {
        Some(artist) => compound_key(&artist.id.to_string(), slug),
        None => compound_key(COMPILATION_KEYWORD, slug),
    }
}

impl Catalog {
    /// Keyed by the album artist (or the compilation sentinel) and the slug
    /// of `name`. `album_type` only applies when the album is created.
    pub fn get_or_create_album(
        &self,
        name: &str,
        artist: Option<&Artist>,
        album_type: AlbumType,
    ) -> Result<Album, CatalogError> {
        let slug = valid_slug("album", &[name])?;
        let key = album_key(artist, slug.as_str());
        let write_txn = self.db.begin_write()?;
        if let Some(id) = lookup(&write_txn, ALBUMS_BY_KEY_TABLE, &key)? {
            return load_required(&write_txn, ALBUMS_TABLE, "album", id);
        }
        let album = Album {
            id: next_id(&write_txn, "album")?,
            name: name.trim().to_string(),
            slug: slug.into_string(),
            artist_id: artist.map(|artist| artist.id),
            album_type,
            master_id: None,
            register_date: now_secs(),
        };
        store(&write_txn, ALBUMS_TABLE, album.id, &album)?;
        link(&write_txn, ALBUMS_BY_KEY_TABLE, &key, album.id)?;
        write_txn.commit()?;
        Ok(album)
    }

    pub fn get_album(&self, id: u64) -> Result<Album, CatalogError> {
        self.read(ALBUMS_TABLE, id)?.ok_or_else(|| CatalogError::NotFound {
            kind: "album",
            key: id.to_string(),
        })
    }

    /// Looks an album up without creating it. `artist` is `None` for compilations.
    pub fn find_album(&self, name: &str, artist: Option<&Artist>) -> Result<Album, CatalogError> {
        let slug = valid_slug("album", &[name])?;
        let key = album_key(artist, slug.as_str());
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ALBUMS_BY_KEY_TABLE)?;
        let id = index.get(key.as_str())?.map(|value| value.value());
        drop(index);
        match id {
            Some(id) => self.get_album(id),
            None => Err(CatalogError::NotFound { kind: "album", key }),
        }
    }

    /// Flips a studio album to a compilation. Any other type is left alone,
    /// so the flip happens at most once. Returns whether the album changed.
    pub fn mark_album_compilation(&self, album_id: u64) -> Result<bool, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let mut album: Album = load_required(&write_txn, ALBUMS_TABLE, "album", album_id)?;
        if album.album_type != AlbumType::StudioRecording {
            return Ok(false);
        }
        album.album_type = AlbumType::Compilation;
        store(&write_txn, ALBUMS_TABLE, album.id, &album)?;
        write_txn.commit()?;
        Ok(true)
    }

    pub fn set_album_master(&self, album_id: u64, release_id: u64) -> Result<bool, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let mut album: Album = load_required(&write_txn, ALBUMS_TABLE, "album", album_id)?;
        if album.master_id.is_some() {
            return Ok(false);
        }
        album.master_id = Some(release_id);
        store(&write_txn, ALBUMS_TABLE, album.id, &album)?;
        write_txn.commit()?;
        Ok(true)
    }

    /// Keyed by album and the slug of `name`.
    pub fn get_or_create_release(&self, draft: ReleaseDraft<'_>) -> Result<Release, CatalogError> {
        let slug = valid_slug("release", &[draft.name])?;
        let key = compound_key(&draft.album_id.to_string(), slug.as_str());
        let write_txn = self.db.begin_write()?;
        if let Some(id) = lookup(&write_txn, RELEASES_BY_KEY_TABLE, &key)? {
            return load_required(&write_txn, RELEASES_TABLE, "release", id);
        }
        // The album must exist before a release can hang off it.
        load_required::<Album>(&write_txn, ALBUMS_TABLE, "album", draft.album_id)?;

        let release = Release {
            id: next_id(&write_txn, "release")?,
            name: draft.name.trim().to_string(),
            slug: slug.into_string(),
            album_id: draft.album_id,
            release_date: draft.release_date,
            extensions: draft.extensions,
            label_id: None,
            discogs_id: draft.discogs_id,
            register_date: now_secs(),
        };
        store(&write_txn, RELEASES_TABLE, release.id, &release)?;
        link(&write_txn, RELEASES_BY_KEY_TABLE, &key, release.id)?;
        write_txn.commit()?;
        Ok(release)
    }

    pub fn get_release(&self, id: u64) -> Result<Release, CatalogError> {
        self.read(RELEASES_TABLE, id)?.ok_or_else(|| CatalogError::NotFound {
            kind: "release",
            key: id.to_string(),
        })
    }

    /// Release dates only move earlier. Returns whether the release changed.
    pub fn update_release_date(&self, release_id: u64, date: Date) -> Result<bool, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let mut release: Release =
            load_required(&write_txn, RELEASES_TABLE, "release", release_id)?;
        if release.release_date.is_some_and(|current| current <= date) {
            return Ok(false);
        }
        release.release_date = Some(date);
        store(&write_txn, RELEASES_TABLE, release.id, &release)?;
        write_txn.commit()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::catalog;
    use time::macros::date;

    fn release<'a>(name: &'a str, album_id: u64, release_date: Option<Date>) -> ReleaseDraft<'a> {
        ReleaseDraft {
            name,
            album_id,
            release_date,
            extensions: Vec::new(),
            discogs_id: None,
        }
    }

    #[test]
    fn albums_are_scoped_to_their_artist() {
        let (_dir, catalog) = catalog();
        let artist = catalog.get_or_create_artist("Artist").unwrap();
        let album = catalog
            .get_or_create_album("Album", Some(&artist), AlbumType::StudioRecording)
            .unwrap();
        let same = catalog
            .get_or_create_album("album", Some(&artist), AlbumType::LiveRecording)
            .unwrap();
        assert_eq!(album, same);

        let compilation = catalog
            .get_or_create_album("Album", None, AlbumType::StudioRecording)
            .unwrap();
        assert_ne!(compilation.id, album.id);
        assert_eq!(compilation.artist_id, None);
        assert_eq!(catalog.find_album("Album", None).unwrap(), compilation);
    }

    #[test]
    fn compilation_flip_happens_once() {
        let (_dir, catalog) = catalog();
        let album = catalog
            .get_or_create_album("Hits", None, AlbumType::StudioRecording)
            .unwrap();
        assert!(catalog.mark_album_compilation(album.id).unwrap());
        assert!(!catalog.mark_album_compilation(album.id).unwrap());
        assert_eq!(
            catalog.get_album(album.id).unwrap().album_type,
            AlbumType::Compilation
        );

        let live = catalog
            .get_or_create_album("Live at Home", None, AlbumType::LiveRecording)
            .unwrap();
        assert!(!catalog.mark_album_compilation(live.id).unwrap());
    }

    #[test]
    fn album_master_is_set_once() {
        let (_dir, catalog) = catalog();
        let album = catalog
            .get_or_create_album("Album", None, AlbumType::StudioRecording)
            .unwrap();
        assert!(catalog.set_album_master(album.id, 1).unwrap());
        assert!(!catalog.set_album_master(album.id, 2).unwrap());
        assert_eq!(catalog.get_album(album.id).unwrap().master_id, Some(1));
    }

    #[test]
    fn earliest_release_date_wins() {
        let (_dir, catalog) = catalog();
        let album = catalog
            .get_or_create_album("Album", None, AlbumType::StudioRecording)
            .unwrap();
        let undated = catalog
            .get_or_create_release(release("Album", album.id, None))
            .unwrap();
        assert_eq!(undated.release_date, None);

        assert!(catalog.update_release_date(undated.id, date!(2006 - 01 - 01)).unwrap());
        assert!(!catalog.update_release_date(undated.id, date!(2010 - 01 - 01)).unwrap());
        assert!(catalog.update_release_date(undated.id, date!(2001 - 05 - 01)).unwrap());

        let stored = catalog.get_release(undated.id).unwrap();
        assert_eq!(stored.release_date, Some(date!(2001 - 05 - 01)));
    }

    #[test]
    fn releases_need_their_album() {
        let (_dir, catalog) = catalog();
        let err = catalog
            .get_or_create_release(release("Album", 42, None))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { kind: "album", .. }));
    }
}
