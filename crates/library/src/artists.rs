use common::{Artist, Genre, Identifier};

use crate::{
    link, load_required, lookup, next_id, now_secs, store, valid_slug, Catalog, CatalogError,
    ARTISTS_BY_SLUG_TABLE, ARTISTS_TABLE, GENRES_BY_SLUG_TABLE, GENRES_TABLE,
};

impl Catalog {
    pub fn get_or_create_artist(&self, name: &str) -> Result<Artist, CatalogError> {
        let slug = valid_slug("artist", &[name])?;
        let write_txn = self.db.begin_write()?;
        if let Some(id) = lookup(&write_txn, ARTISTS_BY_SLUG_TABLE, slug.as_str())? {
            return load_required(&write_txn, ARTISTS_TABLE, "artist", id);
        }
        let artist = Artist {
            id: next_id(&write_txn, "artist")?,
            name: name.trim().to_string(),
            slug: slug.into_string(),
            register_date: now_secs(),
        };
        store(&write_txn, ARTISTS_TABLE, artist.id, &artist)?;
        link(&write_txn, ARTISTS_BY_SLUG_TABLE, &artist.slug, artist.id)?;
        write_txn.commit()?;
        Ok(artist)
    }

    pub fn get_artist(&self, identifier: &Identifier) -> Result<Artist, CatalogError> {
        self.read_identified(ARTISTS_TABLE, ARTISTS_BY_SLUG_TABLE, "artist", identifier)
    }

    pub fn get_or_create_genre(&self, name: &str) -> Result<Genre, CatalogError> {
        let slug = valid_slug("genre", &[name])?;
        let write_txn = self.db.begin_write()?;
        if let Some(id) = lookup(&write_txn, GENRES_BY_SLUG_TABLE, slug.as_str())? {
            return load_required(&write_txn, GENRES_TABLE, "genre", id);
        }
        let genre = Genre {
            id: next_id(&write_txn, "genre")?,
            name: name.trim().to_string(),
            slug: slug.into_string(),
        };
        store(&write_txn, GENRES_TABLE, genre.id, &genre)?;
        link(&write_txn, GENRES_BY_SLUG_TABLE, &genre.slug, genre.id)?;
        write_txn.commit()?;
        Ok(genre)
    }

    pub fn get_genre(&self, identifier: &Identifier) -> Result<Genre, CatalogError> {
        self.read_identified(GENRES_TABLE, GENRES_BY_SLUG_TABLE, "genre", identifier)
    }
}
