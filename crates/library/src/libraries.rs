use common::{Identifier, Library};
use redb::ReadableTable;

use crate::{
    decode_value, link, load_required, lookup, next_id, store, valid_slug, Catalog, CatalogError,
    LIBRARIES_BY_SLUG_TABLE, LIBRARIES_TABLE,
};

impl Catalog {
    /// Keyed by the slug of `name`. An existing library keeps its id and
    /// picks up a changed root path.
    pub fn get_or_create_library(&self, name: &str, path: &str) -> Result<Library, CatalogError> {
        let slug = valid_slug("library", &[name])?;
        let write_txn = self.db.begin_write()?;
        let library = match lookup(&write_txn, LIBRARIES_BY_SLUG_TABLE, slug.as_str())? {
            Some(id) => {
                let mut library: Library =
                    load_required(&write_txn, LIBRARIES_TABLE, "library", id)?;
                if library.path == path {
                    return Ok(library);
                }
                library.path = path.to_string();
                store(&write_txn, LIBRARIES_TABLE, id, &library)?;
                library
            }
            None => {
                let library = Library {
                    id: next_id(&write_txn, "library")?,
                    name: name.trim().to_string(),
                    slug: slug.into_string(),
                    path: path.to_string(),
                };
                store(&write_txn, LIBRARIES_TABLE, library.id, &library)?;
                link(&write_txn, LIBRARIES_BY_SLUG_TABLE, &library.slug, library.id)?;
                library
            }
        };
        write_txn.commit()?;
        Ok(library)
    }

    pub fn get_library(&self, identifier: &Identifier) -> Result<Library, CatalogError> {
        self.read_identified(LIBRARIES_TABLE, LIBRARIES_BY_SLUG_TABLE, "library", identifier)
    }

    /// Every library, ordered by slug.
    pub fn list_libraries(&self) -> Result<Vec<Library>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(LIBRARIES_BY_SLUG_TABLE)?;
        let table = read_txn.open_table(LIBRARIES_TABLE)?;
        let mut libraries = Vec::new();
        for entry in index.iter()? {
            let entry = entry?;
            if let Some(value) = table.get(entry.1.value())? {
                libraries.push(decode_value(value.value())?);
            }
        }
        Ok(libraries)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::catalog;
    use common::Identifier;

    #[test]
    fn libraries_are_keyed_by_slug() {
        let (_dir, catalog) = catalog();
        let first = catalog.get_or_create_library("My Music", "/music").unwrap();
        let again = catalog.get_or_create_library("my music", "/music").unwrap();
        assert_eq!(first, again);

        let moved = catalog.get_or_create_library("My Music", "/mnt/music").unwrap();
        assert_eq!(moved.id, first.id);
        assert_eq!(moved.path, "/mnt/music");

        let by_slug = catalog
            .get_library(&Identifier::Slug("my-music".to_string()))
            .unwrap();
        assert_eq!(by_slug.path, "/mnt/music");
        assert!(catalog.get_library(&Identifier::Id(99)).is_err());
    }

    #[test]
    fn libraries_are_listed_by_slug() {
        let (_dir, catalog) = catalog();
        catalog.get_or_create_library("Videos", "/videos").unwrap();
        catalog.get_or_create_library("Audio", "/audio").unwrap();
        let slugs: Vec<String> = catalog
            .list_libraries()
            .unwrap()
            .into_iter()
            .map(|library| library.slug)
            .collect();
        assert_eq!(slugs, vec!["audio", "videos"]);
    }
}
