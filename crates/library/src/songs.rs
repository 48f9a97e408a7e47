use common::{Artist, Identifier, Slug, Song, SongGroup, SongType};

use crate::{
    link, load_required, lookup, next_id, now_secs, store, valid_slug, Catalog, CatalogError,
    SONGS_BY_SLUG_TABLE, SONGS_TABLE, SONG_GROUPS_BY_SLUG_TABLE, SONG_GROUPS_TABLE,
};

pub struct SongDraft<'a> {
    pub name: &'a str,
    pub artist: &'a Artist,
    pub group_slug: Slug,
    pub featuring_ids: Vec<u64>,
    pub genre_ids: Vec<u64>,
    pub song_type: SongType,
}

impl Catalog {
    /// Keyed by `Slug(artist, name)`. An existing song is returned as stored,
    /// the draft's featuring artists and genres only apply on creation.
    pub fn get_or_create_song(&self, draft: SongDraft<'_>) -> Result<Song, CatalogError> {
        let slug = valid_slug("song", &[draft.artist.name.as_str(), draft.name])?;
        if draft.group_slug.is_empty() {
            return Err(CatalogError::InvalidName {
                kind: "song group",
                name: draft.name.to_string(),
            });
        }

        let write_txn = self.db.begin_write()?;
        if let Some(id) = lookup(&write_txn, SONGS_BY_SLUG_TABLE, slug.as_str())? {
            return load_required(&write_txn, SONGS_TABLE, "song", id);
        }

        let group_id = match lookup(&write_txn, SONG_GROUPS_BY_SLUG_TABLE, draft.group_slug.as_str())? {
            Some(id) => id,
            None => {
                let group = SongGroup {
                    id: next_id(&write_txn, "song_group")?,
                    slug: draft.group_slug.into_string(),
                };
                store(&write_txn, SONG_GROUPS_TABLE, group.id, &group)?;
                link(&write_txn, SONG_GROUPS_BY_SLUG_TABLE, &group.slug, group.id)?;
                group.id
            }
        };

        let mut genre_ids = Vec::new();
        merge_ids(&mut genre_ids, &draft.genre_ids);
        let mut featuring_ids = Vec::new();
        merge_ids(&mut featuring_ids, &draft.featuring_ids);

        let song = Song {
            id: next_id(&write_txn, "song")?,
            name: draft.name.trim().to_string(),
            slug: slug.into_string(),
            artist_id: draft.artist.id,
            group_id,
            featuring_ids,
            genre_ids,
            song_type: draft.song_type,
            master_id: None,
            register_date: now_secs(),
        };
        store(&write_txn, SONGS_TABLE, song.id, &song)?;
        link(&write_txn, SONGS_BY_SLUG_TABLE, &song.slug, song.id)?;
        write_txn.commit()?;
        Ok(song)
    }

    pub fn get_song(&self, identifier: &Identifier) -> Result<Song, CatalogError> {
        self.read_identified(SONGS_TABLE, SONGS_BY_SLUG_TABLE, "song", identifier)
    }

    pub fn get_song_group(&self, identifier: &Identifier) -> Result<SongGroup, CatalogError> {
        self.read_identified(
            SONG_GROUPS_TABLE,
            SONG_GROUPS_BY_SLUG_TABLE,
            "song group",
            identifier,
        )
    }

    /// Unions `genre_ids` into the song's genres. Genres are never removed here.
    pub fn add_song_genres(&self, song_id: u64, genre_ids: &[u64]) -> Result<Song, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let mut song: Song = load_required(&write_txn, SONGS_TABLE, "song", song_id)?;
        let before = song.genre_ids.len();
        merge_ids(&mut song.genre_ids, genre_ids);
        if song.genre_ids.len() == before {
            return Ok(song);
        }
        store(&write_txn, SONGS_TABLE, song.id, &song)?;
        write_txn.commit()?;
        Ok(song)
    }

    /// Sets the master track unless one is already set. Returns whether the
    /// song changed.
    pub fn set_song_master(&self, song_id: u64, track_id: u64) -> Result<bool, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let mut song: Song = load_required(&write_txn, SONGS_TABLE, "song", song_id)?;
        if song.master_id.is_some() {
            return Ok(false);
        }
        song.master_id = Some(track_id);
        store(&write_txn, SONGS_TABLE, song.id, &song)?;
        write_txn.commit()?;
        Ok(true)
    }
}

fn merge_ids(target: &mut Vec<u64>, incoming: &[u64]) {
    for id in incoming {
        if !target.contains(id) {
            target.push(*id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::catalog;

    fn draft<'a>(name: &'a str, artist: &'a Artist, genre_ids: Vec<u64>) -> SongDraft<'a> {
        SongDraft {
            name,
            artist,
            group_slug: Slug::new(&[artist.name.as_str(), "Song"]),
            featuring_ids: Vec::new(),
            genre_ids,
            song_type: SongType::Original,
        }
    }

    #[test]
    fn versions_share_a_group() {
        let (_dir, catalog) = catalog();
        let artist = catalog.get_or_create_artist("Artist").unwrap();
        let original = catalog.get_or_create_song(draft("Song", &artist, vec![])).unwrap();
        let remix = catalog
            .get_or_create_song(SongDraft {
                song_type: SongType::Remix,
                ..draft("Song (Remix)", &artist, vec![])
            })
            .unwrap();
        assert_ne!(original.id, remix.id);
        assert_eq!(original.group_id, remix.group_id);
        assert_eq!(remix.song_type, SongType::Remix);
        assert_eq!(
            catalog
                .get_song_group(&Identifier::Id(remix.group_id))
                .unwrap()
                .slug,
            "artist-song"
        );
        assert_eq!(
            catalog
                .get_song(&Identifier::Slug("artist-song-remix".to_string()))
                .unwrap(),
            remix
        );
    }

    #[test]
    fn genres_accumulate() {
        let (_dir, catalog) = catalog();
        let artist = catalog.get_or_create_artist("Artist").unwrap();
        let song = catalog.get_or_create_song(draft("Song", &artist, vec![1, 2, 1])).unwrap();
        assert_eq!(song.genre_ids, vec![1, 2]);

        let again = catalog.get_or_create_song(draft("Song", &artist, vec![3])).unwrap();
        assert_eq!(again.genre_ids, vec![1, 2]);

        let merged = catalog.add_song_genres(song.id, &[3, 2]).unwrap();
        assert_eq!(merged.genre_ids, vec![1, 2, 3]);
        let merged = catalog.add_song_genres(song.id, &[]).unwrap();
        assert_eq!(merged.genre_ids, vec![1, 2, 3]);
    }

    #[test]
    fn master_is_set_once() {
        let (_dir, catalog) = catalog();
        let artist = catalog.get_or_create_artist("Artist").unwrap();
        let song = catalog.get_or_create_song(draft("Song", &artist, vec![])).unwrap();
        assert!(catalog.set_song_master(song.id, 10).unwrap());
        assert!(!catalog.set_song_master(song.id, 11).unwrap());
        let stored = catalog.get_song(&Identifier::Id(song.id)).unwrap();
        assert_eq!(stored.master_id, Some(10));
    }
}
