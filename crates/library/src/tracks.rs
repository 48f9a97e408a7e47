use common::{File, Song, Track, TrackType};
use redb::{ReadableTable, WriteTransaction};

use crate::{
    decode_value, load, load_required, next_id, now_secs, store, Catalog, CatalogError,
    FILES_TABLE, SONGS_TABLE, TRACKS_BY_FILE_TABLE, TRACKS_TABLE,
};

#[derive(Clone, Debug, PartialEq)]
pub struct TrackDraft {
    pub name: String,
    pub track_type: TrackType,
    pub disc_index: Option<u32>,
    pub track_index: Option<u32>,
    pub bitrate: Option<u32>,
    pub duration: Option<u32>,
    pub is_bonus: bool,
    pub is_remastered: bool,
    pub source_file_id: u64,
    pub release_id: u64,
    pub song_id: u64,
}

impl Catalog {
    /// Fails with `AlreadyExists` when the source file already backs a track.
    pub fn create_track(&self, draft: TrackDraft) -> Result<Track, CatalogError> {
        let write_txn = self.db.begin_write()?;
        load_required::<File>(&write_txn, FILES_TABLE, "file", draft.source_file_id)?;
        {
            let by_file = write_txn.open_table(TRACKS_BY_FILE_TABLE)?;
            if by_file.get(draft.source_file_id)?.is_some() {
                return Err(CatalogError::AlreadyExists {
                    kind: "track",
                    key: format!("file {}", draft.source_file_id),
                });
            }
        }

        let track = Track {
            id: next_id(&write_txn, "track")?,
            name: draft.name,
            track_type: draft.track_type,
            disc_index: draft.disc_index,
            track_index: draft.track_index,
            bitrate: draft.bitrate,
            duration: draft.duration,
            is_bonus: draft.is_bonus,
            is_remastered: draft.is_remastered,
            source_file_id: draft.source_file_id,
            release_id: draft.release_id,
            song_id: draft.song_id,
            register_date: now_secs(),
        };
        store(&write_txn, TRACKS_TABLE, track.id, &track)?;
        {
            let mut by_file = write_txn.open_table(TRACKS_BY_FILE_TABLE)?;
            by_file.insert(track.source_file_id, track.id)?;
        }
        write_txn.commit()?;
        Ok(track)
    }

    pub fn get_track(&self, id: u64) -> Result<Track, CatalogError> {
        self.read(TRACKS_TABLE, id)?.ok_or_else(|| CatalogError::NotFound {
            kind: "track",
            key: id.to_string(),
        })
    }

    pub fn find_track_by_file(&self, file_id: u64) -> Result<Option<Track>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let by_file = read_txn.open_table(TRACKS_BY_FILE_TABLE)?;
        let table = read_txn.open_table(TRACKS_TABLE)?;
        let track_id = match by_file.get(file_id)? {
            Some(value) => value.value(),
            None => return Ok(None),
        };
        let track = match table.get(track_id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(track)
    }

    pub fn delete_track_by_file(&self, file_id: u64) -> Result<Option<Track>, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let track = remove_track_of_file(&write_txn, file_id)?;
        write_txn.commit()?;
        Ok(track)
    }
}

/// Removes the track backed by `file_id`, clearing the song master if it
/// pointed at that track.
pub(crate) fn remove_track_of_file(
    txn: &WriteTransaction,
    file_id: u64,
) -> Result<Option<Track>, CatalogError> {
    let track_id = {
        let mut by_file = txn.open_table(TRACKS_BY_FILE_TABLE)?;
        let removed = by_file.remove(file_id)?.map(|value| value.value());
        removed
    };
    let track_id = match track_id {
        Some(id) => id,
        None => return Ok(None),
    };

    let track: Option<Track> = load(txn, TRACKS_TABLE, track_id)?;
    {
        let mut table = txn.open_table(TRACKS_TABLE)?;
        table.remove(track_id)?;
    }

    if let Some(track) = &track {
        if let Some(mut song) = load::<Song>(txn, SONGS_TABLE, track.song_id)? {
            if song.master_id == Some(track.id) {
                song.master_id = None;
                store(txn, SONGS_TABLE, song.id, &song)?;
            }
        }
    }
    Ok(track)
}
