use std::collections::HashSet;

use common::{Artist, File, Identifier, Release, Slug, Song, Track, TrackType};
use metadata::{Metadata, MetadataError, NameParser};

use crate::albums::ReleaseDraft;
use crate::songs::SongDraft;
use crate::tracks::TrackDraft;
use crate::{Catalog, RegistrationError};

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTrack {
    pub track: Track,
    pub song: Song,
    pub release: Release,
}

/// Turns validated metadata into catalog entities, creating whatever is
/// missing.
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    names: &'a NameParser,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog, names: &'a NameParser) -> Self {
        Self { catalog, names }
    }

    pub fn resolve(
        &self,
        metadata: &Metadata,
        file: &File,
        overwrite: bool,
    ) -> Result<ResolvedTrack, RegistrationError> {
        let name = required(&metadata.name, "name")?;
        let album_name = required(&metadata.album, "album")?;
        let release_name = required(&metadata.release, "release")?;
        let track_type = metadata
            .track_type
            .ok_or(MetadataError::MissingMetadata("track type"))?;

        let genre_ids = self.resolve_genres(&metadata.genres)?;

        let album_artist = if metadata.is_compilation() {
            None
        } else {
            let artist_name = metadata
                .album_artist
                .as_deref()
                .or(metadata.artist.as_deref())
                .ok_or(MetadataError::MissingMetadata("album artist"))?;
            Some(self.catalog.get_or_create_artist(artist_name)?)
        };

        let (song_name, mut featuring) = self
            .names
            .extract_featured_from_song_name(name, self.catalog);
        featuring.extend(metadata.featuring.iter().cloned());
        let raw_artist = required(&metadata.artist, "artist")?;
        let artist_name = match &album_artist {
            Some(album_artist) if album_artist.name == raw_artist => raw_artist.to_string(),
            _ => {
                let (artist, extra) = self
                    .names
                    .extract_featured_from_artist_name(raw_artist, self.catalog);
                featuring.extend(extra);
                artist
            }
        };

        let song_artist = match &album_artist {
            Some(album_artist) if Slug::from_name(&artist_name).as_str() == album_artist.slug => {
                album_artist.clone()
            }
            _ => self.catalog.get_or_create_artist(&artist_name)?,
        };
        let featuring_ids = self.resolve_featuring(&song_artist, &featuring)?;

        let parsed = self.names.parse_track_extensions(&song_name);
        let stripped = self.names.strip_groups(&parsed.parsed_name);
        let group_base = if stripped.trim().is_empty() {
            parsed.parsed_name.as_str()
        } else {
            stripped.as_str()
        };
        let song = self.catalog.get_or_create_song(SongDraft {
            name: &parsed.parsed_name,
            artist: &song_artist,
            group_slug: Slug::new(&[song_artist.name.as_str(), group_base]),
            featuring_ids,
            genre_ids: genre_ids.clone(),
            song_type: self.names.song_type_from_name(&parsed.parsed_name),
        })?;
        let song = self.catalog.add_song_genres(song.id, &genre_ids)?;

        let (album_name, _) = self.names.parse_release_extension(album_name);
        let album = self.catalog.get_or_create_album(
            &album_name,
            album_artist.as_ref(),
            self.names.album_type_from_name(&album_name),
        )?;

        let (release_name, extensions) = self.names.parse_release_extension(release_name);
        let release = self.catalog.get_or_create_release(ReleaseDraft {
            name: &release_name,
            album_id: album.id,
            release_date: metadata.release_date,
            extensions,
            discogs_id: metadata.discogs_id.clone(),
        })?;

        if album_artist.is_none() {
            self.catalog.mark_album_compilation(album.id)?;
        }
        self.catalog.set_album_master(album.id, release.id)?;
        if let Some(date) = metadata.release_date {
            self.catalog.update_release_date(release.id, date)?;
        }

        if overwrite {
            self.catalog.delete_track_by_file(file.id)?;
        }
        let track = self.catalog.create_track(TrackDraft {
            name: parsed.parsed_name.clone(),
            track_type,
            disc_index: metadata.disc_index,
            track_index: metadata.index,
            bitrate: metadata.bitrate.map(floor_u32),
            duration: metadata.duration.map(floor_u32),
            is_bonus: parsed.bonus,
            is_remastered: parsed.remastered,
            source_file_id: file.id,
            release_id: release.id,
            song_id: song.id,
        })?;

        if track_type == TrackType::Audio {
            self.catalog.set_song_master(song.id, track.id)?;
        }
        let song = self.catalog.get_song(&Identifier::Id(song.id))?;
        let release = self.catalog.get_release(release.id)?;

        Ok(ResolvedTrack {
            track,
            song,
            release,
        })
    }

    fn resolve_genres(&self, names: &[String]) -> Result<Vec<u64>, RegistrationError> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for name in names {
            let slug = Slug::from_name(name);
            if slug.is_empty() || !seen.insert(slug) {
                continue;
            }
            ids.push(self.catalog.get_or_create_genre(name)?.id);
        }
        Ok(ids)
    }

    fn resolve_featuring(
        &self,
        song_artist: &Artist,
        names: &[String],
    ) -> Result<Vec<u64>, RegistrationError> {
        let mut seen = HashSet::new();
        seen.insert(Slug::from_name(&song_artist.name));
        let mut ids = Vec::new();
        for name in names {
            let slug = Slug::from_name(name);
            if slug.is_empty() || !seen.insert(slug) {
                continue;
            }
            ids.push(self.catalog.get_or_create_artist(name)?.id);
        }
        Ok(ids)
    }
}

fn required<'m>(value: &'m Option<String>, field: &'static str) -> Result<&'m str, MetadataError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(MetadataError::MissingMetadata(field)),
    }
}

fn floor_u32(value: f64) -> u32 {
    value.floor().clamp(0.0, u32::MAX as f64) as u32
}
