use std::path::Path;

use common::TrackType;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use lofty::tag::Tag;
use time::{Date, Month};

use crate::path::media_type;
use crate::{Metadata, MetadataError};

#[derive(Debug, Clone)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime: Option<String>,
}

pub(crate) struct EmbeddedOptions<'a> {
    pub use_embedded_flag: bool,
    pub separators: &'a [char],
}

pub(crate) fn parse_file(
    path: &Path,
    options: &EmbeddedOptions<'_>,
    is_compilation_artist: impl Fn(&str) -> bool,
) -> Result<Metadata, MetadataError> {
    if !path.exists() {
        return Err(MetadataError::FileNotFound(path.to_path_buf()));
    }
    if std::fs::File::open(path).is_err() {
        return Err(MetadataError::FileNotReadable(path.to_path_buf()));
    }
    let tagged_file = lofty::read_from_path(path).map_err(|err| MetadataError::FileParsing {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let properties = tagged_file.properties();

    let mut metadata = Metadata {
        track_type: Some(media_type(path).unwrap_or(TrackType::Audio)),
        ..Metadata::default()
    };

    let duration = properties.duration().as_secs_f64();
    if duration > 0.0 {
        metadata.duration = Some(duration);
    }
    metadata.bitrate = properties
        .audio_bitrate()
        .or(properties.overall_bitrate())
        .filter(|kbps| *kbps > 0)
        .map(f64::from);

    let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(tag) => tag,
        None => {
            metadata.compilation = Some(false);
            return Ok(metadata);
        }
    };

    let album_artist = text(tag, &ItemKey::AlbumArtist);
    let compilation = if options.use_embedded_flag {
        text(tag, &ItemKey::FlagCompilation)
            .map(|flag| flag == "1" || flag.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    } else {
        album_artist
            .as_deref()
            .map(|name| is_compilation_artist(name))
            .unwrap_or(false)
    };

    metadata.compilation = Some(compilation);
    metadata.album_artist = if compilation { None } else { album_artist };
    metadata.artist = text(tag, &ItemKey::TrackArtist);
    metadata.album = text(tag, &ItemKey::AlbumTitle);
    metadata.release = metadata.album.clone();
    metadata.name = text(tag, &ItemKey::TrackTitle);
    metadata.index = tag.get_string(&ItemKey::TrackNumber).and_then(parse_position);
    metadata.disc_index = tag.get_string(&ItemKey::DiscNumber).and_then(parse_position);
    metadata.release_date = tag
        .get_string(&ItemKey::RecordingDate)
        .or_else(|| tag.get_string(&ItemKey::Year))
        .and_then(parse_date);
    metadata.genres = tag
        .get_strings(&ItemKey::Genre)
        .flat_map(|value| split_genres(value, options.separators))
        .collect();

    Ok(metadata)
}

pub fn read_cover(path: &Path) -> Result<Option<CoverArt>, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(tag) => tag,
        None => return Ok(None),
    };

    let picture = match pick_picture(tag.pictures()) {
        Some(picture) => picture,
        None => return Ok(None),
    };

    let data = picture.data().to_vec();
    let mime = guess_mime(&data);
    Ok(Some(CoverArt { data, mime }))
}

pub fn read_lyrics(path: &Path) -> Result<Option<String>, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let lyrics = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .and_then(|tag| text(tag, &ItemKey::Lyrics));
    Ok(lyrics)
}

fn text(tag: &Tag, key: &ItemKey) -> Option<String> {
    let value = tag.get_string(key)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Accepts `3` as well as `3/12`.
fn parse_position(text: &str) -> Option<u32> {
    let head = text.split('/').next().unwrap_or(text).trim();
    head.parse().ok()
}

/// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, with anything after the day ignored.
fn parse_date(text: &str) -> Option<Date> {
    let mut parts = text.trim().splitn(3, '-');
    let year: i32 = parts.next()?.get(..4)?.parse().ok()?;
    let month = parts
        .next()
        .and_then(|value| value.get(..2))
        .and_then(|value| value.parse::<u8>().ok())
        .and_then(|value| Month::try_from(value).ok());
    let day = parts
        .next()
        .and_then(|value| value.get(..2))
        .and_then(|value| value.parse::<u8>().ok());

    if let (Some(month), Some(day)) = (month, day) {
        if let Ok(date) = Date::from_calendar_date(year, month, day) {
            return Some(date);
        }
    }
    Date::from_calendar_date(year, month.unwrap_or(Month::January), 1).ok()
}

fn split_genres(text: &str, separators: &[char]) -> Vec<String> {
    let mut out = Vec::new();
    for part in text.split(separators) {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

fn pick_picture(pictures: &[Picture]) -> Option<&Picture> {
    for picture in pictures {
        if picture.pic_type() == PictureType::CoverFront {
            return Some(picture);
        }
    }
    pictures.first()
}

fn guess_mime(bytes: &[u8]) -> Option<String> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg".to_string())
    } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some("image/png".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_tagged_wav, write_wav};
    use time::macros::date;

    #[test]
    fn dates_accept_partial_forms() {
        assert_eq!(parse_date("2006"), Some(date!(2006 - 01 - 01)));
        assert_eq!(parse_date("2006-03"), Some(date!(2006 - 03 - 01)));
        assert_eq!(parse_date("2006-03-15T10:00:00"), Some(date!(2006 - 03 - 15)));
        assert_eq!(parse_date("2006-02-31"), Some(date!(2006 - 02 - 01)));
        assert_eq!(parse_date("unknown"), None);
    }

    #[test]
    fn positions_ignore_totals() {
        assert_eq!(parse_position("3/12"), Some(3));
        assert_eq!(parse_position(" 7 "), Some(7));
        assert_eq!(parse_position("A"), None);
    }

    #[test]
    fn genres_split_on_separators() {
        assert_eq!(
            split_genres("Rock; Pop , Electro\\Dance", &[';', ',', '\\']),
            vec!["Rock", "Pop", "Electro", "Dance"]
        );
        assert!(split_genres(" ; ", &[';']).is_empty());
    }

    #[test]
    fn missing_file_is_reported() {
        let options = EmbeddedOptions {
            use_embedded_flag: false,
            separators: &[';'],
        };
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.flac");
        let err = parse_file(&missing, &options, |_| false).unwrap_err();
        assert!(matches!(err, MetadataError::FileNotFound(_)));
    }

    #[test]
    fn garbage_file_fails_to_parse() {
        let options = EmbeddedOptions {
            use_embedded_flag: false,
            separators: &[';'],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.flac");
        std::fs::write(&path, b"not really audio").unwrap();
        let err = parse_file(&path, &options, |_| false).unwrap_err();
        assert!(matches!(err, MetadataError::FileParsing { .. }));
    }

    fn tagged(dir: &tempfile::TempDir, items: &[(ItemKey, &str)]) -> std::path::PathBuf {
        let path = dir.path().join("Artist").join("Album").join("01 Song.wav");
        write_tagged_wav(&path, items);
        path
    }

    #[test]
    fn reads_tags_and_properties() {
        let options = EmbeddedOptions {
            use_embedded_flag: false,
            separators: &[';', ','],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = tagged(
            &dir,
            &[
                (ItemKey::TrackArtist, "Some Artist"),
                (ItemKey::AlbumArtist, "Album Artist"),
                (ItemKey::AlbumTitle, "Some Album"),
                (ItemKey::TrackTitle, "Some Song"),
                (ItemKey::TrackNumber, "3"),
                (ItemKey::DiscNumber, "2"),
                (ItemKey::Genre, "Rock; Pop,Electro"),
                (ItemKey::RecordingDate, "2006-03-15"),
            ],
        );

        let metadata = parse_file(&path, &options, |_| false).unwrap();
        assert_eq!(metadata.compilation, Some(false));
        assert_eq!(metadata.artist.as_deref(), Some("Some Artist"));
        assert_eq!(metadata.album_artist.as_deref(), Some("Album Artist"));
        assert_eq!(metadata.album.as_deref(), Some("Some Album"));
        assert_eq!(metadata.release.as_deref(), Some("Some Album"));
        assert_eq!(metadata.name.as_deref(), Some("Some Song"));
        assert_eq!(metadata.index, Some(3));
        assert_eq!(metadata.disc_index, Some(2));
        assert_eq!(metadata.genres, vec!["Rock", "Pop", "Electro"]);
        assert_eq!(metadata.release_date, Some(date!(2006 - 03 - 15)));
        assert_eq!(metadata.track_type, Some(TrackType::Audio));

        let duration = metadata.duration.unwrap();
        assert!((duration - 1.0).abs() < 0.05, "duration {}", duration);
        let bitrate = metadata.bitrate.unwrap();
        assert!((100.0..=160.0).contains(&bitrate), "bitrate {}", bitrate);
    }

    #[test]
    fn compilation_artist_alias_clears_album_artist() {
        let options = EmbeddedOptions {
            use_embedded_flag: false,
            separators: &[';'],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = tagged(
            &dir,
            &[
                (ItemKey::TrackArtist, "Someone"),
                (ItemKey::AlbumArtist, "Various Artists"),
                (ItemKey::FlagCompilation, "0"),
            ],
        );

        let metadata = parse_file(&path, &options, |name| name == "Various Artists").unwrap();
        assert_eq!(metadata.compilation, Some(true));
        assert_eq!(metadata.album_artist, None);
        assert_eq!(metadata.artist.as_deref(), Some("Someone"));
    }

    #[test]
    fn embedded_flag_marks_compilations_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = tagged(
            &dir,
            &[
                (ItemKey::TrackArtist, "Someone"),
                (ItemKey::AlbumArtist, "Various Artists"),
                (ItemKey::FlagCompilation, "1"),
            ],
        );

        let flag = EmbeddedOptions {
            use_embedded_flag: true,
            separators: &[';'],
        };
        let metadata = parse_file(&path, &flag, |_| false).unwrap();
        assert_eq!(metadata.compilation, Some(true));
        assert_eq!(metadata.album_artist, None);

        // With the flag trusted, the alias list plays no part.
        let unflagged = tagged(&dir, &[(ItemKey::AlbumArtist, "Various Artists")]);
        let metadata = parse_file(&unflagged, &flag, |_| true).unwrap();
        assert_eq!(metadata.compilation, Some(false));
        assert_eq!(metadata.album_artist.as_deref(), Some("Various Artists"));
    }

    #[test]
    fn untagged_file_keeps_properties_only() {
        let options = EmbeddedOptions {
            use_embedded_flag: false,
            separators: &[';'],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.wav");
        write_wav(&path);

        let metadata = parse_file(&path, &options, |_| false).unwrap();
        assert_eq!(metadata.compilation, Some(false));
        assert_eq!(metadata.name, None);
        assert!(metadata.duration.is_some());
    }
}
