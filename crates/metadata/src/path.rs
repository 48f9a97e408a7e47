use std::path::Path;

use common::TrackType;
use mime_guess::mime;
use regex::{Captures, Regex};
use time::{Date, Month};

use crate::{Metadata, MetadataError};

pub(crate) fn media_type(path: &Path) -> Option<TrackType> {
    let guess = mime_guess::from_path(path).first()?;
    if guess.type_() == mime::AUDIO {
        Some(TrackType::Audio)
    } else if guess.type_() == mime::VIDEO {
        Some(TrackType::Video)
    } else {
        None
    }
}

pub(crate) fn parse_path(
    path: &str,
    patterns: &[Regex],
    is_compilation_artist: impl Fn(&str) -> bool,
) -> Result<Metadata, MetadataError> {
    let fail = |reason: &str| MetadataError::PathParsing {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let track_type = media_type(Path::new(path)).ok_or_else(|| fail("not an audio or video file"))?;
    let captures = patterns
        .iter()
        .find_map(|pattern| pattern.captures(path))
        .ok_or_else(|| fail("no configured pattern matches"))?;

    let album_artist = group(&captures, "AlbumArtist");
    let artist = group(&captures, "Artist");
    let compilation = album_artist
        .iter()
        .chain(artist.iter())
        .any(|name| is_compilation_artist(name));

    let release_date = match group(&captures, "Year") {
        Some(year) => {
            let year: i32 = year.parse().map_err(|_| fail("year is not a number"))?;
            Some(
                Date::from_calendar_date(year, Month::January, 1)
                    .map_err(|_| fail("year is out of range"))?,
            )
        }
        None => None,
    };

    Ok(Metadata {
        compilation: Some(compilation),
        album_artist: if compilation { None } else { album_artist },
        artist,
        album: group(&captures, "Album"),
        release: group(&captures, "Release"),
        name: group(&captures, "Track"),
        featuring: Vec::new(),
        genres: group(&captures, "Genre").into_iter().collect(),
        release_date,
        index: number(&captures, "Index").map_err(|_| fail("track index is not a number"))?,
        disc_index: number(&captures, "Disc").map_err(|_| fail("disc index is not a number"))?,
        bitrate: None,
        duration: None,
        track_type: Some(track_type),
        discogs_id: group(&captures, "DiscogsId"),
    })
}

fn group(captures: &Captures<'_>, name: &str) -> Option<String> {
    let value = captures.name(name)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn number(captures: &Captures<'_>, name: &str) -> Result<Option<u32>, std::num::ParseIntError> {
    group(captures, name).map(|value| value.parse()).transpose()
}
