use std::path::PathBuf;

use common::TrackType;
use lofty::error::LoftyError;
use time::Date;

mod embedded;
mod names;
mod parser;
mod path;
mod settings;
mod validate;

#[cfg(test)]
pub(crate) mod test_support;

pub use embedded::{read_cover, read_lyrics, CoverArt};
pub use names::{ArtistLookup, NameParser, NoArtistLookup, TrackExtensions};
pub use parser::MetadataParser;
pub use settings::{
    CompilationSettings, MetadataOrder, MetadataSettings, MetadataSource, ParserSettings,
};
pub use validate::{sanitize_and_validate, validate};

/// Descriptive fields gathered for one media file. Every scalar stays `None`
/// until a source provides it, so that sources can be merged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    pub compilation: Option<bool>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub release: Option<String>,
    pub name: Option<String>,
    pub featuring: Vec<String>,
    pub genres: Vec<String>,
    pub release_date: Option<Date>,
    pub index: Option<u32>,
    pub disc_index: Option<u32>,
    /// Kilobits per second.
    pub bitrate: Option<f64>,
    /// Seconds.
    pub duration: Option<f64>,
    pub track_type: Option<TrackType>,
    pub discogs_id: Option<String>,
}

impl Metadata {
    pub fn is_compilation(&self) -> bool {
        self.compilation.unwrap_or(false)
    }
}

/// Field by field, `primary` wins. Lists are concatenated.
pub fn merge(primary: Metadata, secondary: Metadata) -> Metadata {
    let mut genres = primary.genres;
    genres.extend(secondary.genres);
    let mut featuring = primary.featuring;
    featuring.extend(secondary.featuring);

    Metadata {
        compilation: primary.compilation.or(secondary.compilation),
        artist: primary.artist.or(secondary.artist),
        album_artist: primary.album_artist.or(secondary.album_artist),
        album: primary.album.or(secondary.album),
        release: primary.release.or(secondary.release),
        name: primary.name.or(secondary.name),
        featuring,
        genres,
        release_date: primary.release_date.or(secondary.release_date),
        index: primary.index.or(secondary.index),
        disc_index: primary.disc_index.or(secondary.disc_index),
        bitrate: primary.bitrate.or(secondary.bitrate),
        duration: primary.duration.or(secondary.duration),
        track_type: primary.track_type.or(secondary.track_type),
        discogs_id: primary.discogs_id.or(secondary.discogs_id),
    }
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
    InvalidRegex { pattern: String, reason: String },
    FileNotFound(PathBuf),
    FileNotReadable(PathBuf),
    FileParsing { path: PathBuf, reason: String },
    PathParsing { path: String, reason: String },
    MissingMetadata(&'static str),
    BadMetadata(Vec<String>),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
            MetadataError::InvalidRegex { pattern, reason } => {
                write!(f, "invalid regex {:?}: {}", pattern, reason)
            }
            MetadataError::FileNotFound(path) => write!(f, "file not found: {}", path.display()),
            MetadataError::FileNotReadable(path) => {
                write!(f, "file not readable: {}", path.display())
            }
            MetadataError::FileParsing { path, reason } => {
                write!(f, "could not parse {}: {}", path.display(), reason)
            }
            MetadataError::PathParsing { path, reason } => {
                write!(f, "could not parse path {}: {}", path, reason)
            }
            MetadataError::MissingMetadata(field) => write!(f, "missing metadata field: {}", field),
            MetadataError::BadMetadata(violations) => {
                write!(f, "bad metadata: {}", violations.join("; "))
            }
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata {
            artist: Some("Path Artist".to_string()),
            name: Some("Path Name".to_string()),
            genres: vec!["Pop".to_string()],
            index: Some(3),
            ..Metadata::default()
        }
    }

    #[test]
    fn merge_keeps_primary_fields() {
        let secondary = Metadata {
            artist: Some("Tag Artist".to_string()),
            index: Some(9),
            ..Metadata::default()
        };
        let merged = merge(sample(), secondary);
        assert_eq!(merged.artist.as_deref(), Some("Path Artist"));
        assert_eq!(merged.index, Some(3));
    }

    #[test]
    fn merge_fills_missing_fields_from_secondary() {
        let secondary = Metadata {
            album: Some("Tag Album".to_string()),
            bitrate: Some(320.0),
            track_type: Some(TrackType::Audio),
            genres: vec!["Rock".to_string(), "Pop".to_string()],
            ..Metadata::default()
        };
        let merged = merge(sample(), secondary);
        assert_eq!(merged.album.as_deref(), Some("Tag Album"));
        assert_eq!(merged.bitrate, Some(320.0));
        assert_eq!(merged.track_type, Some(TrackType::Audio));
        assert_eq!(merged.genres, vec!["Pop", "Rock", "Pop"]);
    }
}
