use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use time::Date;

mod slug;

pub use slug::{Slug, COMPILATION_KEYWORD};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: u64,
    pub library_id: u64,
    /// Relative to the library root, `/`-separated.
    pub path: String,
    pub checksum: String,
    pub register_date: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub register_date: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongGroup {
    pub id: u64,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub artist_id: u64,
    pub group_id: u64,
    pub featuring_ids: Vec<u64>,
    pub genre_ids: Vec<u64>,
    pub song_type: SongType,
    pub master_id: Option<u64>,
    pub register_date: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: u64,
    pub name: String,
    pub slug: String,
    /// `None` for compilations.
    pub artist_id: Option<u64>,
    pub album_type: AlbumType,
    pub master_id: Option<u64>,
    pub register_date: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub album_id: u64,
    pub release_date: Option<Date>,
    pub extensions: Vec<String>,
    pub label_id: Option<u64>,
    pub discogs_id: Option<String>,
    pub register_date: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: u64,
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
    pub register_date: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackType {
    Audio,
    Video,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlbumType {
    #[default]
    StudioRecording,
    LiveRecording,
    Compilation,
    Soundtrack,
    RemixAlbum,
    VideoAlbum,
    Single,
    EP,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SongType {
    #[default]
    Original,
    Live,
    Acoustic,
    Remix,
    Demo,
    Clean,
    Edit,
    Instrumental,
    Acappella,
    Medley,
    NonMusic,
}

/// Either a numeric id or a slug, as accepted by `:idOrSlug` routes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identifier {
    Id(u64),
    Slug(String),
}

impl Identifier {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            if let Ok(id) = trimmed.parse() {
                return Identifier::Id(id);
            }
        }
        Identifier::Slug(trimmed.to_string())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "{}", id),
            Identifier::Slug(slug) => write!(f, "{}", slug),
        }
    }
}

pub fn relpath_from(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(path_to_slash_string(rel))
}

pub fn join_relpath(root: &Path, relpath: &str) -> PathBuf {
    let mut out = PathBuf::from(root);
    for part in relpath.split('/') {
        if part.is_empty() {
            continue;
        }
        out.push(part);
    }
    out
}

fn path_to_slash_string(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_parses_ids_and_slugs() {
        assert_eq!(Identifier::parse("42"), Identifier::Id(42));
        assert_eq!(
            Identifier::parse("my-library"),
            Identifier::Slug("my-library".to_string())
        );
        assert_eq!(
            Identifier::parse("2pac"),
            Identifier::Slug("2pac".to_string())
        );
    }

    #[test]
    fn relpath_round_trips_through_join() {
        let root = Path::new("/data/music");
        let full = join_relpath(root, "Artist/Album/01 Track.flac");
        assert_eq!(full, PathBuf::from("/data/music/Artist/Album/01 Track.flac"));
        assert_eq!(
            relpath_from(root, &full).as_deref(),
            Some("Artist/Album/01 Track.flac")
        );
        assert_eq!(relpath_from(Path::new("/elsewhere"), &full), None);
    }
}
