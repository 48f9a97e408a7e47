use std::fs;
use std::io::{self, Read};
use std::path::Path;

use common::relpath_from;
use mime_guess::mime;
use tracing::debug;
use walkdir::WalkDir;

/// Disk access needed by the synchronizer.
pub trait FileSystem: Send + Sync {
    /// Sorted `/`-separated paths, relative to `root`, of every audio or
    /// video file under it.
    fn list_candidates(&self, root: &Path) -> io::Result<Vec<String>>;
    /// Hex digest of the file content.
    fn checksum(&self, path: &Path) -> io::Result<String>;
    fn exists(&self, path: &Path) -> bool;
    fn readable(&self, path: &Path) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn list_candidates(&self, root: &Path) -> io::Result<Vec<String>> {
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("library root is not a directory: {}", root.display()),
            ));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            match media_kind(path) {
                MediaKind::Media => {}
                MediaKind::Image => continue,
                MediaKind::Other => {
                    debug!("Skipping non-media file {:?}", path);
                    continue;
                }
            }
            if let Some(relpath) = relpath_from(root, path) {
                paths.push(relpath);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn checksum(&self, path: &Path) -> io::Result<String> {
        let mut file = fs::File::open(path)?;
        let mut hasher = blake3::Hasher::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let read = file.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(hasher.finalize().to_hex().to_string())
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn readable(&self, path: &Path) -> bool {
        fs::File::open(path).is_ok()
    }
}

enum MediaKind {
    Media,
    Image,
    Other,
}

fn media_kind(path: &Path) -> MediaKind {
    match mime_guess::from_path(path).first() {
        Some(guess) if guess.type_() == mime::AUDIO || guess.type_() == mime::VIDEO => {
            MediaKind::Media
        }
        Some(guess) if guess.type_() == mime::IMAGE => MediaKind::Image,
        _ => MediaKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_media_files_sorted_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        let album = dir.path().join("Artist").join("Album (2001)");
        fs::create_dir_all(&album).unwrap();
        fs::write(album.join("02 B.mp3"), b"b").unwrap();
        fs::write(album.join("01 A.flac"), b"a").unwrap();
        fs::write(album.join("cover.jpg"), b"img").unwrap();
        fs::write(album.join("notes.txt"), b"txt").unwrap();
        fs::write(dir.path().join("clip.mp4"), b"v").unwrap();

        let paths = LocalFileSystem.list_candidates(dir.path()).unwrap();
        assert_eq!(
            paths,
            vec![
                "Artist/Album (2001)/01 A.flac",
                "Artist/Album (2001)/02 B.mp3",
                "clip.mp4",
            ]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalFileSystem
            .list_candidates(&dir.path().join("missing"))
            .is_err());
    }

    #[test]
    fn checksum_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        fs::write(&path, b"one").unwrap();
        let first = LocalFileSystem.checksum(&path).unwrap();
        assert_eq!(first, blake3::hash(b"one").to_hex().to_string());
        fs::write(&path, b"two").unwrap();
        assert_ne!(LocalFileSystem.checksum(&path).unwrap(), first);

        assert!(LocalFileSystem.exists(&path));
        assert!(LocalFileSystem.readable(&path));
        assert!(!LocalFileSystem.exists(&dir.path().join("b.mp3")));
    }
}
