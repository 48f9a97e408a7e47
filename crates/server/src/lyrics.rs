use std::path::Path;
use std::sync::Arc;

use common::Song;
use library::{Catalog, LyricsTrigger};
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Stores the embedded lyrics of a file for its song.
#[derive(Clone)]
pub struct LyricsImporter {
    catalog: Arc<Catalog>,
    handle: Handle,
}

impl LyricsImporter {
    pub fn new(catalog: Arc<Catalog>, handle: Handle) -> Self {
        Self { catalog, handle }
    }
}

impl LyricsTrigger for LyricsImporter {
    fn register_lyrics(&self, song: &Song, source: &Path, force: bool) {
        let catalog = Arc::clone(&self.catalog);
        let song_id = song.id;
        let source = source.to_path_buf();
        self.handle.spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                import_lyrics(&catalog, song_id, &source, force)
            })
            .await;
            match result {
                Ok(Ok(true)) => debug!("Stored lyrics of song {}", song_id),
                Ok(Ok(false)) => {}
                Ok(Err(err)) => debug!("No lyrics imported for song {}: {}", song_id, err),
                Err(err) => warn!("Lyrics task failed: {}", err),
            }
        });
    }
}

/// Returns whether lyrics were written. Existing lyrics are kept unless
/// `force` is set.
pub fn import_lyrics(
    catalog: &Catalog,
    song_id: u64,
    source: &Path,
    force: bool,
) -> Result<bool, String> {
    if !force && catalog.get_lyrics(song_id).map_err(|err| err.to_string())?.is_some() {
        return Ok(false);
    }
    let text = match metadata::read_lyrics(source).map_err(|err| err.to_string())? {
        Some(text) => text,
        None => return Ok(false),
    };
    catalog
        .save_lyrics(song_id, &text, force)
        .map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_lyrics_are_kept_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&dir.path().join("index.redb")).unwrap();
        catalog.save_lyrics(3, "la la la", false).unwrap();

        let source = dir.path().join("missing.mp3");
        assert_eq!(import_lyrics(&catalog, 3, &source, false), Ok(false));
        assert!(import_lyrics(&catalog, 3, &source, true).is_err());
        assert_eq!(
            catalog.get_lyrics(3).unwrap().as_deref(),
            Some("la la la")
        );
    }
}
