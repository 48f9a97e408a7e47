use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{join_relpath, File, Library, Track, TrackType};
use metadata::{MetadataError, MetadataParser};
use tracing::{debug, info, warn};

use crate::filesystem::FileSystem;
use crate::hooks::{IllustrationTrigger, LyricsTrigger};
use crate::resolver::Resolver;
use crate::{Catalog, CatalogError, RegistrationError};

/// Keeps the catalog in line with what is on disk for one library at a
/// time. Files are processed one after the other, in listing order.
#[derive(Clone)]
pub struct Synchronizer {
    catalog: Arc<Catalog>,
    parser: Arc<MetadataParser>,
    fs: Arc<dyn FileSystem>,
    illustrations: Arc<dyn IllustrationTrigger>,
    lyrics: Arc<dyn LyricsTrigger>,
}

impl Synchronizer {
    pub fn new(
        catalog: Arc<Catalog>,
        parser: Arc<MetadataParser>,
        fs: Arc<dyn FileSystem>,
        illustrations: Arc<dyn IllustrationTrigger>,
        lyrics: Arc<dyn LyricsTrigger>,
    ) -> Self {
        Self {
            catalog,
            parser,
            fs,
            illustrations,
            lyrics,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Registers every candidate the library does not know yet. A file that
    /// fails is logged and skipped.
    pub fn register_new_files(&self, library: &Library) -> Result<Vec<File>, CatalogError> {
        let root = Path::new(&library.path);
        let candidates = self.fs.list_candidates(root)?;
        let known: HashSet<String> = self
            .catalog
            .list_files(library.id)?
            .into_iter()
            .map(|file| file.path)
            .collect();

        let mut registered = Vec::new();
        for relpath in candidates.into_iter().filter(|path| !known.contains(path)) {
            match self.register_file(&relpath, library) {
                Ok((file, _track)) => registered.push(file),
                Err(err) => {
                    warn!("Failed to register {} in {}: {}", relpath, library.slug, err);
                }
            }
        }

        info!("Registered {} new files in {}", registered.len(), library.slug);
        Ok(registered)
    }

    /// Parses, stores and resolves one file. When resolution fails the file
    /// row is removed again, so the path stays a candidate.
    pub fn register_file(
        &self,
        relpath: &str,
        library: &Library,
    ) -> Result<(File, Track), RegistrationError> {
        let full_path = self.full_path(library, relpath);
        if !self.fs.exists(&full_path) {
            return Err(MetadataError::FileNotFound(full_path).into());
        }
        if !self.fs.readable(&full_path) {
            return Err(MetadataError::FileNotReadable(full_path).into());
        }

        let metadata = self.parser.parse_metadata(&full_path)?;
        let checksum = self
            .fs
            .checksum(&full_path)
            .map_err(|err| RegistrationError::Catalog(CatalogError::Io(err)))?;
        let file = self.catalog.create_file(library.id, relpath, &checksum)?;

        let resolver = Resolver::new(&self.catalog, self.parser.names());
        let resolved = match resolver.resolve(&metadata, &file, false) {
            Ok(resolved) => resolved,
            Err(err) => {
                if let Err(cleanup) = self.catalog.delete_file(file.id) {
                    warn!("Failed to roll back {}: {}", relpath, cleanup);
                }
                return Err(err);
            }
        };

        self.illustrations
            .extract_track_illustration(&resolved.track, &full_path);
        if resolved.track.track_type == TrackType::Video {
            self.illustrations
                .take_video_screenshot(&resolved.track, &full_path);
        }
        self.lyrics
            .register_lyrics(&resolved.song, &full_path, false);

        debug!("Registered {} in {} as track {}", relpath, library.slug, resolved.track.id);
        Ok((file, resolved.track))
    }

    /// Deletes every registered file that is gone from disk, with its track.
    pub fn unregister_unavailable_files(
        &self,
        library: &Library,
    ) -> Result<Vec<File>, CatalogError> {
        let mut removed = Vec::new();
        for file in self.catalog.list_files(library.id)? {
            if self.fs.exists(&self.full_path(library, &file.path)) {
                continue;
            }
            match self.unregister_file(file.id) {
                Ok(()) => removed.push(file),
                Err(err) => {
                    warn!("Failed to unregister {} in {}: {}", file.path, library.slug, err);
                }
            }
        }

        info!("Removed {} unavailable files from {}", removed.len(), library.slug);
        Ok(removed)
    }

    /// Re-registers files whose content changed, or every file with `force`.
    /// Returns the files that were registered again.
    pub fn resync_all_metadata(
        &self,
        library: &Library,
        force: bool,
    ) -> Result<Vec<File>, CatalogError> {
        let mut refreshed = Vec::new();
        for file in self.catalog.list_files(library.id)? {
            let full_path = self.full_path(library, &file.path);
            let changed = match self.fs.checksum(&full_path) {
                Ok(checksum) => checksum != file.checksum,
                Err(err) => {
                    debug!("Checksum failed for {}: {}", file.path, err);
                    true
                }
            };
            if !changed && !force {
                continue;
            }

            if let Err(err) = self.unregister_file(file.id) {
                warn!("Failed to unregister {} in {}: {}", file.path, library.slug, err);
                continue;
            }
            match self.register_file(&file.path, library) {
                Ok((file, _track)) => refreshed.push(file),
                Err(err) => {
                    warn!("Failed to re-register {} in {}: {}", file.path, library.slug, err);
                }
            }
        }

        info!("Refreshed metadata of {} files in {}", refreshed.len(), library.slug);
        Ok(refreshed)
    }

    pub fn unregister_file(&self, file_id: u64) -> Result<(), CatalogError> {
        self.catalog.delete_track_by_file(file_id)?;
        self.catalog.delete_file(file_id)?;
        Ok(())
    }

    fn full_path(&self, library: &Library, relpath: &str) -> PathBuf {
        join_relpath(Path::new(&library.path), relpath)
    }
}
