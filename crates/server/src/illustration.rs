use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use common::{Track, TrackType};
use library::IllustrationTrigger;
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::utils::image_ext_from_mime;

const FOLDER_COVERS: [&str; 6] = [
    "cover.jpg",
    "cover.png",
    "folder.jpg",
    "folder.png",
    "front.jpg",
    "front.png",
];

/// Writes track illustrations under `<metadata_root>/tracks/<track_id>/`.
#[derive(Clone)]
pub struct IllustrationWriter {
    metadata_root: PathBuf,
    ffmpeg_path: String,
    handle: Handle,
}

impl IllustrationWriter {
    pub fn new(metadata_root: PathBuf, ffmpeg_path: String, handle: Handle) -> Self {
        Self {
            metadata_root,
            ffmpeg_path,
            handle,
        }
    }

    fn spawn_cover(&self, track_id: u64, source: &Path) -> JoinHandle<()> {
        let root = self.metadata_root.clone();
        let source = source.to_path_buf();
        self.handle.spawn(async move {
            match cover_task(root, track_id, source).await {
                Some(path) => debug!("Wrote cover of track {} to {:?}", track_id, path),
                None => debug!("No cover found for track {}", track_id),
            }
        })
    }

    /// A video gets a screenshot only when it has no cover of its own, so a
    /// single `cover.*` file is written per track.
    fn spawn_screenshot(&self, track_id: u64, source: &Path) -> JoinHandle<()> {
        let root = self.metadata_root.clone();
        let ffmpeg = self.ffmpeg_path.clone();
        let source = source.to_path_buf();
        self.handle.spawn(async move {
            if let Some(path) = cover_task(root.clone(), track_id, source.clone()).await {
                debug!("Wrote cover of video track {} to {:?}", track_id, path);
                return;
            }
            screenshot(&ffmpeg, &track_dir(&root, track_id), &source, track_id).await;
        })
    }
}

impl IllustrationTrigger for IllustrationWriter {
    fn extract_track_illustration(&self, track: &Track, source: &Path) {
        // Videos are handled by the screenshot request.
        if track.track_type == TrackType::Video {
            return;
        }
        self.spawn_cover(track.id, source);
    }

    fn take_video_screenshot(&self, track: &Track, source: &Path) {
        self.spawn_screenshot(track.id, source);
    }
}

async fn cover_task(root: PathBuf, track_id: u64, source: PathBuf) -> Option<PathBuf> {
    let result =
        tokio::task::spawn_blocking(move || write_track_cover(&root, track_id, &source)).await;
    match result {
        Ok(Ok(path)) => path,
        Ok(Err(err)) => {
            warn!("Cover extraction failed for track {}: {}", track_id, err);
            None
        }
        Err(err) => {
            warn!("Cover extraction task failed: {}", err);
            None
        }
    }
}

async fn screenshot(ffmpeg: &str, dir: &Path, source: &Path, track_id: u64) {
    if let Err(err) = tokio::fs::create_dir_all(dir).await {
        warn!("Failed to create {:?}: {}", dir, err);
        return;
    }
    let output = dir.join("cover.jpg");
    let status = Command::new(ffmpeg)
        .arg("-y")
        .arg("-ss")
        .arg("00:00:05")
        .arg("-i")
        .arg(source)
        .arg("-frames:v")
        .arg("1")
        .arg(&output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => {
            debug!("Wrote screenshot of track {} to {:?}", track_id, output)
        }
        Ok(status) => warn!("ffmpeg exited with {} for track {}", status, track_id),
        Err(err) => warn!("Failed to run {}: {}", ffmpeg, err),
    }
}

fn track_dir(root: &Path, track_id: u64) -> PathBuf {
    root.join("tracks").join(track_id.to_string())
}

/// Embedded picture first, then a cover image next to the file.
pub fn write_track_cover(
    root: &Path,
    track_id: u64,
    source: &Path,
) -> Result<Option<PathBuf>, std::io::Error> {
    let dir = track_dir(root, track_id);
    match metadata::read_cover(source) {
        Ok(Some(cover)) => {
            let ext = cover
                .mime
                .as_deref()
                .and_then(image_ext_from_mime)
                .unwrap_or("jpg");
            fs::create_dir_all(&dir)?;
            let target = dir.join(format!("cover.{}", ext));
            fs::write(&target, &cover.data)?;
            return Ok(Some(target));
        }
        Ok(None) => {}
        Err(err) => debug!("No embedded cover in {:?}: {}", source, err),
    }

    let folder = match source.parent() {
        Some(folder) => folder,
        None => return Ok(None),
    };
    for name in FOLDER_COVERS {
        let candidate = folder.join(name);
        if !candidate.is_file() {
            continue;
        }
        let ext = candidate
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg");
        fs::create_dir_all(&dir)?;
        let target = dir.join(format!("cover.{}", ext));
        fs::copy(&candidate, &target)?;
        return Ok(Some(target));
    }
    Ok(None)
}
