use std::path::Path;

use common::{Song, Track};

/// Illustration extraction that runs in the background once a track is
/// registered. Implementations must return without waiting for the work.
pub trait IllustrationTrigger: Send + Sync {
    fn extract_track_illustration(&self, track: &Track, source: &Path);
    fn take_video_screenshot(&self, track: &Track, source: &Path);
}

/// Lyrics lookup that runs in the background once a song gains a track.
pub trait LyricsTrigger: Send + Sync {
    fn register_lyrics(&self, song: &Song, source: &Path, force: bool);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTriggers;

impl IllustrationTrigger for NoopTriggers {
    fn extract_track_illustration(&self, _track: &Track, _source: &Path) {}

    fn take_video_screenshot(&self, _track: &Track, _source: &Path) {}
}

impl LyricsTrigger for NoopTriggers {
    fn register_lyrics(&self, _song: &Song, _source: &Path, _force: bool) {}
}
