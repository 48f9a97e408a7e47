use crate::{Metadata, MetadataError};

/// Fills the fields one source can stand in for, then rejects anything
/// that is still incomplete.
pub fn sanitize_and_validate(mut metadata: Metadata) -> Result<Metadata, MetadataError> {
    if metadata.album.is_none() {
        metadata.album = metadata.release.clone();
    }
    if metadata.release.is_none() {
        metadata.release = metadata.album.clone();
    }
    if metadata.artist.is_none() {
        metadata.artist = metadata.album_artist.clone();
    }
    if !metadata.is_compilation() && metadata.album_artist.is_none() && metadata.artist.is_none() {
        return Err(MetadataError::BadMetadata(vec![
            "missing field album artist / artist".to_string(),
        ]));
    }

    let violations = validate(&metadata);
    if violations.is_empty() {
        Ok(metadata)
    } else {
        Err(MetadataError::BadMetadata(violations))
    }
}

pub fn validate(metadata: &Metadata) -> Vec<String> {
    let mut violations = Vec::new();

    let required = [
        ("artist", &metadata.artist),
        ("album", &metadata.album),
        ("release", &metadata.release),
        ("name", &metadata.name),
    ];
    for (field, value) in required {
        match value.as_deref().map(str::trim) {
            None => violations.push(format!("{} is required", field)),
            Some("") => violations.push(format!("{} must not be blank", field)),
            Some(_) => {}
        }
    }

    if metadata.compilation.is_none() {
        violations.push("compilation is required".to_string());
    }
    if metadata.track_type.is_none() {
        violations.push("track type is required".to_string());
    }

    // Track 0 is a valid position, disc 0 is not.
    if metadata.disc_index == Some(0) {
        violations.push("disc index must be positive".to_string());
    }
    for (field, value) in [("bitrate", metadata.bitrate), ("duration", metadata.duration)] {
        if value.is_some_and(|value| value.is_nan() || value <= 0.0) {
            violations.push(format!("{} must be positive", field));
        }
    }

    if let Some(id) = metadata.discogs_id.as_deref() {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            violations.push("discogs id must be numeric".to_string());
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TrackType;

    fn complete() -> Metadata {
        Metadata {
            compilation: Some(false),
            artist: Some("Artist".to_string()),
            album_artist: Some("Artist".to_string()),
            album: Some("Album".to_string()),
            release: Some("Album".to_string()),
            name: Some("Song".to_string()),
            track_type: Some(TrackType::Audio),
            ..Metadata::default()
        }
    }

    #[test]
    fn complete_metadata_has_no_violations() {
        assert!(validate(&complete()).is_empty());
    }

    #[test]
    fn back_fills_album_release_and_artist() {
        let metadata = Metadata {
            artist: None,
            album: None,
            ..complete()
        };
        let sanitized = sanitize_and_validate(metadata).unwrap();
        assert_eq!(sanitized.album.as_deref(), Some("Album"));
        assert_eq!(sanitized.artist.as_deref(), Some("Artist"));

        let metadata = Metadata {
            release: None,
            ..complete()
        };
        let sanitized = sanitize_and_validate(metadata).unwrap();
        assert_eq!(sanitized.release.as_deref(), Some("Album"));
    }

    #[test]
    fn missing_artists_are_rejected() {
        let metadata = Metadata {
            artist: None,
            album_artist: None,
            ..complete()
        };
        match sanitize_and_validate(metadata) {
            Err(MetadataError::BadMetadata(violations)) => {
                assert_eq!(violations, vec!["missing field album artist / artist"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn every_violation_is_collected() {
        let metadata = Metadata {
            name: Some("  ".to_string()),
            track_type: None,
            index: Some(0),
            disc_index: Some(0),
            duration: Some(-1.0),
            discogs_id: Some("r123".to_string()),
            ..complete()
        };
        let violations = validate(&metadata);
        assert_eq!(
            violations,
            vec![
                "name must not be blank",
                "track type is required",
                "disc index must be positive",
                "duration must be positive",
                "discogs id must be numeric",
            ]
        );
    }

    #[test]
    fn track_index_zero_is_accepted() {
        let metadata = Metadata {
            index: Some(0),
            disc_index: Some(1),
            ..complete()
        };
        assert!(validate(&metadata).is_empty());
        assert_eq!(sanitize_and_validate(metadata).unwrap().index, Some(0));
    }
}
