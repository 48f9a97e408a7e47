use serde::{Deserialize, Serialize};

/// Default layouts: `Artist/Album (Year)/1-02 Track (Featured).ext`, then the
/// same without the trailing artist, then without a year.
const DEFAULT_TRACK_REGEX: &[&str] = &[
    r"^([/\\]+.*)*[/\\]+(?P<AlbumArtist>.+)[/\\]+(?P<Album>.+)(\s+\((?P<Year>\d{4})\))[/\\]+((?P<Disc>[0-9]+)-)?(?P<Index>[0-9]+)\s+(?P<Track>.*)\s+\((?P<Artist>.*)\)\..*$",
    r"^([/\\]+.*)*[/\\]+(?P<AlbumArtist>.+)[/\\]+(?P<Album>.+)(\s+\((?P<Year>\d{4})\))[/\\]+((?P<Disc>[0-9]+)-)?(?P<Index>[0-9]+)\s+(?P<Track>.*)\..*$",
    r"^([/\\]+.*)*[/\\]+(?P<AlbumArtist>.+)[/\\]+(?P<Album>.+)[/\\]+((?P<Disc>[0-9]+)-)?(?P<Index>[0-9]+)\s+(?P<Track>.*)\..*$",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    pub track_regex: Vec<String>,
    pub compilations: CompilationSettings,
    pub metadata: MetadataSettings,
    pub genre_separators: Vec<char>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            track_regex: DEFAULT_TRACK_REGEX.iter().map(|re| re.to_string()).collect(),
            compilations: CompilationSettings::default(),
            metadata: MetadataSettings::default(),
            genre_separators: vec![';', ',', '\\'],
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationSettings {
    /// Album artist names that mark a compilation, compared case-insensitively.
    pub artists: Vec<String>,
    /// Trust the embedded compilation flag instead of matching `artists`.
    pub use_embedded_flag: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    pub source: MetadataSource,
    pub order: MetadataOrder,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    Path,
    #[default]
    File,
}

impl MetadataSource {
    pub fn other(self) -> Self {
        match self {
            MetadataSource::Path => MetadataSource::File,
            MetadataSource::File => MetadataSource::Path,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataOrder {
    Only,
    #[default]
    Preferred,
    PreferPath,
    PreferFile,
}

impl MetadataSettings {
    /// Primary source, and the secondary one if it should be merged in.
    pub fn plan(&self) -> (MetadataSource, Option<MetadataSource>) {
        match self.order {
            MetadataOrder::Only => (self.source, None),
            MetadataOrder::Preferred => (self.source, Some(self.source.other())),
            MetadataOrder::PreferPath => (MetadataSource::Path, Some(MetadataSource::File)),
            MetadataOrder::PreferFile => (MetadataSource::File, Some(MetadataSource::Path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_follows_order_and_source() {
        let only_path = MetadataSettings {
            source: MetadataSource::Path,
            order: MetadataOrder::Only,
        };
        assert_eq!(only_path.plan(), (MetadataSource::Path, None));

        let preferred_file = MetadataSettings::default();
        assert_eq!(
            preferred_file.plan(),
            (MetadataSource::File, Some(MetadataSource::Path))
        );

        let prefer_path = MetadataSettings {
            source: MetadataSource::File,
            order: MetadataOrder::PreferPath,
        };
        assert_eq!(
            prefer_path.plan(),
            (MetadataSource::Path, Some(MetadataSource::File))
        );
    }

    #[test]
    fn settings_deserialize_from_yaml() {
        let yaml = "track_regex: ['^(?P<Track>.*)$']\ncompilations:\n  artists: [Various Artists]\nmetadata:\n  source: path\n  order: prefer-file\n";
        let settings: ParserSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.track_regex, vec!["^(?P<Track>.*)$"]);
        assert_eq!(settings.compilations.artists, vec!["Various Artists"]);
        assert!(!settings.compilations.use_embedded_flag);
        assert_eq!(settings.metadata.source, MetadataSource::Path);
        assert_eq!(settings.metadata.order, MetadataOrder::PreferFile);
        assert_eq!(settings.genre_separators, vec![';', ',', '\\']);
    }
}
