use std::path::Path;

use common::COMPILATION_KEYWORD;
use regex::Regex;
use tracing::{debug, warn};

use crate::embedded::{self, EmbeddedOptions};
use crate::names::{compile, NameParser};
use crate::path::parse_path;
use crate::settings::{MetadataSource, ParserSettings};
use crate::validate::sanitize_and_validate;
use crate::{merge, Metadata, MetadataError};

/// Extracts metadata from paths and embedded tags using one set of
/// compiled settings.
pub struct MetadataParser {
    settings: ParserSettings,
    track_regex: Vec<Regex>,
    compilation_aliases: Vec<String>,
    names: NameParser,
}

impl MetadataParser {
    pub fn new(settings: ParserSettings) -> Result<Self, MetadataError> {
        let track_regex = settings
            .track_regex
            .iter()
            .map(|pattern| compile(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let mut compilation_aliases: Vec<String> = settings
            .compilations
            .artists
            .iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        if !compilation_aliases.iter().any(|alias| alias == COMPILATION_KEYWORD) {
            compilation_aliases.push(COMPILATION_KEYWORD.to_string());
        }

        Ok(Self {
            settings,
            track_regex,
            compilation_aliases,
            names: NameParser::new()?,
        })
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    pub fn names(&self) -> &NameParser {
        &self.names
    }

    pub fn is_compilation_artist(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.compilation_aliases.iter().any(|alias| *alias == name)
    }

    pub fn parse_from_path(&self, path: &str) -> Result<Metadata, MetadataError> {
        parse_path(path, &self.track_regex, |name| self.is_compilation_artist(name))
    }

    pub fn parse_from_file(&self, path: &Path) -> Result<Metadata, MetadataError> {
        let options = EmbeddedOptions {
            use_embedded_flag: self.settings.compilations.use_embedded_flag,
            separators: &self.settings.genre_separators,
        };
        embedded::parse_file(path, &options, |name| self.is_compilation_artist(name))
    }

    /// Parses the configured sources, merges them and validates the result.
    pub fn parse_metadata(&self, path: &Path) -> Result<Metadata, MetadataError> {
        let (primary, secondary) = self.settings.metadata.plan();
        let mut metadata = self.parse_source(primary, path)?;

        if let Some(secondary) = secondary {
            match self.parse_source(secondary, path) {
                Ok(extra) => metadata = merge(metadata, extra),
                Err(err) => {
                    warn!("Secondary metadata source failed for {:?}: {}", path, err);
                }
            }
        }

        debug!("Parsed metadata of {:?}", path);
        sanitize_and_validate(metadata)
    }

    fn parse_source(&self, source: MetadataSource, path: &Path) -> Result<Metadata, MetadataError> {
        match source {
            MetadataSource::Path => self.parse_from_path(&path.to_string_lossy()),
            MetadataSource::File => self.parse_from_file(path),
        }
    }
}
