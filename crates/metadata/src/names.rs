use common::{AlbumType, SongType};
use regex::Regex;

use crate::MetadataError;

const RELEASE_KEYWORDS: &[&str] = &[
    "Reissue",
    "Deluxe",
    "Standard",
    "Edited",
    "Explicit",
    "Remastered",
    "Remaster",
    "Edition",
    "Version",
    "Vinyl",
    "Pressing",
];

const TRACK_KEYWORDS: &[&str] = &[
    "Bonus Track",
    "Video",
    "Remastered",
    "Remaster",
    "Album Version",
    "Album Mix",
    "Main Version",
    "Mixed",
    "Mixed Version",
];

const TRACK_KEYWORDS_KEPT: &[&str] = &[
    "Live",
    "Extended",
    "Instrumental",
    "Edit",
    "Video Mix",
    "Video Remix",
];

const BRACKETS: &[(char, char)] = &[('(', ')'), ('[', ']'), ('{', '}')];

/// Resolves a raw artist name to an artist that is already known, so that
/// names like "Simon & Garfunkel" are not split into two artists.
pub trait ArtistLookup {
    fn find_artist(&self, name: &str) -> Option<String>;
}

pub struct NoArtistLookup;

impl ArtistLookup for NoArtistLookup {
    fn find_artist(&self, _name: &str) -> Option<String> {
        None
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackExtensions {
    pub parsed_name: String,
    pub bonus: bool,
    pub remastered: bool,
    pub mixed: bool,
    pub main: bool,
    pub video: bool,
}

/// Splits names on `()`, `[]`, `{}` and ` - ` groups and interprets them.
pub struct NameParser {
    dash_group: Regex,
    dash_start: Regex,
    feat_wrapped: Regex,
    feat_bare: Regex,
    comma: Regex,
    ampersand: Regex,
    versus: Regex,
}

impl NameParser {
    pub fn new() -> Result<Self, MetadataError> {
        Ok(Self {
            dash_group: compile(r"\s+-\s+.")?,
            dash_start: compile(r"^\s+-\s+")?,
            feat_wrapped: compile(r"(?i)(^with|feat(uring|\.)?)\s+(?P<artists>.*)$")?,
            feat_bare: compile(r"(?i)\bfeat(uring|\.)?\s+(?P<artists>.*)$")?,
            comma: compile(r"\s*,\s*")?,
            ampersand: compile(r"\s+&\s+")?,
            versus: compile(r"(?i)\s+vs\.?\s+")?,
        })
    }

    /// `"My Album (a) [b] {c}"` gives `["My Album", "a", "b", "c"]`.
    pub fn split_groups(&self, name: &str, keep_delimiters: bool, remove_root: bool) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut rest = name.to_string();

        for group in self.groups(name).0 {
            let offset = match rest.find(&group) {
                Some(offset) => offset,
                None => continue,
            };
            let root = rest[..offset].trim().to_string();
            let (start, inner, end) = self.strip_group_delimiters(&group);
            let mut sub_groups = self.split_groups(&inner, true, false);
            merge_dashed(&mut sub_groups);

            if !root.is_empty() && !remove_root {
                tokens.push(root);
            }
            if keep_delimiters {
                let first = sub_groups.first().cloned().unwrap_or_default();
                tokens.push(format!("{}{}{}", start, first, end));
                tokens.extend(sub_groups.into_iter().skip(1));
            } else {
                for sub_group in sub_groups {
                    let sub_group = if sub_group.starts_with("- ") {
                        format!(" {}", sub_group)
                    } else {
                        sub_group
                    };
                    tokens.push(self.strip_group_delimiters(&sub_group).1);
                }
            }
            rest = rest[offset + group.len()..].to_string();
        }

        let rest = rest.trim();
        if !rest.is_empty() && !remove_root {
            tokens.push(rest.to_string());
        }
        tokens
    }

    /// Returns `(opening, content, closing)`. Ungrouped text comes back with
    /// empty delimiters.
    pub fn strip_group_delimiters(&self, group: &str) -> (String, String, String) {
        let trimmed = group.trim();
        for (open, close) in BRACKETS {
            if trimmed.starts_with(*open) && trimmed.ends_with(*close) && trimmed.len() > 1 {
                let inner = &trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()];
                return (open.to_string(), inner.trim().to_string(), close.to_string());
            }
        }
        if let Some(found) = self.dash_start.find(group) {
            let inner = group[found.end()..].trim().to_string();
            return ("- ".to_string(), inner, String::new());
        }
        (String::new(), group.to_string(), String::new())
    }

    /// Removes every group, leaving the root of the name.
    pub fn strip_groups(&self, name: &str) -> String {
        self.groups(name).1
    }

    /// `"A (feat. B)"` gives `("A", ["B"])`.
    pub fn extract_featured_from_song_name(
        &self,
        name: &str,
        lookup: &dyn ArtistLookup,
    ) -> (String, Vec<String>) {
        let mut kept: Vec<String> = Vec::new();
        let mut featuring = Vec::new();

        for group in self.split_groups(name, true, false) {
            let (open, close) = match kept.len() {
                0 | 1 => ("(", ")"),
                2 => ("[", "]"),
                _ => ("{", "}"),
            };
            let (start, inner, end) = self.strip_group_delimiters(&group);
            let ungrouped = start.is_empty() && end.is_empty();
            let pattern = if ungrouped {
                &self.feat_bare
            } else {
                &self.feat_wrapped
            };

            let captures = match pattern.captures(&inner) {
                Some(captures) => captures,
                None => {
                    if ungrouped {
                        kept.push(group);
                    } else {
                        kept.push(format!("{}{}{}", open, inner, close));
                    }
                    continue;
                }
            };

            let whole = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
            let artists = captures
                .name("artists")
                .map(|m| m.as_str())
                .unwrap_or_default();
            let (artist, nested) = self.extract_featured_from_artist_name(artists, lookup);
            let remainder = inner.replacen(whole, "", 1).trim().to_string();
            if !remainder.is_empty() {
                if !start.is_empty() && !end.is_empty() {
                    kept.push(format!("{}{}{}", start, remainder, end));
                } else {
                    kept.push(remainder);
                }
            }
            featuring.push(artist);
            featuring.extend(nested);
        }

        (kept.join(" "), featuring)
    }

    /// `"A & B"` gives `("A", ["B"])`, unless "A & B" is an artist `lookup`
    /// already knows.
    pub fn extract_featured_from_artist_name(
        &self,
        name: &str,
        lookup: &dyn ArtistLookup,
    ) -> (String, Vec<String>) {
        if let Some(known) = lookup.find_artist(name) {
            return (known, Vec::new());
        }

        let mut names = Vec::new();
        for part in self.comma.split(name) {
            let pieces: Vec<&str> = self
                .ampersand
                .split(part)
                .flat_map(|piece| self.versus.split(piece))
                .collect();
            match pieces.split_first() {
                Some((head, tail)) if !tail.is_empty() => {
                    let (artist, nested) =
                        self.extract_featured_from_artist_name(&tail.join(" & "), lookup);
                    names.push(head.trim().to_string());
                    names.push(artist);
                    names.extend(nested);
                }
                _ => names.push(part.trim().to_string()),
            }
        }

        let mut names = names.into_iter();
        let main = names.next().unwrap_or_default();
        let (artist, mut featuring) = self.extract_featured_from_song_name(&main, lookup);
        featuring.extend(names);
        (artist, featuring)
    }

    /// `"My Album (Deluxe Edition)"` gives `("My Album", ["Deluxe Edition"])`.
    pub fn parse_release_extension(&self, name: &str) -> (String, Vec<String>) {
        let mut parsed = name.to_string();
        for keyword in RELEASE_KEYWORDS {
            parsed = self.remove_extensions(&parsed, keyword, &[]);
        }
        let extensions = self
            .split_groups(name, false, true)
            .into_iter()
            .filter(|group| RELEASE_KEYWORDS.iter().any(|kw| contains_ci(group, kw)))
            .collect();
        (parsed, extensions)
    }

    pub fn parse_track_extensions(&self, name: &str) -> TrackExtensions {
        let mut parsed = name.to_string();
        let mut found: Vec<&str> = Vec::new();
        for keyword in TRACK_KEYWORDS {
            let stripped = self.remove_extensions(&parsed, keyword, TRACK_KEYWORDS_KEPT);
            if stripped != parsed {
                found.push(keyword);
            }
            parsed = stripped;
        }
        let has = |keyword: &str| found.contains(&keyword);
        TrackExtensions {
            parsed_name: parsed,
            bonus: has("Bonus Track"),
            remastered: has("Remaster") || has("Remastered"),
            mixed: has("Mixed"),
            main: has("Album Version") || has("Main Version") || has("Album Mix"),
            video: has("Video"),
        }
    }

    pub fn song_type_from_name(&self, name: &str) -> SongType {
        let title = name.to_lowercase();
        let extensions = self.split_groups(name, false, true);
        let joint = extensions
            .iter()
            .map(|ext| ext.to_lowercase())
            .filter(|ext| !(ext.starts_with("feat ") || ext.starts_with("feat. ") || ext.starts_with("featuring ")))
            .collect::<Vec<_>>()
            .join(" ");
        let words: Vec<&str> = joint.split(' ').collect();
        let word = |w: &str| words.contains(&w);
        let in_title = |needles: &[&str]| needles.iter().any(|n| title.contains(n));

        if in_title(&[
            "interview",
            "advert",
            "documentary",
            "documentaire",
            "photo gallery",
            "photo shoot",
            "photoshoot",
            "behind the scene",
            "behind-the-scene",
            "making of",
            "epk",
            "voice memo",
        ]) {
            return SongType::NonMusic;
        }
        let medley = in_title(&["megamix", "mega-mix", "mashup", "mash-up", "medley"]);
        if extensions.is_empty() {
            return if medley { SongType::Medley } else { SongType::Original };
        }
        if word("live") || word("performance") {
            return SongType::Live;
        }
        if medley {
            return SongType::Medley;
        }
        if word("acoustic") {
            return SongType::Acoustic;
        }
        if word("remix") || word("dub") || word("extended") || word("vocal") {
            return SongType::Remix;
        }
        if word("demo") || joint.contains("alternative mix") || joint.contains("rough mix") {
            return SongType::Demo;
        }
        if word("clean") {
            return SongType::Clean;
        }
        if joint == "original mix" {
            return SongType::Original;
        }
        if word("mix") && word("edit") {
            return SongType::Remix;
        }
        if word("edit") {
            return SongType::Edit;
        }
        if joint.contains("instrumental mix") {
            return SongType::Instrumental;
        }
        if joint.contains("mix") {
            return SongType::Remix;
        }
        if word("instrumental") || word("instrumentale") {
            return SongType::Instrumental;
        }
        if word("single") || word("radio") {
            return SongType::Edit;
        }
        if words.last() == Some(&"beats") {
            return SongType::Remix;
        }
        if word("acapella") || word("acappella") || title.contains("a cappella") {
            return SongType::Acappella;
        }
        if joint.contains("album version") || joint.contains("main version") {
            return SongType::Original;
        }
        if word("version") {
            return SongType::Remix;
        }
        SongType::Original
    }

    pub fn album_type_from_name(&self, name: &str) -> AlbumType {
        let name = name.to_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| name.contains(n));
        let words: Vec<&str> = name.split(' ').collect();

        if any(&[
            "soundtrack",
            "original score",
            "from the motion picture",
            "bande originale",
            "music from and inspired by",
        ]) {
            return AlbumType::Soundtrack;
        }
        if any(&["music videos", "the video", "dvd", "videos"]) {
            return AlbumType::VideoAlbum;
        }
        if words.contains(&"live")
            || any(&["(live)", "[live]", "unplugged", " tour", "live from ", "live at "])
        {
            return AlbumType::LiveRecording;
        }
        if name.ends_with("- ep") {
            return AlbumType::EP;
        }
        if name.ends_with("- single") || name.ends_with("(remixes)") {
            return AlbumType::Single;
        }
        if any(&["remix album", "mixes", "remixed"]) {
            return AlbumType::RemixAlbum;
        }
        if any(&["best of", "hits", "singles", "collection"]) {
            return AlbumType::Compilation;
        }
        AlbumType::StudioRecording
    }

    fn remove_extensions(&self, source: &str, keyword: &str, kept: &[&str]) -> String {
        self.split_groups(source, true, false)
            .into_iter()
            .filter(|group| {
                if *group == self.strip_group_delimiters(group).1 {
                    return true;
                }
                if kept.iter().any(|kw| contains_ci(group, kw)) {
                    return true;
                }
                !contains_ci(group, keyword)
            })
            .map(|group| group.trim().to_string())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }

    /// Top-level groups in order, plus whatever is left once they are removed.
    fn groups(&self, name: &str) -> (Vec<String>, String) {
        let mut groups = Vec::new();
        let mut stripped = name.to_string();
        while let Some((start, end)) = self.first_group(&stripped) {
            groups.push(stripped[start..end].to_string());
            let cut = stripped[..start].trim_end().len();
            stripped = format!("{}{}", &stripped[..cut], &stripped[end..])
                .trim()
                .to_string();
        }
        (groups, stripped)
    }

    fn first_group(&self, name: &str) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        let mut consider = |candidate: Option<(usize, usize)>| {
            if let Some(found) = candidate {
                if best.map_or(true, |current| found.0 < current.0) {
                    best = Some(found);
                }
            }
        };
        for (open, close) in BRACKETS {
            consider(bracket_group(name, *open, *close));
        }
        consider(self.dash_group.find(name).map(|m| (m.start(), name.len())));
        best
    }
}

fn bracket_group(name: &str, open: char, close: char) -> Option<(usize, usize)> {
    let mut start = None;
    let mut depth = 0usize;
    for (idx, ch) in name.char_indices() {
        if ch == open && idx + ch.len_utf8() < name.len() {
            if start.is_none() {
                start = Some(idx);
            }
            depth += 1;
        } else if ch == close {
            if let Some(begin) = start {
                depth -= 1;
                if depth == 0 {
                    return Some((begin, idx + ch.len_utf8()));
                }
            }
        }
    }
    None
}

fn merge_dashed(groups: &mut Vec<String>) {
    let mut idx = 1;
    while idx < groups.len() {
        if groups[idx].starts_with("- ") {
            let dashed = groups.remove(idx);
            let previous = &mut groups[idx - 1];
            previous.push(' ');
            previous.push_str(&dashed);
        } else {
            idx += 1;
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub(crate) fn compile(pattern: &str) -> Result<Regex, MetadataError> {
    Regex::new(pattern).map_err(|err| MetadataError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}
