use std::fs;
use std::path::Path;

use lofty::config::WriteOptions;
use lofty::prelude::{ItemKey, TagExt};
use lofty::tag::{Tag, TagType};

/// One second of 8 kHz mono 16-bit silence.
pub fn write_wav(path: &Path) {
    let sample_rate: u32 = 8000;
    let byte_rate = sample_rate * 2;
    let data_len = byte_rate;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

/// A WAV file carrying an ID3v2 tag with `items`.
pub fn write_tagged_wav(path: &Path, items: &[(ItemKey, &str)]) {
    write_wav(path);
    let mut tag = Tag::new(TagType::Id3v2);
    for (key, value) in items {
        tag.insert_text(key.clone(), value.to_string());
    }
    tag.save_to_path(path, WriteOptions::default()).unwrap();
}
