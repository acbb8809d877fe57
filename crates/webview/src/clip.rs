//! Audio clips as the player receives them.

use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// An opaque audio payload, normally a `data:` URI the browser can play.
///
/// The controller never looks inside; it is forwarded to the player verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioClip(String);

impl AudioClip {
    /// Wrap an already-encoded payload.
    pub fn raw(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    /// Encode bytes as a base64 data URI with the given mime type.
    pub fn from_bytes(bytes: &[u8], mime: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self(format!("data:{};base64,{}", mime, encoded))
    }

    /// Read an audio file and encode it as a data URI.
    ///
    /// The container is picked from the extension. No transcoding happens,
    /// so the browser has to be able to play the file as-is.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mime = mime_for(path)
            .with_context(|| format!("Unsupported audio file type: {}", path.display()))?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read audio file {}", path.display()))?;
        Ok(Self::from_bytes(&bytes, mime))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "ogg" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "aac" => Some("audio/aac"),
        "m4a" => Some("audio/mp4"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_bytes() {
        let clip = AudioClip::from_bytes(b"RIFF", "audio/wav");
        assert_eq!(clip.as_str(), "data:audio/wav;base64,UklGRg==");
    }

    #[test]
    fn test_from_file_picks_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beep.MP3");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&[0xff, 0xfb])
            .unwrap();

        let clip = AudioClip::from_file(&path).unwrap();
        assert!(clip.as_str().starts_with("data:audio/mpeg;base64,"));
    }

    #[test]
    fn test_from_file_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hi").unwrap();

        assert!(AudioClip::from_file(&path).is_err());
    }

    #[test]
    fn test_from_file_missing() {
        assert!(AudioClip::from_file("/definitely/not/here.wav").is_err());
    }
}
