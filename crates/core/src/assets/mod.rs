use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Target dimensions, in character cells, of a pre-rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: usize,
    pub height: usize,
}

impl FrameSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(32, 32)
    }
}

/// Immutable, pre-rendered frame. Cloning only bumps a reference count.
#[derive(Clone)]
pub struct FrameAsset {
    inner: Arc<FrameData>,
}

struct FrameData {
    label: String,
    rows: Vec<String>,
}

impl FrameAsset {
    pub fn new(label: impl Into<String>, rows: Vec<String>) -> Self {
        Self {
            inner: Arc::new(FrameData {
                label: label.into(),
                rows,
            }),
        }
    }

    /// Builds a frame from multi-line text, cropped to `size`.
    pub fn from_text(label: impl Into<String>, text: &str, size: FrameSize) -> Self {
        let rows = text
            .lines()
            .take(size.height)
            .map(|line| line.chars().take(size.width).collect())
            .collect();
        Self::new(label, rows)
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn rows(&self) -> &[String] {
        &self.inner.rows
    }

    /// Returns true when both handles point at the same frame.
    pub fn same_frame(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for FrameAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameAsset")
            .field("label", &self.inner.label)
            .field("rows", &self.inner.rows.len())
            .finish()
    }
}

/// Produces the ordered frame sequence of a track.
pub trait AssetSource {
    fn load(&self, path: &Path, size: FrameSize) -> Result<Vec<FrameAsset>>;
}

/// Loads every frame file of a directory, ordered by file name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    extensions: Vec<String>,
}

impl Default for DirectorySource {
    fn default() -> Self {
        Self::with_extensions(["txt"])
    }
}

impl DirectorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.into().to_ascii_lowercase())
                .collect(),
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

impl AssetSource for DirectorySource {
    fn load(&self, path: &Path, size: FrameSize) -> Result<Vec<FrameAsset>> {
        if !path.exists() {
            tracing::warn!(?path, "frame directory does not exist, track will stay empty");
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file = entry.path();
            if file.is_file() && self.accepts(&file) {
                files.push(file);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut frames = Vec::with_capacity(files.len());
        for file in files {
            let text = fs::read_to_string(&file)?;
            let label = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            frames.push(FrameAsset::from_text(label, &text, size));
        }

        tracing::debug!(?path, frames = frames.len(), "loaded frame directory");
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("flipbook-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn crops_text_to_frame_size() {
        let frame = FrameAsset::from_text("f", "abcdef\nghijkl\nmnopqr", FrameSize::new(3, 2));
        assert_eq!(frame.rows(), ["abc", "ghi"]);
        assert_eq!(frame.label(), "f");
    }

    #[test]
    fn clones_share_the_same_frame() {
        let frame = FrameAsset::new("a", vec!["x".to_string()]);
        let copy = frame.clone();
        assert!(frame.same_frame(&copy));
        assert!(!frame.same_frame(&FrameAsset::new("a", vec!["x".to_string()])));
    }

    #[test]
    fn loads_matching_files_in_name_order() {
        let dir = scratch_dir("ordered");
        fs::write(dir.join("02.txt"), "two").unwrap();
        fs::write(dir.join("01.txt"), "one").unwrap();
        fs::write(dir.join("10.TXT"), "ten").unwrap();
        fs::write(dir.join("notes.md"), "ignored").unwrap();

        let frames = DirectorySource::new()
            .load(&dir, FrameSize::default())
            .unwrap();
        let labels: Vec<&str> = frames.iter().map(FrameAsset::label).collect();
        assert_eq!(labels, ["01.txt", "02.txt", "10.TXT"]);
        assert_eq!(frames[0].rows(), ["one"]);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_directory_yields_no_frames() {
        let dir = std::env::temp_dir().join("flipbook-definitely-missing-dir");
        let frames = DirectorySource::new()
            .load(&dir, FrameSize::default())
            .unwrap();
        assert!(frames.is_empty());
    }
}
