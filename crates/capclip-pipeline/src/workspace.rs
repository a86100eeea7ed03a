//! Per-run scratch workspace.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use capclip_models::basename;

/// Scratch directory owned by one run; removed when dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under `parent`, or the system temp dir.
    ///
    /// Directory creation runs on the blocking pool.
    pub async fn create(parent: Option<&Path>) -> std::io::Result<Self> {
        let parent = parent.map(Path::to_path_buf);
        tokio::task::spawn_blocking(move || Self::create_blocking(parent.as_deref()))
            .await
            .map_err(std::io::Error::other)?
    }

    fn create_blocking(parent: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("capclip-");
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Local copy of the source video, keeping the source key's extension.
    pub fn source_path(&self, source_key: &str) -> PathBuf {
        self.dir.path().join(format!("input.{}", extension_of(source_key)))
    }

    /// Raw cut of segment `index`.
    pub fn cut_path(&self, index: usize, source_key: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("segment_{}.{}", index, extension_of(source_key)))
    }

    /// Captioned render of segment `index`.
    pub fn output_path(&self, index: usize, source_key: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("output_{}.{}", index, extension_of(source_key)))
    }

    /// File stem for segment `index`'s caption document.
    pub fn caption_stem(&self, index: usize) -> String {
        format!("segment_{}", index)
    }
}

fn extension_of(key: &str) -> &str {
    match basename(key).rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => "mp4",
    }
}
