use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use plaza_types::validate::FieldErrors;

use crate::error::ApiResult;

/// 10 MB upload limit for images.
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

pub const EMPTY_UPLOAD: &str = "The submitted file is empty.";
pub const BAD_EXTENSION: &str = "Filename must end in an alphanumeric extension.";

const AVATAR_DIR: &str = "avatars";
const POST_DIR: &str = "posts";

/// Manages on-disk image storage under a single media root.
///
/// Stored paths are media-root relative (`avatars/...`, `posts/...`) and go
/// into the owning row's `img` column; the static file route serves them.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub async fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        info!("Media root: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the bytes at `rel_path` under the media root, creating parent
    /// directories as needed. An existing file is overwritten: uploads for
    /// the same derived path are last write wins.
    pub async fn save(&self, rel_path: &str, bytes: &[u8]) -> Result<()> {
        let path = self.root.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create media dir {}", parent.display()))?;
        }
        let mut file = fs::File::create(&path)
            .await
            .with_context(|| format!("create media file {}", path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("write media file {}", path.display()))?;
        Ok(())
    }
}

/// `avatars/{owner}{nickName}.{ext}`. The name component comes from mutable
/// fields, so renaming a profile orphans the previously stored file.
pub fn avatar_path(owner: Uuid, nick_name: &str, filename: &str) -> ApiResult<String> {
    derived_path(AVATAR_DIR, owner, nick_name, filename)
}

/// `posts/{owner}{title}.{ext}`.
pub fn post_image_path(owner: Uuid, title: &str, filename: &str) -> ApiResult<String> {
    derived_path(POST_DIR, owner, title, filename)
}

fn derived_path(dir: &str, owner: Uuid, label: &str, filename: &str) -> ApiResult<String> {
    let ext = extension_of(filename)?;
    Ok(format!("{dir}/{owner}{}.{ext}", sanitize(label)))
}

/// Extension after the final dot, lowercased; must be purely alphanumeric
/// so the stored path cannot escape the media root.
fn extension_of(filename: &str) -> ApiResult<String> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FieldErrors::single("filename", BAD_EXTENSION).into());
    }
    Ok(ext.to_ascii_lowercase())
}

/// Keeps alphanumerics, `-` and `_`; everything else (path separators,
/// dots, whitespace) is dropped.
fn sanitize(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

/// Size and non-emptiness checks shared by both upload endpoints.
pub fn check_upload(bytes: &[u8]) -> ApiResult<()> {
    if bytes.is_empty() {
        return Err(FieldErrors::single("img", EMPTY_UPLOAD).into());
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        let msg = format!("Ensure the file size is at most {MAX_IMAGE_SIZE} bytes.");
        return Err(FieldErrors::single("img", &msg).into());
    }
    Ok(())
}
