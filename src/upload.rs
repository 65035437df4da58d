use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::errors::{Result, VaultError};

/// Stores an image somewhere and hands back a URL for it. Drafts only ever
/// keep the URL.
pub trait ImageUploader {
    fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String>;
}

pub fn hash_content(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Content-addressed image directory. Identical bytes land on the same
/// file and therefore the same URL.
pub struct LocalImageStore {
    dir: PathBuf,
    max_bytes: u64,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// Checks the size on disk before reading the file.
    pub fn upload_file(&self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.check_size(fs::metadata(path)?.len(), &name)?;
        let bytes = fs::read(path)?;
        self.upload(&bytes, &name)
    }

    fn check_size(&self, size: u64, file_name: &str) -> Result<()> {
        if size > self.max_bytes {
            return Err(VaultError::Upload(format!(
                "{file_name} is {size} bytes, the limit is {} bytes",
                self.max_bytes
            )));
        }
        Ok(())
    }
}

fn accepted_format(bytes: &[u8]) -> Option<ImageFormat> {
    match image::guess_format(bytes).ok()? {
        f @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP) => Some(f),
        _ => None,
    }
}

impl ImageUploader for LocalImageStore {
    fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String> {
        let size = bytes.len() as u64;
        self.check_size(size, file_name)?;
        let format = accepted_format(bytes).ok_or_else(|| {
            VaultError::Upload(format!("{file_name} is not a PNG, JPEG, GIF or WebP image"))
        })?;
        let ext = format.extensions_str().first().copied().unwrap_or("img");

        let hash = hash_content(bytes);
        let path = self.dir.join(format!("{}.{ext}", &hash[..16]));
        if path.exists() {
            debug!(path = %path.display(), "image already stored");
        } else {
            fs::create_dir_all(&self.dir)?;
            fs::write(&path, bytes)?;
            info!(path = %path.display(), size, "stored image");
        }

        let absolute = fs::canonicalize(&path).unwrap_or(path);
        Ok(format!("file://{}", absolute.display()))
    }
}
