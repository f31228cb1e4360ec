use std::future::Future;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{Result, UmbraError};

/// Raw bytes plus whatever the transport said about them.
#[derive(Debug, Clone, Default)]
pub struct Asset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Asset {
    /// Servers answer unknown paths with their HTML index; treat that as a miss.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ty| ty.trim_start().starts_with("text/html"))
    }
}

/// Asynchronous source of asset bytes addressed by relative URI.
///
/// No timeout and no cancellation: a read resolves when the underlying
/// transport does.
pub trait AssetReader {
    fn read(&self, uri: &str) -> impl Future<Output = Result<Asset>>;
}

// ============================================================================
// File
// ============================================================================

/// Reads assets from a directory on disk.
#[cfg(not(target_arch = "wasm32"))]
pub struct FileAssetReader {
    root_path: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileAssetReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetReader for FileAssetReader {
    async fn read(&self, uri: &str) -> Result<Asset> {
        let path = self.root_path.join(uri);
        let bytes = tokio::fs::read(&path).await?;
        Ok(Asset {
            bytes,
            content_type: None,
        })
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Fetches assets relative to a base URL.
#[cfg(feature = "http")]
pub struct HttpAssetReader {
    root_url: url::Url,
}

#[cfg(feature = "http")]
impl HttpAssetReader {
    pub fn new(url_str: &str) -> Result<Self> {
        let url = url::Url::parse(url_str)?;
        // Relative joins resolve against the last directory.
        let root_url = if url.path().ends_with('/') {
            url
        } else {
            let mut u = url.clone();
            if let Ok(mut segments) = u.path_segments_mut() {
                segments.pop();
                segments.push("");
            }
            u
        };
        Ok(Self { root_url })
    }

    #[inline]
    #[must_use]
    pub fn root_url(&self) -> &url::Url {
        &self.root_url
    }
}

#[cfg(feature = "http")]
impl AssetReader for HttpAssetReader {
    async fn read(&self, uri: &str) -> Result<Asset> {
        let url = self.root_url.join(uri)?;
        let response = ehttp::fetch_async(ehttp::Request::get(url.as_str()))
            .await
            .map_err(UmbraError::HttpTransport)?;
        if !response.ok {
            return Err(UmbraError::Http {
                url: url.to_string(),
                status: response.status,
            });
        }
        let content_type = response.content_type().map(str::to_owned);
        Ok(Asset {
            bytes: response.bytes,
            content_type,
        })
    }
}

// ============================================================================
// Memory
// ============================================================================

/// An in-memory asset table, for tests and embedded assets.
#[derive(Debug, Default)]
pub struct MemoryAssetReader {
    entries: FxHashMap<String, Asset>,
}

impl MemoryAssetReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.insert_typed(uri, bytes, None)
    }

    /// Inserts an entry that reports `content_type`, as an HTTP server would.
    pub fn insert_typed(
        &mut self,
        uri: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        content_type: Option<&str>,
    ) -> &mut Self {
        self.entries.insert(
            uri.into(),
            Asset {
                bytes: bytes.into(),
                content_type: content_type.map(str::to_owned),
            },
        );
        self
    }
}

impl AssetReader for MemoryAssetReader {
    async fn read(&self, uri: &str) -> Result<Asset> {
        self.entries.get(uri).cloned().ok_or_else(|| {
            UmbraError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no in-memory asset '{uri}'"),
            ))
        })
    }
}

// ============================================================================
// Variant
// ============================================================================

/// Closed set of readers, dispatched statically.
#[derive(Clone)]
pub enum AssetReaderVariant {
    #[cfg(not(target_arch = "wasm32"))]
    File(Arc<FileAssetReader>),
    #[cfg(feature = "http")]
    Http(Arc<HttpAssetReader>),
    Memory(Arc<MemoryAssetReader>),
}

impl AssetReaderVariant {
    /// Picks a reader for a directory path or a base URL.
    pub fn from_source(source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            #[cfg(feature = "http")]
            {
                Ok(Self::Http(Arc::new(HttpAssetReader::new(source)?)))
            }
            #[cfg(not(feature = "http"))]
            {
                Err(UmbraError::UnsupportedAsset(format!(
                    "{source}: the `http` feature is disabled"
                )))
            }
        } else {
            #[cfg(not(target_arch = "wasm32"))]
            {
                Ok(Self::File(Arc::new(FileAssetReader::new(source))))
            }
            #[cfg(target_arch = "wasm32")]
            {
                Err(UmbraError::UnsupportedAsset(format!(
                    "{source}: only URLs can be read in the browser"
                )))
            }
        }
    }

    #[must_use]
    pub fn memory(reader: MemoryAssetReader) -> Self {
        Self::Memory(Arc::new(reader))
    }

    pub async fn read(&self, uri: &str) -> Result<Asset> {
        match self {
            #[cfg(not(target_arch = "wasm32"))]
            Self::File(r) => r.read(uri).await,
            #[cfg(feature = "http")]
            Self::Http(r) => r.read(uri).await,
            Self::Memory(r) => r.read(uri).await,
        }
    }

    /// Reads `uri`, rejecting HTML responses.
    pub async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let asset = self.read(uri).await?;
        if asset.is_html() {
            return Err(UmbraError::HtmlInsteadOfAsset(uri.to_string()));
        }
        Ok(asset.bytes)
    }

    /// Reads `uri` as UTF-8, rejecting HTML responses.
    pub async fn read_text(&self, uri: &str) -> Result<String> {
        let bytes = self.read_bytes(uri).await?;
        String::from_utf8(bytes).map_err(|e| UmbraError::InvalidText(format!("{uri}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_content_type_is_detected() {
        let asset = Asset {
            bytes: Vec::new(),
            content_type: Some("text/html; charset=utf-8".to_string()),
        };
        assert!(asset.is_html());
        assert!(!Asset::default().is_html());
    }

    #[cfg(feature = "http")]
    #[test]
    fn http_root_drops_file_component() {
        let reader = HttpAssetReader::new("https://example.com/assets/index.html").unwrap();
        assert_eq!(reader.root_url().as_str(), "https://example.com/assets/");
        let joined = reader.root_url().join("mesh/dingus.obj").unwrap();
        assert_eq!(joined.as_str(), "https://example.com/assets/mesh/dingus.obj");
    }
}
