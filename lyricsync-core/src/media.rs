//! Media files and the object URLs that let a player stream them.

use crate::error::Result;
use crate::store::{Readable, Writable};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const LOG_TARGET: &str = "lyricsync::media";

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// An in-memory media resource selected by the user.
///
/// Bytes are shared and immutable, so cloning is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl MediaFile {
    /// Create a media file from raw bytes
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a media file from disk, guessing its MIME type from the extension
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(DEFAULT_MIME_TYPE, mime_type_for_extension);

        Ok(Self::new(name, mime_type, bytes))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether two handles share the same underlying bytes
    #[must_use]
    pub fn same_resource(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

fn mime_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/mp4",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "wav" => "audio/wav",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// A dereferenceable handle to a [`MediaFile`], shaped `blob:<origin>/<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaUrl(String);

impl MediaUrl {
    fn generate(origin: &str) -> Self {
        Self(format!("blob:{origin}/{}", Uuid::new_v4()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MediaUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

struct RegistryInner {
    origin: String,
    live: Mutex<HashMap<MediaUrl, MediaFile>>,
    revoked: Writable<Option<MediaUrl>>,
}

/// Owns the association between object URLs and the media they stream.
///
/// Every URL handed out stays live, pinning its media in memory, until it is
/// revoked. Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct ObjectUrlRegistry {
    inner: Arc<RegistryInner>,
}

impl ObjectUrlRegistry {
    /// Create a registry whose URLs use `origin`
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                origin: origin.into(),
                live: Mutex::new(HashMap::new()),
                revoked: Writable::new(None),
            }),
        }
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    /// Create a new live URL for `file`. Each call yields a distinct URL.
    #[must_use]
    pub fn create_object_url(&self, file: &MediaFile) -> MediaUrl {
        let url = MediaUrl::generate(&self.inner.origin);
        let live = {
            let mut live = self.inner.live.lock();
            live.insert(url.clone(), file.clone());
            live.len()
        };
        debug!(
            target: LOG_TARGET,
            "Created {} for {} ({} live)", url, file.name(), live
        );
        url
    }

    /// Revoke `url`. Returns false if it was unknown or already revoked.
    pub fn revoke(&self, url: &MediaUrl) -> bool {
        let removed = self.inner.live.lock().remove(url).is_some();
        if removed {
            debug!(target: LOG_TARGET, "Revoked {}", url);
            self.inner.revoked.set(Some(url.clone()));
        }
        removed
    }

    /// Revoke every live URL. Returns how many were revoked.
    pub fn revoke_all(&self) -> usize {
        let urls: Vec<MediaUrl> = self
            .inner
            .live
            .lock()
            .drain()
            .map(|(url, _)| url)
            .collect();
        for url in &urls {
            debug!(target: LOG_TARGET, "Revoked {}", url);
            self.inner.revoked.set(Some(url.clone()));
        }
        urls.len()
    }

    /// The media behind `url`, if it is still live
    #[must_use]
    pub fn resolve(&self, url: &MediaUrl) -> Option<MediaFile> {
        self.inner.live.lock().get(url).cloned()
    }

    #[must_use]
    pub fn is_live(&self, url: &MediaUrl) -> bool {
        self.inner.live.lock().contains_key(url)
    }

    /// Number of URLs not yet revoked
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.live.lock().len()
    }

    /// The most recently revoked URL; observers see every revocation
    #[must_use]
    pub fn revocations(&self) -> Readable<Option<MediaUrl>> {
        self.inner.revoked.readable()
    }
}

impl fmt::Debug for ObjectUrlRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectUrlRegistry")
            .field("origin", &self.inner.origin)
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Observable;

    fn song(name: &str) -> MediaFile {
        MediaFile::new(name, "audio/mpeg", vec![1u8, 2, 3])
    }

    #[test]
    fn test_create_object_url_shape() {
        let registry = ObjectUrlRegistry::new("lyricsync");
        let url = registry.create_object_url(&song("a.mp3"));

        assert!(url.as_str().starts_with("blob:lyricsync/"));
        let id = url.as_str().trim_start_matches("blob:lyricsync/");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_each_url_is_distinct() {
        let registry = ObjectUrlRegistry::new("lyricsync");
        let file = song("a.mp3");

        let first = registry.create_object_url(&file);
        let second = registry.create_object_url(&file);

        assert_ne!(first, second);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn test_resolve_and_revoke() {
        let registry = ObjectUrlRegistry::new("lyricsync");
        let file = song("a.mp3");
        let url = registry.create_object_url(&file);

        let resolved = registry.resolve(&url).unwrap();
        assert!(resolved.same_resource(&file));

        assert!(registry.revoke(&url));
        assert!(!registry.revoke(&url));
        assert!(registry.resolve(&url).is_none());
        assert!(!registry.is_live(&url));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_revocations_are_observable() {
        let registry = ObjectUrlRegistry::new("lyricsync");
        let url = registry.create_object_url(&song("a.mp3"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = registry
            .revocations()
            .subscribe(move |u: &Option<MediaUrl>| sink.lock().push(u.clone()));

        registry.revoke(&url);
        registry.revoke(&url);

        assert_eq!(*seen.lock(), vec![None, Some(url)]);
    }

    #[test]
    fn test_revoke_all_drains_and_reports_each_url() {
        let registry = ObjectUrlRegistry::new("lyricsync");
        let first = registry.create_object_url(&song("a.mp3"));
        let second = registry.create_object_url(&song("b.mp3"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = registry
            .revocations()
            .subscribe(move |u: &Option<MediaUrl>| sink.lock().extend(u.clone()));

        assert_eq!(registry.revoke_all(), 2);
        assert_eq!(registry.revoke_all(), 0);
        assert_eq!(registry.live_count(), 0);

        let mut seen = seen.lock().clone();
        seen.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut expected = vec![first, second];
        expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_media_file_accessors() {
        let file = MediaFile::new("clip.webm", "video/webm", vec![0u8; 16]);
        assert_eq!(file.name(), "clip.webm");
        assert_eq!(file.mime_type(), "video/webm");
        assert_eq!(file.size(), 16);
        assert_eq!(file.bytes().len(), 16);
        assert_eq!(file.clone(), file);
    }

    #[test]
    fn test_mime_type_for_extension() {
        assert_eq!(mime_type_for_extension("MP3"), "audio/mpeg");
        assert_eq!(mime_type_for_extension("flac"), "audio/flac");
        assert_eq!(mime_type_for_extension("xyz"), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_from_path() {
        let dir = std::env::temp_dir().join(format!("lyricsync-media-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("track.ogg");
        std::fs::write(&path, b"OggS").unwrap();

        let file = MediaFile::from_path(&path).unwrap();
        assert_eq!(file.name(), "track.ogg");
        assert_eq!(file.mime_type(), "audio/ogg");
        assert_eq!(file.bytes(), b"OggS");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_from_missing_path_is_io_error() {
        let result = MediaFile::from_path("/definitely/not/here.mp3");
        assert!(matches!(result, Err(crate::CoreError::IoError(_))));
    }
}
