//! The current media selection and the playback URL derived from it.

use crate::config::{MediaConfig, ReleasePolicy};
use crate::link::link;
use crate::media::{MediaFile, MediaUrl, ObjectUrlRegistry};
use crate::store::{Observable, Readable, Subscription, Writable};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

const LOG_TARGET: &str = "lyricsync::binding";

/// Holds the current [`MediaFile`] and keeps a playable [`MediaUrl`] derived from it.
///
/// Setting a file derives a fresh URL. Clearing the file leaves the last URL in
/// place unless the [`ReleasePolicy`] says otherwise; under the default
/// [`ReleasePolicy::Retain`] no URL is ever revoked until [`MediaBinding::release`].
pub struct MediaBinding {
    media: Writable<Option<MediaFile>>,
    media_url: Writable<Option<MediaUrl>>,
    registry: ObjectUrlRegistry,
    policy: ReleasePolicy,
    _derive: Subscription,
    _revoke: Subscription,
}

impl MediaBinding {
    /// Create a binding that derives URLs through `registry`.
    ///
    /// The binding treats the registry as its own: [`MediaBinding::release`]
    /// revokes every URL still live in it.
    #[must_use]
    pub fn new(registry: ObjectUrlRegistry, policy: ReleasePolicy) -> Self {
        let media: Writable<Option<MediaFile>> = Writable::new(None);
        let media_url: Writable<Option<MediaUrl>> = Writable::new(None);

        // Registered first so it runs before any outside observer of the URL
        let revoke = {
            let registry = registry.clone();
            let previous: Mutex<Option<MediaUrl>> = Mutex::new(None);
            media_url.subscribe(move |url: &Option<MediaUrl>| {
                let old = std::mem::replace(&mut *previous.lock(), url.clone());
                if !policy.revokes_on_replace() {
                    return;
                }
                if let Some(old) = old.filter(|old| url.as_ref() != Some(old)) {
                    registry.revoke(&old);
                }
            })
        };

        let derive = {
            let registry = registry.clone();
            link(&media, &media_url, move |file: &Option<MediaFile>| match file {
                Some(file) => Some(Some(registry.create_object_url(file))),
                None if policy.revokes_on_clear() => Some(None),
                None => None,
            })
        };

        info!(target: LOG_TARGET, "Media binding ready (policy: {:?})", policy);

        Self {
            media,
            media_url,
            registry,
            policy,
            _derive: derive,
            _revoke: revoke,
        }
    }

    /// Create a binding with its own registry, configured from `config`
    #[must_use]
    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(
            ObjectUrlRegistry::new(config.url_origin.clone()),
            config.release_policy,
        )
    }

    /// Replace the current media.
    ///
    /// A present file gets a newly derived URL. An absent file leaves the URL
    /// as it was, except under [`ReleasePolicy::RevokeOnClear`] where it is
    /// revoked and cleared.
    pub fn set_media(&self, file: Option<MediaFile>) {
        match &file {
            Some(file) => debug!(
                target: LOG_TARGET,
                "Media set to {} ({}, {} bytes)",
                file.name(),
                file.mime_type(),
                file.size()
            ),
            None => debug!(target: LOG_TARGET, "Media cleared"),
        }
        self.media.set(file);
    }

    #[must_use]
    pub fn media(&self) -> Option<MediaFile> {
        self.media.get()
    }

    #[must_use]
    pub fn media_url(&self) -> Option<MediaUrl> {
        self.media_url.get()
    }

    /// Observe the current media. Called immediately with the current value.
    pub fn subscribe_media<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Option<MediaFile>) + Send + Sync + 'static,
    {
        self.media.subscribe(observer)
    }

    /// Observe the current media URL. Called immediately with the current value.
    pub fn subscribe_media_url<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Option<MediaUrl>) + Send + Sync + 'static,
    {
        self.media_url.subscribe(observer)
    }

    /// Read-only handle to the media cell
    #[must_use]
    pub fn media_cell(&self) -> Readable<Option<MediaFile>> {
        self.media.readable()
    }

    /// Read-only handle to the media URL cell
    #[must_use]
    pub fn media_url_cell(&self) -> Readable<Option<MediaUrl>> {
        self.media_url.readable()
    }

    #[must_use]
    pub const fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    #[must_use]
    pub const fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    /// The media behind `url`, if it has not been revoked
    #[must_use]
    pub fn resolve(&self, url: &MediaUrl) -> Option<MediaFile> {
        self.registry.resolve(url)
    }

    /// Number of live URLs in this binding's registry
    #[must_use]
    pub fn live_url_count(&self) -> usize {
        self.registry.live_count()
    }

    /// Revoke every URL still live in this binding's registry and clear the
    /// current URL. Returns the number of URLs revoked.
    pub fn release(&self) -> usize {
        let revoked = self.registry.revoke_all();

        if self.media_url.with(Option::is_some) {
            self.media_url.set(None);
        }

        info!(target: LOG_TARGET, "Released {} media URL(s)", revoked);
        revoked
    }
}

impl std::fmt::Debug for MediaBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBinding")
            .field("media", &self.media.get())
            .field("media_url", &self.media_url.get())
            .field("policy", &self.policy)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
