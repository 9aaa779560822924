//! The process-wide container owning every binding and the event bus.

use crate::binding::MediaBinding;
use crate::config::{Config, ReleasePolicy};
use crate::events::{EventBus, StoreEvent};
use crate::lyrics::LyricsBinding;
use crate::media::{MediaFile, MediaUrl};
use crate::store::Subscription;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

const LOG_TARGET: &str = "lyricsync::state";

/// Process-wide media and lyrics state.
///
/// Created once at startup with [`AppState::new`] and torn down with
/// [`AppState::shutdown`]. Cells are only reachable through the bindings'
/// setters and observer registration.
pub struct AppState<L> {
    media: MediaBinding,
    lyrics: LyricsBinding<L>,
    events: EventBus,
    bridges: Mutex<Vec<Subscription>>,
    shut_down: AtomicBool,
}

impl<L: Clone + Send + Sync + 'static> AppState<L> {
    /// Create the app state and start republishing changes as [`StoreEvent`]s
    #[must_use]
    pub fn new(config: &Config) -> Arc<Self> {
        let media = MediaBinding::from_config(&config.media);
        let lyrics = LyricsBinding::new();
        let events = EventBus::new(config.events.capacity);

        let bridges = vec![
            events.bridge(&media.media_cell(), |file: &Option<MediaFile>| {
                Some(file.as_ref().map_or(StoreEvent::MediaCleared, |file| {
                    StoreEvent::MediaChanged {
                        name: file.name().to_string(),
                        mime_type: file.mime_type().to_string(),
                        size: file.size(),
                    }
                }))
            }),
            events.bridge(&media.media_url_cell(), |url: &Option<MediaUrl>| {
                Some(url.as_ref().map_or(StoreEvent::MediaUrlCleared, |url| {
                    StoreEvent::MediaUrlChanged {
                        url: url.to_string(),
                    }
                }))
            }),
            events.bridge(
                &media.registry().revocations(),
                |url: &Option<MediaUrl>| {
                    url.as_ref().map(|url| StoreEvent::MediaUrlRevoked {
                        url: url.to_string(),
                    })
                },
            ),
            events.bridge(&lyrics.raw_lyrics_cell(), |raw: &Option<String>| {
                Some(StoreEvent::RawLyricsChanged {
                    len: raw.as_ref().map_or(0, String::len),
                })
            }),
            events.bridge(&lyrics.parsed_lyrics_cell(), |parsed: &Option<L>| {
                Some(StoreEvent::ParsedLyricsChanged {
                    present: parsed.is_some(),
                })
            }),
        ];

        info!(target: LOG_TARGET, "App state initialized");

        Arc::new(Self {
            media,
            lyrics,
            events,
            bridges: Mutex::new(bridges),
            shut_down: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub const fn media(&self) -> &MediaBinding {
        &self.media
    }

    #[must_use]
    pub const fn lyrics(&self) -> &LyricsBinding<L> {
        &self.lyrics
    }

    /// Subscribe to store events
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Tear down the app state.
    ///
    /// Releases media URLs unless the policy is [`ReleasePolicy::Retain`], emits
    /// [`StoreEvent::Shutdown`] and stops republishing events. Setters keep
    /// working afterwards. Calling this more than once has no effect.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let policy = self.media.policy();
        if policy == ReleasePolicy::Retain {
            let live = self.media.live_url_count();
            if live > 0 {
                warn!(
                    target: LOG_TARGET,
                    "Shutting down with {} unreleased media URL(s)", live
                );
            }
        } else {
            self.media.release();
        }

        self.events.publish(StoreEvent::Shutdown);
        self.bridges.lock().clear();

        info!(target: LOG_TARGET, "App state shut down");
    }
}

impl<L> std::fmt::Debug for AppState<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("media", &self.media)
            .field("events", &self.events)
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}
