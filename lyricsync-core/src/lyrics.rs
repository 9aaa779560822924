//! Raw and parsed lyrics cells.

use crate::link::link;
use crate::store::{Observable, Readable, Subscription, Writable};
use std::fmt;
use tracing::{debug, warn};

const LOG_TARGET: &str = "lyricsync::lyrics";

/// Turns raw lyrics text into a structured form.
///
/// Implemented by the caller; this crate never inspects the parsed value.
/// Closures of the shape `Fn(&str) -> Result<L, E>` implement it directly.
pub trait LyricsParser<L>: Send + Sync + 'static {
    type Error: fmt::Display;

    /// Parse `raw` lyrics text
    ///
    /// # Errors
    ///
    /// Returns the parser's own error when `raw` cannot be parsed.
    fn parse(&self, raw: &str) -> Result<L, Self::Error>;
}

impl<L, E, F> LyricsParser<L> for F
where
    F: Fn(&str) -> Result<L, E> + Send + Sync + 'static,
    E: fmt::Display,
{
    type Error = E;

    fn parse(&self, raw: &str) -> Result<L, E> {
        self(raw)
    }
}

/// Two independent cells: the raw lyrics text and the parsed lyrics.
///
/// Nothing links them until [`LyricsBinding::attach_parser`] is called.
pub struct LyricsBinding<L> {
    raw_lyrics: Writable<Option<String>>,
    parsed_lyrics: Writable<Option<L>>,
}

impl<L: Clone + Send + Sync + 'static> LyricsBinding<L> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            raw_lyrics: Writable::new(None),
            parsed_lyrics: Writable::new(None),
        }
    }

    pub fn set_raw_lyrics(&self, raw: Option<String>) {
        debug!(
            target: LOG_TARGET,
            "Raw lyrics set ({} bytes)",
            raw.as_ref().map_or(0, String::len)
        );
        self.raw_lyrics.set(raw);
    }

    #[must_use]
    pub fn raw_lyrics(&self) -> Option<String> {
        self.raw_lyrics.get()
    }

    /// Observe the raw lyrics. Called immediately with the current value.
    pub fn subscribe_raw_lyrics<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Option<String>) + Send + Sync + 'static,
    {
        self.raw_lyrics.subscribe(observer)
    }

    /// Store parsed lyrics as given; no transformation is applied
    pub fn set_parsed_lyrics(&self, parsed: Option<L>) {
        debug!(
            target: LOG_TARGET,
            "Parsed lyrics {}",
            if parsed.is_some() { "set" } else { "cleared" }
        );
        self.parsed_lyrics.set(parsed);
    }

    #[must_use]
    pub fn parsed_lyrics(&self) -> Option<L> {
        self.parsed_lyrics.get()
    }

    /// Observe the parsed lyrics. Called immediately with the current value.
    pub fn subscribe_parsed_lyrics<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Option<L>) + Send + Sync + 'static,
    {
        self.parsed_lyrics.subscribe(observer)
    }

    #[must_use]
    pub fn raw_lyrics_cell(&self) -> Readable<Option<String>> {
        self.raw_lyrics.readable()
    }

    #[must_use]
    pub fn parsed_lyrics_cell(&self) -> Readable<Option<L>> {
        self.parsed_lyrics.readable()
    }

    /// Re-parse the raw lyrics into the parsed cell on every change.
    ///
    /// Runs once right away on the current raw text. Absent raw text or a parse
    /// failure leaves the parsed cell empty. Dropping the returned
    /// [`Subscription`] detaches the parser.
    pub fn attach_parser<P>(&self, parser: P) -> Subscription
    where
        P: LyricsParser<L>,
    {
        link(
            &self.raw_lyrics,
            &self.parsed_lyrics,
            move |raw: &Option<String>| {
                let Some(raw) = raw else {
                    return Some(None);
                };
                match parser.parse(raw) {
                    Ok(parsed) => Some(Some(parsed)),
                    Err(e) => {
                        warn!(target: LOG_TARGET, "Failed to parse lyrics: {e}");
                        Some(None)
                    }
                }
            },
        )
    }
}

impl<L: Clone + Send + Sync + 'static> Default for LyricsBinding<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: fmt::Debug> fmt::Debug for LyricsBinding<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LyricsBinding")
            .field("raw_lyrics", &self.raw_lyrics)
            .field("parsed_lyrics", &self.parsed_lyrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    /// Stand-in for an external parser: one (time, text) pair per `[mm:ss.xx]` line
    fn stub_parser(raw: &str) -> Result<Vec<(Duration, String)>, String> {
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| -> Result<(Duration, String), String> {
                let rest = line.strip_prefix('[').ok_or_else(|| format!("no tag: {line}"))?;
                let (stamp, text) = rest.split_once(']').ok_or("unclosed tag")?;
                let (min, sec) = stamp.split_once(':').ok_or("bad stamp")?;
                let min: u64 = min.parse().map_err(|_| "bad minutes")?;
                let sec: f64 = sec.parse().map_err(|_| "bad seconds")?;
                Ok((
                    Duration::from_secs(min * 60) + Duration::from_secs_f64(sec),
                    text.to_string(),
                ))
            })
            .collect()
    }

    type Lines = Vec<(Duration, String)>;

    #[test]
    fn test_cells_start_empty() {
        let lyrics: LyricsBinding<Lines> = LyricsBinding::new();
        assert!(lyrics.raw_lyrics().is_none());
        assert!(lyrics.parsed_lyrics().is_none());
    }

    #[test]
    fn test_parsed_lyrics_pass_through() {
        let lyrics: LyricsBinding<Lines> = LyricsBinding::new();
        lyrics.set_raw_lyrics(Some("[00:01.00]Hello".to_string()));

        let result = stub_parser(&lyrics.raw_lyrics().unwrap()).unwrap();
        lyrics.set_parsed_lyrics(Some(result.clone()));

        assert_eq!(lyrics.parsed_lyrics(), Some(result));
    }

    #[test]
    fn test_cells_are_independent_without_parser() {
        let lyrics: LyricsBinding<Lines> = LyricsBinding::new();
        lyrics.set_raw_lyrics(Some("[00:01.00]Hello".to_string()));
        assert!(lyrics.parsed_lyrics().is_none());
    }

    #[test]
    fn test_raw_lyrics_notifies_in_call_order() {
        let lyrics: LyricsBinding<Lines> = LyricsBinding::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = lyrics.subscribe_raw_lyrics(move |raw: &Option<String>| {
            sink.lock().push(raw.clone());
        });
        seen.lock().clear();

        let inputs: Vec<String> = (0..5).map(|i| format!("[00:0{i}.00]line {i}")).collect();
        for input in &inputs {
            lyrics.set_raw_lyrics(Some(input.clone()));
        }

        let expected: Vec<Option<String>> = inputs.into_iter().map(Some).collect();
        assert_eq!(*seen.lock(), expected);
    }

    #[test]
    fn test_attach_parser_parses_current_and_future_text() {
        let lyrics: LyricsBinding<Lines> = LyricsBinding::new();
        lyrics.set_raw_lyrics(Some("[00:01.00]Hello".to_string()));

        let _parser = lyrics.attach_parser(stub_parser);
        assert_eq!(
            lyrics.parsed_lyrics(),
            Some(vec![(Duration::from_secs(1), "Hello".to_string())])
        );

        lyrics.set_raw_lyrics(Some("[01:02.50]World".to_string()));
        assert_eq!(
            lyrics.parsed_lyrics(),
            Some(vec![(Duration::from_millis(62_500), "World".to_string())])
        );
    }

    #[test]
    fn test_attach_parser_failure_clears_parsed() {
        let lyrics: LyricsBinding<Lines> = LyricsBinding::new();
        let _parser = lyrics.attach_parser(stub_parser);

        lyrics.set_raw_lyrics(Some("[00:01.00]Hello".to_string()));
        assert!(lyrics.parsed_lyrics().is_some());

        lyrics.set_raw_lyrics(Some("not lyrics".to_string()));
        assert!(lyrics.parsed_lyrics().is_none());
    }

    #[test]
    fn test_attach_parser_clears_on_absent_text() {
        let lyrics: LyricsBinding<Lines> = LyricsBinding::new();
        let _parser = lyrics.attach_parser(stub_parser);
        lyrics.set_raw_lyrics(Some("[00:01.00]Hello".to_string()));

        lyrics.set_raw_lyrics(None);

        assert!(lyrics.parsed_lyrics().is_none());
    }

    #[test]
    fn test_detached_parser_stops_parsing() {
        let lyrics: LyricsBinding<Lines> = LyricsBinding::new();
        let parser = lyrics.attach_parser(stub_parser);
        drop(parser);

        lyrics.set_raw_lyrics(Some("[00:01.00]Hello".to_string()));

        assert!(lyrics.parsed_lyrics().is_none());
    }

    #[test]
    fn test_parser_trait_object_style_impl() {
        struct LineCount;

        impl LyricsParser<usize> for LineCount {
            type Error = std::convert::Infallible;

            fn parse(&self, raw: &str) -> Result<usize, Self::Error> {
                Ok(raw.lines().count())
            }
        }

        let lyrics: LyricsBinding<usize> = LyricsBinding::new();
        let _parser = lyrics.attach_parser(LineCount);
        lyrics.set_raw_lyrics(Some("a\nb\nc".to_string()));

        assert_eq!(lyrics.parsed_lyrics(), Some(3));
    }
}
