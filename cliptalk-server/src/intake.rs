//! Text intake: cleanup, filtering and queueing of incoming text
//!
//! Producers (stdin, `POST /text`) hand raw text to [`TextIntake::submit`].

use crate::config::TextFilterConfig;
use crate::session::Session;
use cliptalk_core::{InstrumentedQueue, TextItem};
use parking_lot::Mutex;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| Regex::new(r"[A-Za-z]*://\S*").expect("Invalid regex pattern"))
}

/// Why a text was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Arrived within the debounce window of the previous text
    TooFast,
    /// Same as the previous text
    Duplicate,
    TooShort,
    /// Too few spaces to be prose
    NotProse,
    /// Monitoring is paused
    Paused,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::TooFast => "too fast",
            SkipReason::Duplicate => "duplicate",
            SkipReason::TooShort => "too short",
            SkipReason::NotProse => "space ratio too low",
            SkipReason::Paused => "monitoring paused",
        };
        f.write_str(reason)
    }
}

/// Strip markdown emphasis and URLs, trim whitespace
pub fn clean_text(raw: &str) -> String {
    let unmarked: String = raw.chars().filter(|c| *c != '#' && *c != '*').collect();
    url_pattern().replace_all(&unmarked, "").trim().to_string()
}

/// Stateful filter deciding which texts are worth speaking
pub struct TextFilter {
    config: TextFilterConfig,
    last_accepted_at: Option<Instant>,
    previous: Option<String>,
}

impl TextFilter {
    pub fn new(config: TextFilterConfig) -> Self {
        Self {
            config,
            last_accepted_at: None,
            previous: None,
        }
    }

    /// Clean `raw` and decide whether to keep it, as of `now`.
    ///
    /// The debounce clock only advances on texts that pass it. A repeat of
    /// the previous text is skipped once; the same text after that is
    /// accepted again.
    pub fn check(&mut self, raw: &str, now: Instant) -> Result<String, SkipReason> {
        let debounce = self.config.debounce();
        if debounce > Duration::ZERO {
            if let Some(last) = self.last_accepted_at {
                if now.saturating_duration_since(last) < debounce {
                    return Err(SkipReason::TooFast);
                }
            }
        }
        self.last_accepted_at = Some(now);

        let text = clean_text(raw);

        if self.previous.as_deref() == Some(text.as_str()) {
            self.previous = None;
            return Err(SkipReason::Duplicate);
        }
        self.previous = Some(text.clone());

        let length = text.chars().count();
        if length == 0 || length < self.config.min_text_length {
            return Err(SkipReason::TooShort);
        }

        let spaces = text.chars().filter(|c| *c == ' ').count();
        if (spaces as f64) / (length as f64) < self.config.min_space_ratio {
            return Err(SkipReason::NotProse);
        }

        Ok(text)
    }
}

/// Front door of the pipeline's input queue
pub struct TextIntake {
    input: InstrumentedQueue<TextItem>,
    filter: Mutex<TextFilter>,
    session: Arc<Session>,
}

impl TextIntake {
    pub fn new(
        input: InstrumentedQueue<TextItem>,
        config: TextFilterConfig,
        session: Arc<Session>,
    ) -> Self {
        Self {
            input,
            filter: Mutex::new(TextFilter::new(config)),
            session,
        }
    }

    /// Filter `raw` and queue it, suspending while the input queue is full
    pub async fn submit(&self, raw: &str) -> Result<TextItem, SkipReason> {
        if !self.session.monitoring() {
            debug!("Monitoring paused; dropping text");
            return Err(SkipReason::Paused);
        }

        let checked = self.filter.lock().check(raw, Instant::now());
        let text = match checked {
            Ok(text) => TextItem::new(text),
            Err(reason) => {
                info!("Skipping text ({}): {:?}", reason, preview(raw));
                return Err(reason);
            }
        };

        debug!("Queueing {:?}", text.preview());
        self.input.enqueue(text.clone()).await;
        Ok(text)
    }
}

fn preview(raw: &str) -> String {
    TextItem::from(raw.trim()).preview()
}

/// Submit every line of `reader` until it ends
pub async fn read_lines<R>(intake: Arc<TextIntake>, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = intake.submit(&line).await;
            }
            Ok(None) => {
                info!("Text input closed");
                break;
            }
            Err(e) => {
                warn!("Failed to read text input: {}", e);
                break;
            }
        }
    }
}
