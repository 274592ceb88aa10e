//! The text-understanding boundary: free text in, structured obligation out.
//!
//! The external service is an opaque oracle behind the [`Extractor`] trait.
//! `needs_clarification` is true exactly when confidence is low or no usable
//! date was produced — it is a signaled outcome the caller resolves with a
//! follow-up phrase, not an error. Transport failures are [`ExtractError`].
//!
//! Two implementations: [`HttpExtractor`] calls the configured service;
//! [`PhraseExtractor`] is the always-available fallback tier, grounding date
//! phrases through the calendar resolver so the CLI works offline.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::error::{ExtractError, ExtractResult};
use crate::obligation::Urgency;

/// Default local due time attached to a grounded date-only phrase.
const DEFAULT_DUE_TIME: (u32, u32) = (9, 0);

/// Local due time for "tonight".
const EVENING_DUE_TIME: (u32, u32) = (20, 0);

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

/// The service's self-reported certainty about the parsed date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" | "med" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Structured record produced from one piece of free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    /// Normalized title (the input text with the date phrase removed, or the
    /// input itself when nothing was stripped).
    pub title: String,
    /// Grounded due instant, when a usable date was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<FixedOffset>>,
    /// Estimated duration in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    /// Urgency hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    /// Self-reported certainty.
    pub confidence: Confidence,
    /// True exactly when confidence is low or no usable date was produced.
    pub needs_clarification: bool,
}

/// The extraction seam. Implementations must be pure request/response — any
/// latency or retry policy lives behind this trait.
pub trait Extractor {
    /// Extract a structured obligation candidate from free text, grounding
    /// relative dates against `now`.
    fn extract(&self, text: &str, now: DateTime<FixedOffset>) -> ExtractResult<Extraction>;
}

// ---------------------------------------------------------------------------
// HTTP extractor
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ExtractRequest<'a> {
    text: &'a str,
    now: DateTime<FixedOffset>,
}

/// Client for the remote text-understanding service.
pub struct HttpExtractor {
    endpoint: String,
    http: ureq::Agent,
}

impl HttpExtractor {
    /// Create a client for the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(15))
                .build(),
        }
    }
}

impl Extractor for HttpExtractor {
    fn extract(&self, text: &str, now: DateTime<FixedOffset>) -> ExtractResult<Extraction> {
        let response = self
            .http
            .post(&self.endpoint)
            .send_json(&ExtractRequest { text, now })
            .map_err(|e| ExtractError::Unavailable {
                message: e.to_string(),
            })?;
        response
            .into_json::<Extraction>()
            .map_err(|e| ExtractError::Malformed {
                message: e.to_string(),
            })
    }
}

impl fmt::Debug for HttpExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpExtractor")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Phrase extractor (fallback tier)
// ---------------------------------------------------------------------------

fn date_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Trailing date phrase, optionally introduced by "by"/"on"/"due".
        Regex::new(
            r"(?i)\s*(?:\b(?:by|on|due)\s+)?\b(today|tonight|tomorrow|next week|mid[ -]month|end of (?:the )?month|in \d{1,3} (?:days?|weeks?)|(?:next |this )?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday))\s*$",
        )
        .expect("static regex is valid")
    })
}

fn urgency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(asap|urgent|urgently|right away|immediately)\b")
            .expect("static regex is valid")
    })
}

/// Ground a relative date phrase and attach the default local due time
/// ("tonight" lands in the evening, everything else at 09:00 local).
///
/// This is the shared grounding step for both the fallback extractor and
/// clarification follow-ups.
pub fn ground_due_phrase(
    now: DateTime<FixedOffset>,
    phrase: &str,
) -> Option<DateTime<FixedOffset>> {
    let date = calendar::ground_phrase(now, phrase)?;
    let (hour, minute) = if phrase.trim().eq_ignore_ascii_case("tonight") {
        EVENING_DUE_TIME
    } else {
        DEFAULT_DUE_TIME
    };
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_local_timezone(*now.offset()).single()
}

/// Deterministic fallback extractor grounded in the calendar resolver.
///
/// Recognizes a trailing relative date phrase, strips it from the title, and
/// grounds it to a local date with a default due time. No network, no model:
/// confidence is at most medium.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhraseExtractor;

impl PhraseExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for PhraseExtractor {
    fn extract(&self, text: &str, now: DateTime<FixedOffset>) -> ExtractResult<Extraction> {
        let trimmed = text.trim();

        let urgency = urgency_re()
            .is_match(trimmed)
            .then_some(Urgency::Immediate);

        let (title, due_at) = match date_phrase_re().captures(trimmed) {
            Some(caps) => {
                let phrase = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let stripped = trimmed[..caps.get(0).map(|m| m.start()).unwrap_or(0)]
                    .trim_end_matches([',', ':'])
                    .trim()
                    .to_string();
                (stripped, ground_due_phrase(now, phrase))
            }
            None => (trimmed.to_string(), None),
        };

        // An empty residue means the text was only a date phrase; keep the
        // original text as the title and ask for clarification instead.
        let title_usable = !title.is_empty();
        let confidence = if due_at.is_some() && title_usable {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        Ok(Extraction {
            title: if title_usable {
                title
            } else {
                trimmed.to_string()
            },
            due_at,
            estimated_minutes: None,
            urgency,
            confidence,
            needs_clarification: confidence == Confidence::Low || due_at.is_none(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
