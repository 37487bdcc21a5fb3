//! `PrivacyTransform` (spec.md §4.6): a pure `text -> (text, detections)`
//! function. Mode interpretation (reject vs mask vs pass-through) is
//! applied by the caller (`pipeline::run_post_asr`); this module only
//! detects and masks.

use std::sync::LazyLock;

use memoire_config::PrivacyMode;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiClass {
    Email,
    Phone,
    Card,
    GovernmentId,
    Ip,
    Person,
}

impl PiiClass {
    pub fn placeholder(&self) -> &'static str {
        match self {
            PiiClass::Email => "[EMAIL]",
            PiiClass::Phone => "[PHONE]",
            PiiClass::Card => "[CARD]",
            PiiClass::GovernmentId => "[ID]",
            PiiClass::Ip => "[IP]",
            PiiClass::Person => "[PERSON]",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PiiDetection {
    pub class: PiiClass,
    pub start: usize,
    pub end: usize,
    pub matched: String,
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

/// Covers generic international formats plus KZ/RU-style mobile numbers
/// (`+7 7XX XXX XX XX`, spec.md §4.6's "country-specific formats").
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\+7[\s-]?7\d{2}[\s-]?\d{3}[\s-]?\d{2}[\s-]?\d{2})|(\+?\d[\d\s\-\(\)]{8,14}\d)")
        .unwrap()
});

/// Candidate runs of 13-19 digits (with optional separators); Luhn
/// validation below filters non-cards out.
static CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d[ -]?){13,19}\b").unwrap());

/// KZ IIN: 12 digits, first 6 a YYMMDD birth date.
static KZ_IIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{12}\b").unwrap());

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b").unwrap());

/// Title + capitalized-name heuristic. Spec.md §4.6 names "named persons
/// (via an external detector)" without a vendor; this regex/lexicon
/// default ships behind the `PersonDetector` trait so a real NER call
/// is a drop-in (DESIGN.md Open Questions).
pub trait PersonDetector: Send + Sync {
    fn detect(&self, text: &str) -> Vec<(usize, usize)>;
}

static TITLED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Иван\w*|Петр\w*|Мария\w*|Анна\w*|Сергей\w*|Алексей\w*|Ivan|John|Maria|Anna)\b")
        .unwrap()
});

pub struct LexiconPersonDetector;

impl PersonDetector for LexiconPersonDetector {
    fn detect(&self, text: &str) -> Vec<(usize, usize)> {
        TITLED_NAME_RE
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}

fn luhn_valid(digits: &str) -> bool {
    let digits: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

fn detect(text: &str, person_detector: &dyn PersonDetector) -> Vec<PiiDetection> {
    let mut detections = Vec::new();

    for m in EMAIL_RE.find_iter(text) {
        detections.push(PiiDetection {
            class: PiiClass::Email,
            start: m.start(),
            end: m.end(),
            matched: m.as_str().to_string(),
        });
    }
    for m in PHONE_RE.find_iter(text) {
        detections.push(PiiDetection {
            class: PiiClass::Phone,
            start: m.start(),
            end: m.end(),
            matched: m.as_str().to_string(),
        });
    }
    for m in CARD_RE.find_iter(text) {
        if luhn_valid(m.as_str()) {
            detections.push(PiiDetection {
                class: PiiClass::Card,
                start: m.start(),
                end: m.end(),
                matched: m.as_str().to_string(),
            });
        }
    }
    for m in KZ_IIN_RE.find_iter(text) {
        let overlaps_card = detections
            .iter()
            .any(|d| d.class == PiiClass::Card && d.start <= m.start() && m.end() <= d.end());
        if !overlaps_card {
            detections.push(PiiDetection {
                class: PiiClass::GovernmentId,
                start: m.start(),
                end: m.end(),
                matched: m.as_str().to_string(),
            });
        }
    }
    for m in IPV4_RE.find_iter(text) {
        detections.push(PiiDetection {
            class: PiiClass::Ip,
            start: m.start(),
            end: m.end(),
            matched: m.as_str().to_string(),
        });
    }
    for (start, end) in person_detector.detect(text) {
        detections.push(PiiDetection {
            class: PiiClass::Person,
            start,
            end,
            matched: text[start..end].to_string(),
        });
    }

    detections.sort_by_key(|d| d.start);
    detections
}

fn mask(text: &str, detections: &[PiiDetection]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for d in detections {
        if d.start < cursor {
            continue; // overlapping match, already covered
        }
        out.push_str(&text[cursor..d.start]);
        out.push_str(d.class.placeholder());
        cursor = d.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Runs detection, then applies `mode`'s text-transformation policy.
/// `strict` still returns the masked text plus detections — the caller
/// decides to reject based on `!detections.is_empty()` (spec.md §4.6/§7:
/// CompliancePolicy → `filtered` with reason `pii_blocked`).
pub fn transform(
    text: &str,
    mode: PrivacyMode,
    person_detector: &dyn PersonDetector,
) -> (String, Vec<PiiDetection>) {
    let detections = detect(text, person_detector);

    let output = match mode {
        PrivacyMode::Audit => text.to_string(),
        PrivacyMode::Mask | PrivacyMode::Strict => mask(text, &detections),
    };

    if mode == PrivacyMode::Audit && !detections.is_empty() {
        tracing::debug!(count = detections.len(), "audit mode: PII detected, original text persisted");
    }

    (output, detections)
}
