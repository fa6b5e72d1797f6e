//! Curriculum identity resolution from document filenames.
//!
//! Textbook files are named by hand (`"12th phy ch 12.json"`,
//! `"6th math ch 3.json"`), so identity is recovered by trying an ordered
//! list of named patterns. Each pattern is a pure function from the file
//! stem to an optional [`Identity`]; the first match wins. When nothing
//! matches the document is [`Identity::Unresolved`] and a [`ParseWarning`]
//! is produced. Resolution never fails.
//!
//! Patterns must stay mutually exclusive. A new naming convention gets its
//! own entry in [`PATTERNS`] (checked against the existing ones in the
//! tests) rather than widening an existing regex.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::models::Identity;

/// A named filename convention.
pub struct FilenamePattern {
    pub name: &'static str,
    pub matcher: fn(&str) -> Option<Identity>,
}

/// Recognised conventions, in match order.
pub const PATTERNS: &[FilenamePattern] = &[
    FilenamePattern {
        name: "science-abbrev",
        matcher: match_science_abbrev,
    },
    FilenamePattern {
        name: "math",
        matcher: match_math,
    },
];

static RE_SCIENCE_ABBREV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)(?:th|st|nd|rd)?\s+(phy|chem)\s+ch\s+(\d+)").unwrap()
});

static RE_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)(?:th|st|nd|rd)?\s+math\s+ch\s+(\d+)").unwrap());

/// `"<n>th phy ch <m>"` / `"<n>th chem ch <m>"`.
pub fn match_science_abbrev(stem: &str) -> Option<Identity> {
    let caps = RE_SCIENCE_ABBREV.captures(stem)?;
    let subject = match caps[2].to_ascii_lowercase().as_str() {
        "phy" => "Physics",
        "chem" => "Chemistry",
        _ => return None,
    };
    Some(Identity::resolved(
        format!("Class {}", &caps[1]),
        subject,
        &caps[3],
    ))
}

/// `"<n>th math ch <m>"`.
pub fn match_math(stem: &str) -> Option<Identity> {
    let caps = RE_MATH.captures(stem)?;
    Some(Identity::resolved(
        format!("Class {}", &caps[1]),
        "Math",
        &caps[2],
    ))
}

/// Diagnostic for a filename that matched no known convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub filename: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not parse metadata from filename: '{}'. Using defaults.",
            self.filename
        )
    }
}

/// Outcome of resolving one filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: Identity,
    pub warning: Option<ParseWarning>,
}

/// Strip a trailing `.json` extension, if present.
pub fn file_stem(filename: &str) -> &str {
    filename.strip_suffix(".json").unwrap_or(filename)
}

/// Resolve the curriculum identity encoded in `filename`.
///
/// Tries each entry of [`PATTERNS`] in order against the stem. Unmatched
/// filenames resolve to [`Identity::Unresolved`] with a warning, which is
/// also logged.
pub fn resolve(filename: &str) -> Resolution {
    let stem = file_stem(filename);

    for pattern in PATTERNS {
        if let Some(identity) = (pattern.matcher)(stem) {
            return Resolution {
                identity,
                warning: None,
            };
        }
    }

    let warning = ParseWarning {
        filename: filename.to_string(),
    };
    warn!("{}", warning);

    Resolution {
        identity: Identity::Unresolved,
        warning: Some(warning),
    }
}
