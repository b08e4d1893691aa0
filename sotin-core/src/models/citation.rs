//! Citation records attached to assistant turns.
//!
//! Backends send citations with any subset of `title`/`url`/`snippet`, and
//! sometimes send those keys with blank values. Everything is funnelled through
//! [`normalize`] so the rest of the crate only ever sees [`Citation`], where a
//! missing or blank field is `None` and never `Some("")`.

use serde::{Deserialize, Serialize};

/// Citation exactly as received on the wire. Unknown keys such as `score` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawCitation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Canonical citation. URLs and snippets are opaque, never validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: Option<String>,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

impl Citation {
    /// True when no field survived normalization.
    pub fn is_blank(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.snippet.is_none()
    }

    /// Display label: the title, falling back to the url.
    pub fn label(&self) -> Option<&str> {
        self.title.as_deref().or(self.url.as_deref())
    }
}

fn present(field: &Option<String>) -> Option<String> {
    field
        .as_ref()
        .filter(|value| !value.trim().is_empty())
        .cloned()
}

/// Copy every non-blank field verbatim (untrimmed); everything else becomes `None`.
pub fn normalize(raw: &RawCitation) -> Citation {
    Citation {
        title: present(&raw.title),
        url: present(&raw.url),
        snippet: present(&raw.snippet),
    }
}

/// Order-preserving. An absent list is an empty list.
pub fn normalize_many(raw: Option<&[RawCitation]>) -> Vec<Citation> {
    raw.unwrap_or_default().iter().map(normalize).collect()
}
