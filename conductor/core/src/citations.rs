//! Grounding Citations
//!
//! The chat backend grounds its answers with web and maps search. Each stream
//! chunk may carry a batch of grounding chunks; over one turn they are folded
//! into a [`CitationSet`] keyed by URI. A later sighting of a URI replaces the
//! earlier entry's title and kind but keeps its position.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a citation came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitationKind {
    /// Web search result
    Web,
    /// Maps place result
    Map,
}

impl CitationKind {
    /// Short label for rendering
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Map => "map",
        }
    }
}

/// A source link surfaced by the grounded chat backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source URI (unique key)
    pub uri: String,
    /// Display title (falls back to the URI)
    pub title: String,
    /// Source kind
    pub kind: CitationKind,
}

impl Citation {
    /// Create a citation
    pub fn new(uri: impl Into<String>, title: impl Into<String>, kind: CitationKind) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            kind,
        }
    }

    /// Convert one `groundingChunks[]` entry
    ///
    /// Accepts `{"web": {"uri", "title"}}` or `{"maps": {"uri", "title"}}`.
    /// Anything else (or an entry without a URI) yields `None`.
    #[must_use]
    pub fn from_grounding_chunk(chunk: &Value) -> Option<Self> {
        let (source, kind) = if let Some(web) = chunk.get("web") {
            (web, CitationKind::Web)
        } else if let Some(maps) = chunk.get("maps") {
            (maps, CitationKind::Map)
        } else {
            return None;
        };

        let uri = source.get("uri")?.as_str()?.to_string();
        let title = source
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map_or_else(|| uri.clone(), ToString::to_string);

        Some(Self { uri, title, kind })
    }
}

/// Citations for one turn, deduplicated by URI
#[derive(Clone, Debug, Default)]
pub struct CitationSet {
    entries: IndexMap<String, Citation>,
}

impl CitationSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of citations into the set (last write per URI wins)
    pub fn merge<I>(&mut self, citations: I)
    where
        I: IntoIterator<Item = Citation>,
    {
        for citation in citations {
            self.entries.insert(citation.uri.clone(), citation);
        }
    }

    /// Current citations in first-seen order
    #[must_use]
    pub fn to_vec(&self) -> Vec<Citation> {
        self.entries.values().cloned().collect()
    }

    /// Number of distinct URIs
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no citations have been seen
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
