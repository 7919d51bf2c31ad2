//! Response Directives
//!
//! The system instructions ask the model to end a reply with one machine-readable
//! directive block telling the surface what the map should show:
//!
//! ```text
//! DIRECTIONS_QUERY: {"origin": "...", "destination": "..."}
//! MAP_QUERY: <place or address>
//! SUGGESTIONS:
//! <candidate 1>
//! <candidate 2>
//! ```
//!
//! [`parse_turn`] runs on the complete text of a finished assistant turn and
//! splits it into display text, an optional [`MapIntent`] and optional
//! suggestions. Rules are tried in the order above and the first match wins.
//! Every directive extends to the end of the text, so only a trailing block is
//! understood; prose after a directive is swallowed by it.
//!
//! The keywords are a contract with the prompt text in [`crate::prompts`];
//! change both together.

use serde::{Deserialize, Serialize};

/// Directions directive keyword
pub const DIRECTIONS_KEYWORD: &str = "DIRECTIONS_QUERY:";
/// Single-place directive keyword
pub const MAP_QUERY_KEYWORD: &str = "MAP_QUERY:";
/// Candidate-list directive keyword
pub const SUGGESTIONS_KEYWORD: &str = "SUGGESTIONS:";

/// Query value meaning "a search was attempted but found no single place"
pub const NO_RESULT_QUERY: &str = "__NO_RESULT__";

/// What the map pane should show
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapIntent {
    /// Show a place search
    Search {
        /// Place name or address (or [`NO_RESULT_QUERY`])
        query: String,
    },
    /// Show a route
    Directions {
        /// Route start
        origin: String,
        /// Route end
        destination: String,
    },
}

impl MapIntent {
    /// A place search
    pub fn search(query: impl Into<String>) -> Self {
        Self::Search {
            query: query.into(),
        }
    }

    /// The "searched but nothing resolvable" sentinel
    #[must_use]
    pub fn no_result() -> Self {
        Self::search(NO_RESULT_QUERY)
    }

    /// Whether this is the sentinel search
    #[must_use]
    pub fn is_no_result(&self) -> bool {
        matches!(self, Self::Search { query } if query == NO_RESULT_QUERY)
    }
}

/// Result of parsing one completed assistant turn
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTurn {
    /// Text to show in the conversation (directive removed)
    pub display_text: String,
    /// New map intent; `None` leaves the map untouched
    pub map_intent: Option<MapIntent>,
    /// Candidate places to offer the user
    pub suggestions: Option<Vec<String>>,
}

impl ParsedTurn {
    /// A turn without any directive
    fn plain(text: &str) -> Self {
        Self {
            display_text: text.to_string(),
            map_intent: None,
            suggestions: None,
        }
    }
}

#[derive(Deserialize)]
struct DirectionsPayload {
    origin: String,
    destination: String,
}

/// Split a finished turn into display text, map intent and suggestions
#[must_use]
pub fn parse_turn(text: &str) -> ParsedTurn {
    parse_directions(text)
        .or_else(|| parse_map_query(text))
        .or_else(|| parse_suggestions(text))
        .unwrap_or_else(|| ParsedTurn::plain(text))
}

/// `DIRECTIONS_QUERY:` ... `{` ... `}`
///
/// The JSON body runs from the first `{` after the keyword to the last `}` in
/// the text. A body that does not decode still consumes the directive but
/// degrades to the no-result search.
fn parse_directions(text: &str) -> Option<ParsedTurn> {
    let start = text.find(DIRECTIONS_KEYWORD)?;
    let after_keyword = start + DIRECTIONS_KEYWORD.len();
    let open = after_keyword + text[after_keyword..].find('{')?;
    let close = text.rfind('}')?;
    if close < open {
        return None;
    }

    let payload = &text[open..=close];
    let map_intent = match serde_json::from_str::<DirectionsPayload>(payload) {
        Ok(DirectionsPayload {
            origin,
            destination,
        }) => MapIntent::Directions {
            origin,
            destination,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Malformed directions payload, showing no result");
            MapIntent::no_result()
        }
    };

    Some(ParsedTurn {
        display_text: remove_span(text, start, close + 1),
        map_intent: Some(map_intent),
        suggestions: None,
    })
}

/// `MAP_QUERY:` <free text to end>
fn parse_map_query(text: &str) -> Option<ParsedTurn> {
    let (start, rest) = directive_tail(text, MAP_QUERY_KEYWORD)?;

    Some(ParsedTurn {
        display_text: text[..start].trim().to_string(),
        map_intent: Some(MapIntent::search(rest.trim())),
        suggestions: None,
    })
}

/// `SUGGESTIONS:` <one entry per line to end>
fn parse_suggestions(text: &str) -> Option<ParsedTurn> {
    let (start, rest) = directive_tail(text, SUGGESTIONS_KEYWORD)?;

    let entries: Vec<String> = rest
        .split('\n')
        .map(|line| line.replace('`', "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    Some(ParsedTurn {
        display_text: text[..start].trim().to_string(),
        map_intent: Some(MapIntent::no_result()),
        suggestions: (!entries.is_empty()).then_some(entries),
    })
}

/// Position of `keyword` and the non-empty text following it
fn directive_tail<'a>(text: &'a str, keyword: &str) -> Option<(usize, &'a str)> {
    let start = text.find(keyword)?;
    let rest = &text[start + keyword.len()..];
    if rest.is_empty() {
        return None;
    }
    Some((start, rest))
}

/// `text` without `[start, end)`, trimmed
fn remove_span(text: &str, start: usize, end: usize) -> String {
    let mut out = String::with_capacity(text.len() - (end - start));
    out.push_str(&text[..start]);
    out.push_str(&text[end..]);
    out.trim().to_string()
}
