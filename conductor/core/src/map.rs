//! Map View Controller
//!
//! Holds the single live [`MapIntent`] and derives what the map pane shows from
//! it. The derivation ([`target_for`]) is a pure function; the controller only
//! adds the reload generation, which is bumped on every intent change and on a
//! manual recenter so a surface knows to reload its embedded view.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::directive::{MapIntent, NO_RESULT_QUERY};

/// Base URL for embedded map views
pub const MAPS_EMBED_BASE: &str = "https://maps.google.com/maps";

/// Why the map pane has nothing to show
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceholderReason {
    /// No place or route has been requested yet
    NoSearchYet,
    /// A search ran but found no single place
    NothingFound,
}

impl PlaceholderReason {
    /// Headline shown in the placeholder
    #[must_use]
    pub fn title(&self) -> &'static str {
        "No location to display"
    }

    /// Explanation shown under the headline
    #[must_use]
    pub fn detail(&self) -> &'static str {
        match self {
            Self::NoSearchYet => "Find a place or route to see it on the map.",
            Self::NothingFound => "Could not determine a specific location.",
        }
    }
}

/// What the map pane renders
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapTarget {
    /// Nothing to display
    Placeholder {
        /// Which placeholder text to show
        reason: PlaceholderReason,
    },
    /// A place search
    Search {
        /// The searched place
        query: String,
        /// Embeddable map URL
        embed_url: String,
    },
    /// A route
    Route {
        /// Route start
        origin: String,
        /// Route end
        destination: String,
        /// Embeddable map URL
        embed_url: String,
    },
}

impl MapTarget {
    /// The embeddable URL, if there is anything to show
    #[must_use]
    pub fn embed_url(&self) -> Option<&str> {
        match self {
            Self::Placeholder { .. } => None,
            Self::Search { embed_url, .. } | Self::Route { embed_url, .. } => Some(embed_url),
        }
    }
}

/// A map target plus its reload generation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapView {
    /// What to show
    pub target: MapTarget,
    /// Incremented whenever the view must be reloaded
    pub generation: u64,
}

/// Derive the map target for an intent
#[must_use]
pub fn target_for(intent: Option<&MapIntent>) -> MapTarget {
    match intent {
        None => MapTarget::Placeholder {
            reason: PlaceholderReason::NoSearchYet,
        },
        Some(MapIntent::Search { query }) if query == NO_RESULT_QUERY => MapTarget::Placeholder {
            reason: PlaceholderReason::NothingFound,
        },
        Some(MapIntent::Search { query }) if query.trim().is_empty() => MapTarget::Placeholder {
            reason: PlaceholderReason::NoSearchYet,
        },
        Some(MapIntent::Search { query }) => MapTarget::Search {
            query: query.clone(),
            embed_url: search_embed_url(query),
        },
        Some(MapIntent::Directions {
            origin,
            destination,
        }) => MapTarget::Route {
            origin: origin.clone(),
            destination: destination.clone(),
            embed_url: directions_embed_url(origin, destination),
        },
    }
}

/// Embed URL for a place search
#[must_use]
pub fn search_embed_url(query: &str) -> String {
    let params = form_urlencoded::Serializer::new(String::new())
        .append_pair("q", query)
        .append_pair("t", "")
        .append_pair("z", "15")
        .append_pair("ie", "UTF8")
        .append_pair("iwloc", "")
        .append_pair("output", "embed")
        .finish();
    format!("{MAPS_EMBED_BASE}?{params}")
}

/// Embed URL for a route
#[must_use]
pub fn directions_embed_url(origin: &str, destination: &str) -> String {
    let params = form_urlencoded::Serializer::new(String::new())
        .append_pair("saddr", origin)
        .append_pair("daddr", destination)
        .append_pair("output", "embed")
        .finish();
    format!("{MAPS_EMBED_BASE}?{params}")
}

/// Owner of the live map intent
#[derive(Clone, Debug, Default)]
pub struct MapViewController {
    intent: Option<MapIntent>,
    generation: u64,
}

impl MapViewController {
    /// Create a controller with nothing on the map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The live intent
    #[must_use]
    pub fn intent(&self) -> Option<&MapIntent> {
        self.intent.as_ref()
    }

    /// Apply a parsed turn's intent; `None` leaves the map as it is
    ///
    /// Returns whether the view changed.
    pub fn apply(&mut self, intent: Option<MapIntent>) -> bool {
        match intent {
            Some(intent) => {
                self.set_intent(intent);
                true
            }
            None => false,
        }
    }

    /// Replace the live intent
    pub fn set_intent(&mut self, intent: MapIntent) {
        tracing::debug!(intent = ?intent, "Map intent changed");
        self.intent = Some(intent);
        self.generation += 1;
    }

    /// Force the view to reload without changing the intent
    pub fn recenter(&mut self) {
        self.generation += 1;
    }

    /// Back to "no search yet"
    pub fn clear(&mut self) {
        self.intent = None;
        self.generation += 1;
    }

    /// Current view
    #[must_use]
    pub fn view(&self) -> MapView {
        MapView {
            target: target_for(self.intent.as_ref()),
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_placeholders_distinguish_no_search_from_nothing_found() {
        assert_eq!(
            target_for(None),
            MapTarget::Placeholder {
                reason: PlaceholderReason::NoSearchYet
            }
        );
        assert_eq!(
            target_for(Some(&MapIntent::no_result())),
            MapTarget::Placeholder {
                reason: PlaceholderReason::NothingFound
            }
        );
        assert_eq!(
            target_for(Some(&MapIntent::search("  "))),
            MapTarget::Placeholder {
                reason: PlaceholderReason::NoSearchYet
            }
        );
    }

    #[test]
    fn test_search_and_route_urls() {
        let target = target_for(Some(&MapIntent::search("Eiffel Tower, Paris")));
        assert_eq!(
            target.embed_url(),
            Some("https://maps.google.com/maps?q=Eiffel+Tower%2C+Paris&t=&z=15&ie=UTF8&iwloc=&output=embed")
        );

        let route = target_for(Some(&MapIntent::Directions {
            origin: "A & B".to_string(),
            destination: "C".to_string(),
        }));
        assert_eq!(
            route.embed_url(),
            Some("https://maps.google.com/maps?saddr=A+%26+B&daddr=C&output=embed")
        );
    }

    #[test]
    fn test_apply_none_keeps_intent() {
        let mut map = MapViewController::new();
        map.set_intent(MapIntent::search("Rome"));
        let before = map.view();

        assert!(!map.apply(None));
        assert_eq!(map.view(), before);
        assert_eq!(map.intent(), Some(&MapIntent::search("Rome")));
    }

    #[test]
    fn test_recenter_bumps_generation_only() {
        let mut map = MapViewController::new();
        map.set_intent(MapIntent::search("Rome"));
        let before = map.view();

        map.recenter();
        let after = map.view();
        assert_eq!(after.target, before.target);
        assert_eq!(after.generation, before.generation + 1);
    }

    #[test]
    fn test_clear() {
        let mut map = MapViewController::new();
        map.set_intent(MapIntent::search("Rome"));
        map.clear();
        assert!(map.intent().is_none());
        assert_eq!(
            map.view().target,
            MapTarget::Placeholder {
                reason: PlaceholderReason::NoSearchYet
            }
        );
    }
}
