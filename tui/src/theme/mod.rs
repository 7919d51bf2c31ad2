//! Theme and Colors
//!
//! Geo Explorer's palette: map-ish greens and blues for the map pane, a warm
//! accent for the assistant and dim grays for chrome.

use ratatui::style::Color;

// ============================================================================
// Conversation
// ============================================================================

/// User messages
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// Assistant messages
pub const ASSISTANT_AMBER: Color = Color::Rgb(255, 196, 112);

/// Failed turns and error notifications
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Citation links
pub const CITATION_BLUE: Color = Color::Rgb(120, 170, 255);

/// Suggestion entries
pub const SUGGESTION_CYAN: Color = Color::Rgb(110, 215, 215);

// ============================================================================
// Map Pane
// ============================================================================

/// Map pane border and title
pub const MAP_GREEN: Color = Color::Rgb(96, 180, 120);

/// Route endpoints
pub const ROUTE_BLUE: Color = Color::Rgb(100, 180, 255);

// ============================================================================
// Chrome
// ============================================================================

/// Borders, hints, status text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Scroll fade
pub const FADE_GRAY: Color = Color::Rgb(80, 80, 80);

/// Warning notifications
pub const WARNING_YELLOW: Color = Color::Rgb(240, 200, 80);

/// Attachment badge in the composer
pub const ATTACHMENT_MAGENTA: Color = Color::Magenta;
