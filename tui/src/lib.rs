//! Geo Explorer TUI - Terminal interface for geo-explorer
//!
//! A two-pane terminal UI: the conversation on the left (messages, citations,
//! suggestions and a composer that takes text plus one optional image) and
//! the map pane on the right.
//!
//! # Architecture
//!
//! - **App**: Event loop, key bindings and layout
//! - **ConductorClient**: Embedded Conductor (all orchestration lives there)
//! - **Display**: State derived from ConductorMessages
//! - **Commands**: Slash commands typed into the composer
//! - **MapPanel**: Map pane widget

pub mod app;
pub mod commands;
pub mod conductor_client;
pub mod display;
pub mod map_panel;
pub mod theme;

pub use app::{App, InputMode};
pub use conductor_client::ConductorClient;
