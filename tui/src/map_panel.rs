//! Map Pane
//!
//! A terminal cannot embed the map itself, so the pane shows what the map
//! would load: the searched place or the route, and the embed URL to open in
//! a browser. The reload generation is shown so a recenter is visible.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};

use geo_conductor::{MapTarget, MapView};

use crate::theme::{DIM_GRAY, MAP_GREEN, ROUTE_BLUE};

/// Renders a [`MapView`]
pub struct MapPanel<'a> {
    view: &'a MapView,
}

impl<'a> MapPanel<'a> {
    /// Panel for `view`
    pub fn new(view: &'a MapView) -> Self {
        Self { view }
    }

    /// The pane's text lines
    pub fn lines(&self) -> Vec<Line<'a>> {
        let label = Style::default().fg(DIM_GRAY);
        let value = Style::default().fg(ROUTE_BLUE).add_modifier(Modifier::BOLD);

        let view = self.view;
        let mut lines = match &view.target {
            MapTarget::Placeholder { reason } => vec![
                Line::from(Span::styled(reason.title(), Style::default().add_modifier(Modifier::BOLD))),
                Line::from(Span::styled(reason.detail(), label)),
            ],
            MapTarget::Search { query, .. } => vec![
                Line::from(Span::styled("Place", label)),
                Line::from(Span::styled(query.as_str(), value)),
            ],
            MapTarget::Route {
                origin,
                destination,
                ..
            } => vec![
                Line::from(vec![Span::styled("From ", label), Span::styled(origin.as_str(), value)]),
                Line::from(vec![Span::styled("To   ", label), Span::styled(destination.as_str(), value)]),
            ],
        };

        if let Some(url) = view.target.embed_url() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled("Open in a browser:", label)));
            lines.push(Line::from(url.to_string()));
        }
        lines
    }
}

impl Widget for MapPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(" Map · view {} ", self.view.generation);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(MAP_GREEN))
            .title(Span::styled(title, Style::default().fg(MAP_GREEN)));

        Paragraph::new(self.lines())
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
