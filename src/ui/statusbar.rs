use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

pub struct StatusBar {
    pub message: String,
    pub is_error: bool,
}

impl StatusBar {
    pub fn new() -> Self {
        Self {
            message: String::new(),
            is_error: false,
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.is_error = false;
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.is_error = true;
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let (marker, marker_color) = if self.is_error {
            ("✗", Color::Red)
        } else {
            ("●", Color::Green)
        };

        let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
        let mut spans = vec![
            Span::styled(format!("{} ", marker), Style::default().fg(marker_color)),
            key("Q"),
            Span::raw(":Quit "),
            key("↑↓"),
            Span::raw(":Nav "),
            key("Enter"),
            Span::raw(":Load "),
            key("Tab"),
            Span::raw(":View "),
            key("[ ]"),
            Span::raw(":Lookback "),
            key("+/-"),
            Span::raw(":Zoom "),
            key("←→"),
            Span::raw(":Pan "),
            key("< >"),
            Span::raw(":Bin"),
        ];

        if !self.message.is_empty() {
            let color = if self.is_error { Color::Red } else { Color::White };
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(self.message.clone(), Style::default().fg(color)));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)).block(Block::default()), area);
    }
}
