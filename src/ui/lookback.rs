use crate::analysis::Lookback;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub struct LookbackSelector {
    pub lookbacks: Vec<Lookback>,
    pub selected: usize,
}

impl LookbackSelector {
    pub fn from_lookback(lookback: Lookback) -> Self {
        let lookbacks = Lookback::all();
        let selected = lookbacks.iter().position(|l| *l == lookback).unwrap_or(0);
        Self {
            lookbacks,
            selected,
        }
    }

    pub fn current(&self) -> Lookback {
        self.lookbacks[self.selected]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % self.lookbacks.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = if self.selected == 0 {
            self.lookbacks.len() - 1
        } else {
            self.selected - 1
        };
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Lookback")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let text: Vec<Span> = self
            .lookbacks
            .iter()
            .enumerate()
            .flat_map(|(idx, lb)| {
                let style = if idx == self.selected {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().fg(Color::White)
                };
                vec![
                    Span::styled(lb.label(), style),
                    if idx < self.lookbacks.len() - 1 {
                        Span::raw(" ")
                    } else {
                        Span::raw("")
                    },
                ]
            })
            .collect();

        let para = Paragraph::new(Line::from(text)).alignment(ratatui::layout::Alignment::Center);
        frame.render_widget(para, inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_both_ways() {
        let mut selector = LookbackSelector::from_lookback(Lookback::All);
        assert_eq!(selector.current(), Lookback::All);
        selector.select_next();
        assert_eq!(selector.current(), Lookback::OneMonth);
        selector.select_prev();
        selector.select_prev();
        assert_eq!(selector.current(), Lookback::TwoYears);
    }
}
