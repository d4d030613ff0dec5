use crate::analysis::Lookback;
use crate::ui::{Chart, HeatMap, LookbackSelector, StatusBar};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Fibonacci,
    HeatMap,
}

impl View {
    pub fn toggle(self) -> Self {
        match self {
            View::Fibonacci => View::HeatMap,
            View::HeatMap => View::Fibonacci,
        }
    }
}

pub struct LayoutManager {
    pub watchlist: Vec<String>,
    pub selected_symbol: usize,
    /// Last cached close and its change against the prior bar.
    pub last_closes: HashMap<String, (f64, f64)>,
    pub statusbar: StatusBar,
    pub lookback: LookbackSelector,
}

impl LayoutManager {
    pub fn new(watchlist: Vec<String>, selected_symbol: usize, lookback: Lookback) -> Self {
        let selected_symbol = selected_symbol.min(watchlist.len().saturating_sub(1));
        Self {
            watchlist,
            selected_symbol,
            last_closes: HashMap::new(),
            statusbar: StatusBar::new(),
            lookback: LookbackSelector::from_lookback(lookback),
        }
    }

    pub fn select_next(&mut self) {
        if !self.watchlist.is_empty() {
            self.selected_symbol = (self.selected_symbol + 1) % self.watchlist.len();
        }
    }

    pub fn select_prev(&mut self) {
        if !self.watchlist.is_empty() {
            self.selected_symbol = if self.selected_symbol == 0 {
                self.watchlist.len() - 1
            } else {
                self.selected_symbol - 1
            };
        }
    }

    pub fn selected(&self) -> Option<&String> {
        self.watchlist.get(self.selected_symbol)
    }

    pub fn render(&self, frame: &mut Frame, view: View, chart: &Chart, heatmap: &HeatMap, area: Rect) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(1),
            ])
            .split(area);

        self.lookback.render(frame, main_chunks[0]);

        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(22), Constraint::Min(40)])
            .split(main_chunks[1]);

        self.render_watchlist(frame, content_chunks[0], &chart.symbol);
        match view {
            View::Fibonacci => chart.render(frame, content_chunks[1]),
            View::HeatMap => heatmap.render(frame, content_chunks[1]),
        }
        self.statusbar.render(frame, main_chunks[2]);
    }

    fn render_watchlist(&self, frame: &mut Frame, area: Rect, current: &str) {
        let items: Vec<ListItem> = self
            .watchlist
            .iter()
            .enumerate()
            .map(|(idx, symbol)| {
                let style = if symbol == current {
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else if idx == self.selected_symbol {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::White)
                };
                let marker = if idx == self.selected_symbol { "> " } else { "  " };

                match self.last_closes.get(symbol) {
                    Some((close, change_pct)) => {
                        let change_color = if *change_pct >= 0.0 {
                            Color::Green
                        } else {
                            Color::Red
                        };
                        ListItem::new(Line::from(vec![
                            Span::styled(format!("{}{:<5} {:.2} ", marker, symbol, close), style),
                            Span::styled(
                                format!("{:+.1}%", change_pct),
                                Style::default().fg(change_color),
                            ),
                        ]))
                    }
                    None => ListItem::new(Line::from(vec![
                        Span::styled(format!("{}{}", marker, symbol), style),
                        Span::styled(" ...", Style::default().fg(Color::Gray)),
                    ])),
                }
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .title("Watchlist")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        );
        frame.render_widget(list, area);
    }
}
