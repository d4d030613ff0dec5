pub mod chart;
pub mod heatmap;
pub mod layout;
pub mod lookback;
pub mod statusbar;

pub use chart::Chart;
pub use heatmap::HeatMap;
pub use layout::{LayoutManager, View};
pub use lookback::LookbackSelector;
pub use statusbar::StatusBar;
