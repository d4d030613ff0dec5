pub mod fibonacci;
pub mod heatmap;
pub mod indicators;
pub mod window;

pub use fibonacci::FibLevel;
pub use heatmap::VolumeGrid;
pub use indicators::MovingAverages;
pub use window::Lookback;
