pub mod bar;
pub mod fetch;
pub mod store;

pub use bar::Bar;
pub use fetch::TwelveDataClient;
