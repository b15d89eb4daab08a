//! Domain types for Kabulab.

pub mod history;
pub mod metrics;
pub mod portfolio;
pub mod position;

pub use history::{DailyBar, PriceHistory};
pub use metrics::{is_cash_symbol, StockMetrics};
pub use portfolio::{FxRates, PortfolioSnapshot, Quote, ValuedPosition};
pub use position::{
    lot_size, merge_positions, Position, PositionBook, PositionError, RealizedSale,
};
