//! History maintenance services.

pub mod compactor;

pub use compactor::HistoryCompactor;
