//! Traffic-fine dashboard: loads a `;`-separated fine ledger, normalizes
//! amounts, dates and observations, joins suppliers to regions and builds
//! the dashboard panels for whatever filters are active.
pub mod cache;
pub mod columns;
pub mod config;
pub mod error;
pub mod filter;
pub mod geo;
pub mod loader;
pub mod output;
pub mod reason;
pub mod reports;
pub mod search;
pub mod table_filter;
pub mod types;
pub mod util;

pub use error::Error;
