//! Backend-agnostic data table engine.
//!
//! Provides a pluggable [`DataSource`](source::DataSource) contract with
//! caching, retry and export layered on top by
//! [`BaseDataSource`](source::BaseDataSource), a client-side
//! [`FilterEngine`](filter::FilterEngine) over JSON rows, a multi-mode
//! [`SelectionManager`](selection::SelectionManager), and a responsive
//! [`ViewModeManager`](view_mode::ViewModeManager).

pub mod cache;
pub mod error;
pub mod export;
pub mod filter;
pub mod query;
pub mod response;
pub mod retry;
pub mod selection;
pub mod source;
pub mod view_mode;

pub use error::DataSourceError;
pub use query::DataSourceQuery;
pub use response::CacheStatus;
pub use response::DataSourceResponse;
pub use source::DataSource;
