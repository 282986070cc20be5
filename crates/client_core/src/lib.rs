//! Client-side access to the field-monitoring backend: paginated list controllers and the
//! HTTP transport they fetch through.

pub mod config;
pub mod fetcher;
pub mod list;
pub mod transport;

pub use config::{load_settings, ClientSettings};
pub use fetcher::{FnFetcher, MissingPageFetcher, PageFetcher};
pub use list::{FetchOutcome, ListController, ListEvent, ListOptions, ListState};
pub use transport::{ApiClient, HttpPageFetcher};
