use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use shared::{
    error::FetchError,
    protocol::{PageQuery, RawPage},
};

/// The asynchronous "fetch one page" operation a [`crate::ListController`] drives.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, query: PageQuery) -> Result<RawPage, FetchError>;
}

#[async_trait]
impl<T> PageFetcher for Arc<T>
where
    T: PageFetcher + ?Sized,
{
    async fn fetch_page(&self, query: PageQuery) -> Result<RawPage, FetchError> {
        (**self).fetch_page(query).await
    }
}

/// Adapts an async closure into a [`PageFetcher`].
pub struct FnFetcher<F> {
    fetch: F,
}

impl<F> FnFetcher<F> {
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl<F, Fut> PageFetcher for FnFetcher<F>
where
    F: Fn(PageQuery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RawPage, FetchError>> + Send,
{
    async fn fetch_page(&self, query: PageQuery) -> Result<RawPage, FetchError> {
        (self.fetch)(query).await
    }
}

/// Fetcher used when a list is rendered before its data source is known.
pub struct MissingPageFetcher;

#[async_trait]
impl PageFetcher for MissingPageFetcher {
    async fn fetch_page(&self, _query: PageQuery) -> Result<RawPage, FetchError> {
        Err(FetchError::other("no data source configured for this list"))
    }
}
