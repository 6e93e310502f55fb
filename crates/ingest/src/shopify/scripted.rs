//! A [`PageSource`] that replays canned pages, for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use shop_insights_core::ResourceType;

use super::{Cursor, Page, PageSource, ShopifyError};
use crate::models::StoreCredential;

/// Replays scripted responses in order and records the cursors requested.
///
/// Once the script runs out every fetch fails with
/// [`ShopifyError::InvalidResponse`].
#[derive(Debug, Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Page, ShopifyError>>>,
    requested: Mutex<Vec<Option<Cursor>>>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(responses: Vec<Result<Page, ShopifyError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requested: Mutex::default(),
        }
    }

    /// Cursors passed to each fetch, in order.
    pub async fn requested(&self) -> Vec<Option<Cursor>> {
        self.requested.lock().await.clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(
        &self,
        _credential: &StoreCredential,
        _resource: ResourceType,
        cursor: Option<&Cursor>,
    ) -> Result<Page, ShopifyError> {
        self.requested.lock().await.push(cursor.cloned());
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ShopifyError::InvalidResponse("script exhausted".into())))
    }
}
