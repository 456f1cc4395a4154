use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::ErrorStore;
use super::state::{ActionResult, StoreState};
use crate::api::ApiClient;
use crate::models::{PortfolioInput, PortfolioItem};

const PUBLIC_PORTFOLIO_ENDPOINT: &str = "/blog/portfolio/public";
const PORTFOLIO_ENDPOINT: &str = "/blog/portfolio";

#[derive(Debug)]
pub struct PortfolioStore {
    api: ApiClient,
    state: StoreState,
    items: Mutex<Vec<PortfolioItem>>,
}

impl PortfolioStore {
    pub fn new(api: ApiClient, errors: Arc<ErrorStore>) -> Self {
        Self {
            api,
            state: StoreState::new("portfolio", errors),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    fn items_mut(&self) -> MutexGuard<'_, Vec<PortfolioItem>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn items(&self) -> Vec<PortfolioItem> {
        self.items_mut().clone()
    }

    /// Featured items first, then by sort order
    pub fn featured_first(&self) -> Vec<PortfolioItem> {
        let mut items = self.items();
        items.sort_by_key(|item| (!item.featured, item.sort_order.unwrap_or(i32::MAX)));
        items
    }

    pub async fn fetch_public(&self) -> ActionResult<Vec<PortfolioItem>> {
        self.state
            .run("fetch_public", async {
                let items: Vec<PortfolioItem> = self.api.get(PUBLIC_PORTFOLIO_ENDPOINT).await?;
                *self.items_mut() = items.clone();
                Ok(items)
            })
            .await
    }

    pub async fn create_item(&self, input: &PortfolioInput) -> ActionResult<PortfolioItem> {
        self.state
            .run("create_item", async {
                let item: PortfolioItem = self.api.post(PORTFOLIO_ENDPOINT, input).await?;
                self.api.invalidate(PORTFOLIO_ENDPOINT);
                self.items_mut().push(item.clone());
                Ok(item)
            })
            .await
    }

    pub async fn update_item(&self, id: i64, input: &PortfolioInput) -> ActionResult<PortfolioItem> {
        self.state
            .run("update_item", async {
                let item: PortfolioItem = self
                    .api
                    .put(&format!("{}/{}", PORTFOLIO_ENDPOINT, id), input)
                    .await?;
                self.api.invalidate(PORTFOLIO_ENDPOINT);
                let mut items = self.items_mut();
                match items.iter_mut().find(|i| i.id == id) {
                    Some(existing) => *existing = item.clone(),
                    None => items.push(item.clone()),
                }
                Ok(item)
            })
            .await
    }

    pub async fn delete_item(&self, id: i64) -> ActionResult<()> {
        self.state
            .run("delete_item", async {
                self.api.delete(&format!("{}/{}", PORTFOLIO_ENDPOINT, id)).await?;
                self.api.invalidate(PORTFOLIO_ENDPOINT);
                self.items_mut().retain(|i| i.id != id);
                Ok(())
            })
            .await
    }
}
