use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::try_join_all;
use serde_json::Value;

use super::errors::ErrorStore;
use super::state::{ActionResult, StoreState};
use crate::api::{ApiClient, RequestOptions};
use crate::models::{EndpointCheck, HealthStatus};

const HEALTH_ENDPOINT: &str = "/health";

#[derive(Debug)]
pub struct SystemStore {
    api: ApiClient,
    state: StoreState,
    health: Mutex<Option<HealthStatus>>,
}

impl SystemStore {
    pub fn new(api: ApiClient, errors: Arc<ErrorStore>) -> Self {
        Self {
            api,
            state: StoreState::new("system", errors),
            health: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn last_health(&self) -> Option<HealthStatus> {
        self.health.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn check_health(&self) -> ActionResult<HealthStatus> {
        self.state
            .run("check_health", async {
                let status: HealthStatus = self.api.get_fresh(HEALTH_ENDPOINT).await?;
                *self.health.lock().unwrap_or_else(|e| e.into_inner()) = Some(status.clone());
                Ok(status)
            })
            .await
    }

    /// Probe several endpoints concurrently. All-or-nothing: the first
    /// failure fails the whole check.
    pub async fn test_endpoints(&self, endpoints: &[&str]) -> ActionResult<Vec<EndpointCheck>> {
        self.state
            .run("test_endpoints", async {
                let probes = endpoints.iter().map(|endpoint| async move {
                    let started = Instant::now();
                    self.api
                        .request(endpoint, RequestOptions::get().no_cache())
                        .await?
                        .into_value()
                        .map(|_: Value| EndpointCheck {
                            endpoint: endpoint.to_string(),
                            elapsed_ms: started.elapsed().as_millis() as u64,
                        })
                });
                try_join_all(probes).await
            })
            .await
    }
}
