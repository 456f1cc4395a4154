use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::ErrorStore;
use super::state::{ActionResult, StoreState};
use crate::api::{ApiClient, ApiError};
use crate::models::{Tag, TagInput};

const TAGS_ENDPOINT: &str = "/blog/tags";

#[derive(Debug)]
pub struct TagStore {
    api: ApiClient,
    state: StoreState,
    tags: Mutex<Vec<Tag>>,
}

impl TagStore {
    pub fn new(api: ApiClient, errors: Arc<ErrorStore>) -> Self {
        Self {
            api,
            state: StoreState::new("tag", errors),
            tags: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    fn tags_mut(&self) -> MutexGuard<'_, Vec<Tag>> {
        self.tags.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.tags_mut().clone()
    }

    pub async fn fetch_tags(&self) -> ActionResult<Vec<Tag>> {
        self.state
            .run("fetch_tags", async {
                let mut tags: Vec<Tag> = self.api.get(TAGS_ENDPOINT).await?;
                tags.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
                *self.tags_mut() = tags.clone();
                Ok(tags)
            })
            .await
    }

    pub async fn create_tag(&self, input: &TagInput) -> ActionResult<Tag> {
        self.state
            .run("create_tag", async {
                let name = input.name.trim();
                if name.is_empty() {
                    return Err(ApiError::Validation("Tag name is required".to_string()));
                }
                let duplicate = self
                    .tags_mut()
                    .iter()
                    .any(|t| t.name.eq_ignore_ascii_case(name));
                if duplicate {
                    return Err(ApiError::Validation(format!("Tag \"{}\" already exists", name)));
                }

                let tag: Tag = self.api.post(TAGS_ENDPOINT, input).await?;
                self.api.invalidate(TAGS_ENDPOINT);
                self.tags_mut().push(tag.clone());
                Ok(tag)
            })
            .await
    }

    pub async fn delete_tag(&self, id: i64) -> ActionResult<()> {
        self.state
            .run("delete_tag", async {
                self.api.delete(&format!("{}/{}", TAGS_ENDPOINT, id)).await?;
                self.api.invalidate(TAGS_ENDPOINT);
                self.tags_mut().retain(|t| t.id != id);
                Ok(())
            })
            .await
    }
}
