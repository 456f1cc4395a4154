use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::ErrorStore;
use super::state::{ActionResult, StoreState};
use crate::api::ApiClient;
use crate::models::{BlogPost, BlogPostInput};

const PUBLIC_POSTS_ENDPOINT: &str = "/blog/public";
const POSTS_ENDPOINT: &str = "/blog/";

#[derive(Debug)]
pub struct BlogStore {
    api: ApiClient,
    state: StoreState,
    posts: Mutex<Vec<BlogPost>>,
}

impl BlogStore {
    pub fn new(api: ApiClient, errors: Arc<ErrorStore>) -> Self {
        Self {
            api,
            state: StoreState::new("blog", errors),
            posts: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    fn posts_mut(&self) -> MutexGuard<'_, Vec<BlogPost>> {
        self.posts.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn posts(&self) -> Vec<BlogPost> {
        self.posts_mut().clone()
    }

    pub fn find(&self, id: i64) -> Option<BlogPost> {
        self.posts_mut().iter().find(|p| p.id == id).cloned()
    }

    pub async fn fetch_public_posts(&self) -> ActionResult<Vec<BlogPost>> {
        self.state
            .run("fetch_public_posts", async {
                let posts: Vec<BlogPost> = self.api.get(PUBLIC_POSTS_ENDPOINT).await?;
                *self.posts_mut() = posts.clone();
                Ok(posts)
            })
            .await
    }

    pub async fn fetch_post(&self, id: i64) -> ActionResult<BlogPost> {
        self.state
            .run("fetch_post", async {
                let post: BlogPost = self
                    .api
                    .get(&format!("{}/{}", PUBLIC_POSTS_ENDPOINT, id))
                    .await?;
                self.upsert(post.clone());
                Ok(post)
            })
            .await
    }

    /// Pessimistic: the list changes only once the server has accepted it.
    pub async fn create_post(&self, input: &BlogPostInput) -> ActionResult<BlogPost> {
        self.state
            .run("create_post", async {
                let post: BlogPost = self.api.post(POSTS_ENDPOINT, input).await?;
                self.api.invalidate(PUBLIC_POSTS_ENDPOINT);
                self.posts_mut().insert(0, post.clone());
                Ok(post)
            })
            .await
    }

    pub async fn update_post(&self, id: i64, input: &BlogPostInput) -> ActionResult<BlogPost> {
        self.state
            .run("update_post", async {
                let post: BlogPost = self.api.put(&format!("/blog/{}", id), input).await?;
                self.api.invalidate(PUBLIC_POSTS_ENDPOINT);
                self.upsert(post.clone());
                Ok(post)
            })
            .await
    }

    /// Optimistic: the post disappears at once and comes back on failure.
    pub async fn delete_post(&self, id: i64) -> ActionResult<()> {
        self.state
            .run("delete_post", async {
                let removed = {
                    let mut posts = self.posts_mut();
                    posts
                        .iter()
                        .position(|p| p.id == id)
                        .map(|index| (index, posts.remove(index)))
                };

                match self.api.delete(&format!("/blog/{}", id)).await {
                    Ok(()) => {
                        self.api.invalidate(PUBLIC_POSTS_ENDPOINT);
                        Ok(())
                    }
                    Err(err) => {
                        if let Some((index, post)) = removed {
                            let mut posts = self.posts_mut();
                            let index = index.min(posts.len());
                            posts.insert(index, post);
                        }
                        Err(err)
                    }
                }
            })
            .await
    }

    fn upsert(&self, post: BlogPost) {
        let mut posts = self.posts_mut();
        match posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post,
            None => posts.push(post),
        }
    }
}
