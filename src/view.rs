use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::api::PostService;
use crate::error::ApiError;
use crate::feed::FeedResult;
use crate::model::{Comment, Post, PostId, ViewerIdentity, validate_comment_body};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeToggle {
    Confirmed(Post),
    // Accepted, but the re-fetch failed; counters are the pre-toggle ones.
    Unconfirmed,
    Suppressed,
}

pub struct FeedView {
    api: PostService,
    viewer: Option<ViewerIdentity>,
    // Never held across an await.
    feed: Mutex<FeedResult>,
    in_flight: Mutex<HashSet<PostId>>,
}

impl FeedView {
    pub fn new(api: PostService, viewer: Option<ViewerIdentity>) -> Self {
        Self {
            api,
            viewer,
            feed: Mutex::new(FeedResult::default()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn api(&self) -> &PostService {
        &self.api
    }

    pub fn viewer(&self) -> Option<&ViewerIdentity> {
        self.viewer.as_ref()
    }

    pub fn snapshot(&self) -> FeedResult {
        lock(&self.feed).clone()
    }

    pub fn replace(&self, feed: FeedResult) {
        *lock(&self.feed) = feed;
    }

    pub(crate) fn update(&self, f: impl FnOnce(FeedResult) -> FeedResult) {
        let mut feed = lock(&self.feed);
        let current = std::mem::take(&mut *feed);
        *feed = f(current);
    }

    pub(crate) fn require_viewer(&self) -> Result<&ViewerIdentity, ApiError> {
        self.viewer.as_ref().ok_or(ApiError::NotLoggedIn)
    }

    pub async fn toggle_like(&self, post_id: PostId) -> Result<LikeToggle, ApiError> {
        let viewer = self.require_viewer()?;
        let Some(_guard) = InFlight::begin(&self.in_flight, post_id) else {
            tracing::debug!(post_id, "like toggle already in flight; suppressed");
            return Ok(LikeToggle::Suppressed);
        };

        let liked = lock(&self.feed)
            .get(post_id)
            .map(|p| p.liked_by_viewer)
            .ok_or(ApiError::UnknownPost(post_id))?;

        if liked {
            self.api.unlike(post_id, viewer.user_id).await?;
        } else {
            self.api.like(post_id, viewer.user_id).await?;
        }
        tracing::debug!(post_id, liked = !liked, "like toggle accepted");

        Ok(match self.refetch(post_id).await {
            Some(post) => LikeToggle::Confirmed(post),
            None => LikeToggle::Unconfirmed,
        })
    }

    pub async fn delete_post(&self, post_id: PostId) -> Result<String, ApiError> {
        let viewer = self.require_viewer()?;
        let resp = self.api.delete_post(post_id, viewer.user_id).await?;
        self.update(|feed| feed.remove_by_id(post_id));
        tracing::info!(post_id, "post deleted");
        Ok(resp.message)
    }

    pub async fn add_comment(&self, post_id: PostId, body: &str) -> Result<Comment, ApiError> {
        let viewer = self.require_viewer()?;
        validate_comment_body(body)?;
        let created = self.api.add_comment(post_id, viewer.user_id, body).await?;
        self.refetch(post_id).await;
        Ok(created.comment)
    }

    async fn refetch(&self, post_id: PostId) -> Option<Post> {
        match self.api.get_post(post_id, self.viewer.as_ref()).await {
            Ok(post) => {
                self.update(|feed| feed.apply_counter_patch(post_id, post.clone()));
                Some(post)
            }
            Err(e) => {
                tracing::warn!(post_id, error = %e, "could not re-fetch post; keeping displayed counters");
                None
            }
        }
    }
}

struct InFlight<'a> {
    set: &'a Mutex<HashSet<PostId>>,
    post_id: PostId,
}

impl<'a> InFlight<'a> {
    fn begin(set: &'a Mutex<HashSet<PostId>>, post_id: PostId) -> Option<Self> {
        if lock(set).insert(post_id) {
            Some(Self { set, post_id })
        } else {
            None
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.post_id);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
