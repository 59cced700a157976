use serde::Serialize;

use crate::api::PostService;
use crate::error::ApiError;
use crate::feed::{FeedQuery, FeedResult, Guidance};
use crate::model::{UserProfile, ViewerIdentity};
use crate::view::FeedView;

pub struct ProfilePage {
    user: UserProfile,
    is_following: bool,
    search_term: String,
    view: FeedView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSnapshot {
    pub user: UserProfile,
    pub is_following: bool,
    pub is_own_profile: bool,
    pub feed: FeedResult,
    pub guidance: Guidance,
}

impl ProfilePage {
    pub async fn load(
        api: PostService,
        viewer: Option<ViewerIdentity>,
        username: &str,
        search_term: &str,
    ) -> Result<Self, ApiError> {
        let payload = api.profile(username, viewer.as_ref()).await?;

        let is_following = match &viewer {
            Some(v) if v.user_id != payload.user.id => {
                api.is_following(v.user_id, payload.user.id).await?
            }
            _ => false,
        };

        let query = FeedQuery::new(viewer.clone(), search_term);
        let feed =
            FeedResult::assemble::<ApiError>(Ok(payload.posts), Ok(Vec::new()), &query);
        tracing::debug!(
            username,
            posts = feed.posts.len(),
            is_following,
            "profile loaded"
        );

        let view = FeedView::new(api, viewer);
        view.replace(feed);
        Ok(Self {
            user: payload.user,
            is_following,
            search_term: search_term.to_string(),
            view,
        })
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn is_following(&self) -> bool {
        self.is_following
    }

    pub fn is_own_profile(&self) -> bool {
        self.view
            .viewer()
            .is_some_and(|v| v.user_id == self.user.id)
    }

    pub fn view(&self) -> &FeedView {
        &self.view
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        let feed = self.view.snapshot();
        let is_own_profile = self.is_own_profile();
        // A profile has no followed source, so guidance reduces to empty/non-empty.
        let guidance = if feed.is_empty() && !self.search_term.is_empty() {
            Guidance::NoMatches
        } else if feed.is_empty() {
            Guidance::Empty
        } else if self.view.viewer().is_none() {
            Guidance::Anonymous
        } else {
            Guidance::Personalized
        };
        ProfileSnapshot {
            user: self.user.clone(),
            is_following: self.is_following,
            is_own_profile,
            feed,
            guidance,
        }
    }

    /// `None` when the viewer was already in the requested state.
    pub async fn set_following(&mut self, follow: bool) -> Result<Option<String>, ApiError> {
        let viewer = self.view.require_viewer()?;
        if viewer.user_id == self.user.id {
            return Err(ApiError::OwnProfile);
        }
        if self.is_following == follow {
            return Ok(None);
        }

        let api = self.view.api();
        let resp = if follow {
            api.follow(self.user.id, viewer.user_id).await?
        } else {
            api.unfollow(self.user.id, viewer.user_id).await?
        };

        self.is_following = follow;
        self.user.adjust_followers(if follow { 1 } else { -1 });
        tracing::info!(target_user = %self.user.username, follow, "follow state changed");
        Ok(Some(resp.message))
    }

    pub async fn toggle_follow(&mut self) -> Result<Option<String>, ApiError> {
        self.set_following(!self.is_following).await
    }
}
