use crate::api::PostService;
use crate::error::ApiError;
use crate::feed::{FeedQuery, FeedResult, Guidance, QueryFence};
use crate::model::{Post, ViewerIdentity, validate_post_body};
use crate::view::FeedView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    Applied { feed: FeedResult, guidance: Guidance },
    Stale,
}

pub struct HomeTimeline {
    view: FeedView,
    fence: QueryFence,
}

impl HomeTimeline {
    pub fn new(view: FeedView) -> Self {
        Self {
            view,
            fence: QueryFence::default(),
        }
    }

    pub fn with_service(api: PostService, viewer: Option<ViewerIdentity>) -> Self {
        Self::new(FeedView::new(api, viewer))
    }

    pub fn view(&self) -> &FeedView {
        &self.view
    }

    /// If every source that was asked fails, the displayed feed is kept.
    pub async fn refresh(&self, search_term: &str) -> Result<Refresh, ApiError> {
        let ticket = self.fence.begin();
        let query = FeedQuery::new(self.view.viewer().cloned(), search_term);
        let api = self.view.api();

        let general = api.list_posts(query.viewer.as_ref());
        let followed = async {
            match &query.viewer {
                Some(viewer) => Some(api.list_followed(viewer.user_id).await),
                None => None,
            }
        };
        let (general, followed) = tokio::join!(general, followed);

        let all_failed = general.is_err() && followed.as_ref().is_none_or(|f| f.is_err());
        if all_failed {
            if let Err(e) = &general {
                tracing::warn!(source = "general", error = %e, "feed source failed to load");
            }
            if let Some(Err(e)) = &followed {
                tracing::warn!(source = "followed", error = %e, "feed source failed to load");
            }
            tracing::warn!("home feed unavailable");
            return if self.fence.is_current(ticket) {
                Err(ApiError::FeedUnavailable)
            } else {
                Ok(Refresh::Stale)
            };
        }

        let feed = FeedResult::assemble(general, followed.unwrap_or(Ok(Vec::new())), &query);

        if !self.fence.is_current(ticket) {
            tracing::debug!(search = search_term, "discarding superseded feed result");
            return Ok(Refresh::Stale);
        }
        let guidance = feed.guidance(&query);
        tracing::debug!(
            posts = feed.posts.len(),
            followed = feed.followed_source_count,
            ?guidance,
            "home feed assembled"
        );
        self.view.replace(feed.clone());
        Ok(Refresh::Applied { feed, guidance })
    }

    pub async fn create_post(&self, body: &str) -> Result<Post, ApiError> {
        let viewer = self.view.require_viewer()?;
        validate_post_body(body)?;
        let created = self.view.api().create_post(viewer.user_id, body).await?;
        tracing::info!(post_id = created.post.id, "post created");
        let post = created.post;
        self.view.update(|feed| feed.insert_created(post.clone()));
        Ok(post)
    }
}
