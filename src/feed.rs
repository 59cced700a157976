use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::model::{Post, PostId, ViewerIdentity};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub viewer: Option<ViewerIdentity>,
    pub search_term: String,
}

impl FeedQuery {
    pub fn new(viewer: Option<ViewerIdentity>, search_term: impl Into<String>) -> Self {
        Self {
            viewer,
            search_term: search_term.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedResult {
    pub posts: Vec<Post>,
    // Raw length of the followed source before merging.
    pub followed_source_count: usize,
}

impl FeedResult {
    /// A failed source counts as empty. On a shared id the followed copy wins.
    pub fn assemble<E: fmt::Display>(
        general: Result<Vec<Post>, E>,
        followed: Result<Vec<Post>, E>,
        query: &FeedQuery,
    ) -> FeedResult {
        let general = tolerate("general", general);
        let followed = tolerate("followed", followed);
        let followed_source_count = followed.len();

        let mut merged: Vec<Post> = Vec::with_capacity(general.len() + followed.len());
        let mut index: HashMap<PostId, usize> = HashMap::with_capacity(merged.capacity());
        for post in general.into_iter().chain(followed) {
            match index.get(&post.id) {
                Some(&at) => merged[at] = post,
                None => {
                    index.insert(post.id, merged.len());
                    merged.push(post);
                }
            }
        }

        // Stable: equal timestamps keep merge order.
        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let needle = query.search_term.to_lowercase();
        if !needle.is_empty() {
            merged.retain(|p| p.matches_lowercase(&needle));
        }

        FeedResult {
            posts: merged,
            followed_source_count,
        }
    }

    pub fn from_posts(posts: Vec<Post>) -> FeedResult {
        FeedResult::assemble::<std::convert::Infallible>(
            Ok(posts),
            Ok(Vec::new()),
            &FeedQuery::default(),
        )
    }

    pub fn insert_created(mut self, post: Post) -> FeedResult {
        self.posts.retain(|p| p.id != post.id);
        self.posts.insert(0, post);
        self
    }

    pub fn apply_counter_patch(mut self, post_id: PostId, patched: Post) -> FeedResult {
        if patched.id != post_id {
            tracing::warn!(
                post_id,
                patched_id = patched.id,
                "patch carries another post's id; ignored"
            );
            return self;
        }
        match self.posts.iter_mut().find(|p| p.id == post_id) {
            Some(slot) => *slot = patched,
            None => tracing::debug!(post_id, "patch for a post that is not displayed; ignored"),
        }
        self
    }

    pub fn remove_by_id(mut self, post_id: PostId) -> FeedResult {
        self.posts.retain(|p| p.id != post_id);
        self
    }

    pub fn get(&self, post_id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn guidance(&self, query: &FeedQuery) -> Guidance {
        if self.posts.is_empty() {
            if query.search_term.is_empty() {
                Guidance::Empty
            } else {
                Guidance::NoMatches
            }
        } else if query.viewer.is_none() {
            Guidance::Anonymous
        } else if self.followed_source_count == 0 {
            Guidance::FollowSomeone
        } else {
            Guidance::Personalized
        }
    }
}

fn tolerate<E: fmt::Display>(source: &'static str, loaded: Result<Vec<Post>, E>) -> Vec<Post> {
    match loaded {
        Ok(posts) => posts,
        Err(err) => {
            tracing::warn!(source, error = %err, "feed source failed to load; treating as empty");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Guidance {
    NoMatches,
    Empty,
    Anonymous,
    FollowSomeone,
    Personalized,
}

impl Guidance {
    pub fn message(self) -> &'static str {
        match self {
            Guidance::NoMatches => "No posts match your search.",
            Guidance::Empty => "No posts yet. Be the first to post something!",
            Guidance::Anonymous => "Log in to like, comment and see posts from people you follow.",
            Guidance::FollowSomeone => {
                "You are not following anyone with posts yet. Follow people to personalize your feed."
            }
            Guidance::Personalized => "Latest posts, including the people you follow.",
        }
    }
}

/// A result is applied only if no newer query started while it was fetched.
#[derive(Debug, Default)]
pub struct QueryFence {
    current: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket(u64);

impl QueryFence {
    pub fn begin(&self) -> QueryTicket {
        QueryTicket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }
}
