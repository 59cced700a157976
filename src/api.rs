use reqwest::Method;
use url::Url;

use crate::error::ApiError;
use crate::fetcher::Fetcher;
use crate::model::{
    BodyRequest, Comment, CreatedComment, CreatedPost, FollowRequest, FollowStatus,
    LoginRequest, LoginResponse, MessageResponse, Post, PostId, ProfilePayload, RegisterRequest,
    UserId, UserRequest, ViewerIdentity,
};

const VIEWER_PARAM: &str = "logged_in_user_id";

#[derive(Clone)]
pub struct PostService {
    fetcher: Fetcher,
}

impl PostService {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.fetcher.endpoint(&["login"]);
        self.fetcher
            .send_json(Method::POST, url, &LoginRequest { username, password })
            .await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.fetcher.endpoint(&["register"]);
        let body = RegisterRequest {
            username,
            email,
            password,
        };
        self.fetcher.send_json(Method::POST, url, &body).await
    }

    pub async fn list_posts(&self, viewer: Option<&ViewerIdentity>) -> Result<Vec<Post>, ApiError> {
        let url = with_viewer(self.fetcher.endpoint(&["posts"]), viewer);
        self.fetcher.get_json(url).await
    }

    pub async fn list_followed(&self, user_id: UserId) -> Result<Vec<Post>, ApiError> {
        let id = user_id.to_string();
        let mut url = self.fetcher.endpoint(&["posts", "followed", &id]);
        url.query_pairs_mut().append_pair(VIEWER_PARAM, &id);
        self.fetcher.get_json(url).await
    }

    pub async fn get_post(
        &self,
        post_id: PostId,
        viewer: Option<&ViewerIdentity>,
    ) -> Result<Post, ApiError> {
        let id = post_id.to_string();
        let url = with_viewer(self.fetcher.endpoint(&["posts", &id]), viewer);
        self.fetcher.get_json(url).await
    }

    pub async fn create_post(&self, user_id: UserId, body: &str) -> Result<CreatedPost, ApiError> {
        let url = self.fetcher.endpoint(&["posts"]);
        self.fetcher
            .send_json(Method::POST, url, &BodyRequest { user_id, body })
            .await
    }

    pub async fn delete_post(
        &self,
        post_id: PostId,
        user_id: UserId,
    ) -> Result<MessageResponse, ApiError> {
        let id = post_id.to_string();
        let url = self.fetcher.endpoint(&["posts", &id]);
        self.fetcher
            .send_json(Method::DELETE, url, &UserRequest { user_id })
            .await
    }

    pub async fn like(&self, post_id: PostId, user_id: UserId) -> Result<MessageResponse, ApiError> {
        self.like_action(post_id, user_id, "like").await
    }

    pub async fn unlike(
        &self,
        post_id: PostId,
        user_id: UserId,
    ) -> Result<MessageResponse, ApiError> {
        self.like_action(post_id, user_id, "unlike").await
    }

    async fn like_action(
        &self,
        post_id: PostId,
        user_id: UserId,
        action: &str,
    ) -> Result<MessageResponse, ApiError> {
        let id = post_id.to_string();
        let url = self.fetcher.endpoint(&["posts", &id, action]);
        self.fetcher
            .send_json(Method::POST, url, &UserRequest { user_id })
            .await
    }

    pub async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>, ApiError> {
        let id = post_id.to_string();
        let url = self.fetcher.endpoint(&["posts", &id, "comments"]);
        self.fetcher.get_json(url).await
    }

    pub async fn add_comment(
        &self,
        post_id: PostId,
        user_id: UserId,
        body: &str,
    ) -> Result<CreatedComment, ApiError> {
        let id = post_id.to_string();
        let url = self.fetcher.endpoint(&["posts", &id, "comments"]);
        self.fetcher
            .send_json(Method::POST, url, &BodyRequest { user_id, body })
            .await
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&ViewerIdentity>,
    ) -> Result<ProfilePayload, ApiError> {
        let url = with_viewer(self.fetcher.endpoint(&["users", username]), viewer);
        self.fetcher.get_json(url).await
    }

    pub async fn is_following(&self, follower: UserId, target: UserId) -> Result<bool, ApiError> {
        let (follower, target) = (follower.to_string(), target.to_string());
        let url = self
            .fetcher
            .endpoint(&["is_following", &follower, &target]);
        let status: FollowStatus = self.fetcher.get_json(url).await?;
        Ok(status.is_following)
    }

    pub async fn follow(
        &self,
        target: UserId,
        follower_id: UserId,
    ) -> Result<MessageResponse, ApiError> {
        self.follow_action(target, follower_id, "follow").await
    }

    pub async fn unfollow(
        &self,
        target: UserId,
        follower_id: UserId,
    ) -> Result<MessageResponse, ApiError> {
        self.follow_action(target, follower_id, "unfollow").await
    }

    async fn follow_action(
        &self,
        target: UserId,
        follower_id: UserId,
        action: &str,
    ) -> Result<MessageResponse, ApiError> {
        let target = target.to_string();
        let url = self.fetcher.endpoint(&[action, &target]);
        self.fetcher
            .send_json(Method::POST, url, &FollowRequest { follower_id })
            .await
    }
}

fn with_viewer(mut url: Url, viewer: Option<&ViewerIdentity>) -> Url {
    if let Some(viewer) = viewer {
        url.query_pairs_mut()
            .append_pair(VIEWER_PARAM, &viewer.user_id.to_string());
    }
    url
}
