use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub type PostId = i64;
pub type UserId = i64;

pub const MAX_POST_CHARS: usize = 280;
pub const MAX_COMMENT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(rename = "user_id")]
    pub author_id: UserId,
    #[serde(rename = "username")]
    pub author_username: String,
    pub body: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default, rename = "is_liked")]
    pub liked_by_viewer: bool,
}

impl Post {
    // `needle` must already be lowercased.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.body.to_lowercase().contains(needle)
            || self.author_username.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub post_id: Option<PostId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub username: String,
    pub body: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub followers_count: u32,
    #[serde(default)]
    pub followed_count: u32,
}

impl UserProfile {
    pub fn adjust_followers(&mut self, delta: i32) {
        let next = i64::from(self.followers_count) + i64::from(delta);
        if next < 0 {
            tracing::warn!(
                user_id = self.id,
                followers = self.followers_count,
                delta,
                "follower count would go negative; clamping at zero"
            );
        }
        self.followers_count = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerIdentity {
    pub user_id: UserId,
    pub username: String,
}

// -- wire envelopes --

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub message: String,
}

impl LoginResponse {
    pub fn viewer(&self) -> ViewerIdentity {
        ViewerIdentity {
            user_id: self.user_id,
            username: self.username.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BodyRequest<'a> {
    pub user_id: UserId,
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UserRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct FollowRequest {
    pub follower_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPost {
    #[serde(default)]
    pub message: String,
    pub post: Post,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedComment {
    #[serde(default)]
    pub message: String,
    pub comment: Comment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfilePayload {
    pub user: UserProfile,
    #[serde(default)]
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FollowStatus {
    pub is_following: bool,
}

pub fn validate_post_body(body: &str) -> Result<(), ApiError> {
    validate_text(body, MAX_POST_CHARS, "post")
}

pub fn validate_comment_body(body: &str) -> Result<(), ApiError> {
    validate_text(body, MAX_COMMENT_CHARS, "comment")
}

fn validate_text(body: &str, limit: usize, what: &str) -> Result<(), ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::Invalid(format!("the {what} cannot be empty")));
    }
    let len = body.chars().count();
    if len > limit {
        return Err(ApiError::Invalid(format!(
            "the {what} has {len} characters; the limit is {limit}"
        )));
    }
    Ok(())
}

pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("unrecognised timestamp {raw:?}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let s = raw.trim();
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Some(t.with_timezone(&Utc));
        }
        if let Ok(t) = DateTime::parse_from_rfc2822(s) {
            return Some(t.with_timezone(&Utc));
        }
        // Flask renders HTTP dates with a literal "GMT" zone.
        if let Ok(t) = NaiveDateTime::parse_from_str(s, "%a, %d %b %Y %H:%M:%S GMT") {
            return Some(t.and_utc());
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(t.and_utc());
            }
        }
        None
    }
}
