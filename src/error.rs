use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::model::PostId;

const RETRY_MESSAGE: &str = "Something went wrong. Please try again.";
const CONNECTION_MESSAGE: &str = "Could not reach the server. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{status}: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("unexpected response from {url}: {detail}")]
    Malformed { url: Url, detail: String },

    #[error("you need to be logged in to do that")]
    NotLoggedIn,

    #[error("{0}")]
    Invalid(String),

    #[error("post {0} is not in the displayed feed")]
    UnknownPost(PostId),

    #[error("you cannot follow or unfollow yourself")]
    OwnProfile,

    #[error("no feed source could be loaded")]
    FeedUnavailable,
}

impl ApiError {
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Malformed { .. } => RETRY_MESSAGE.to_string(),
            ApiError::Transport { .. } | ApiError::FeedUnavailable => {
                CONNECTION_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
