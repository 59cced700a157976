use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use url::Url;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProgressMode {
    /// Enable progress UI when stderr is a TTY.
    Auto,
    /// Always enable progress UI (even when piped).
    Always,
    /// Never show progress UI.
    Never,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Base URL of the post service.
    #[arg(long, default_value = crate::config::DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// File holding the logged-in user between runs.
    #[arg(long, default_value = "brasfut-session.json")]
    pub session_file: PathBuf,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Max concurrent requests.
    #[arg(long, default_value_t = 4)]
    pub max_concurrency: usize,

    /// Attempts for reads answered with 429/503.
    #[arg(long, default_value_t = 3)]
    pub max_attempts: usize,

    /// HTTP User-Agent.
    #[arg(long, default_value = concat!("brasfut-client/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Progress display: `auto`, `always`, or `never`.
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,

    /// Print results as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in and remember the user in the session file.
    Login { username: String, password: String },
    /// Create an account.
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Forget the stored user.
    Logout,
    /// Show the stored user.
    Whoami,
    /// Show the home feed.
    Feed {
        /// Only show posts whose text or author contains this (case-insensitive).
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Show a user's profile and posts.
    Profile {
        username: String,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Publish a post (max 280 characters).
    Post { body: String },
    /// Delete one of your posts.
    Delete { post_id: i64 },
    /// Like a post, or unlike it if you already do.
    Like { post_id: i64 },
    /// List the comments on a post.
    Comments { post_id: i64 },
    /// Comment on a post (max 500 characters).
    Comment { post_id: i64, body: String },
    /// Follow a user.
    Follow { username: String },
    /// Stop following a user.
    Unfollow { username: String },
}
