use std::fmt::Write as _;

use crate::feed::{FeedResult, Guidance};
use crate::model::{Comment, Post};
use crate::profile::ProfileSnapshot;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

pub fn post(out: &mut String, post: &Post) {
    let _ = writeln!(
        out,
        "#{} @{}  {}",
        post.id,
        post.author_username,
        post.timestamp.format(TIME_FORMAT)
    );
    for line in post.body.lines() {
        let _ = writeln!(out, "    {line}");
    }
    let _ = writeln!(
        out,
        "    likes {}{}  comments {}",
        post.likes_count,
        if post.liked_by_viewer { " (you)" } else { "" },
        post.comments_count
    );
}

pub fn feed(feed: &FeedResult, guidance: Guidance) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", guidance.message());
    for p in &feed.posts {
        out.push('\n');
        post(&mut out, p);
    }
    out
}

pub fn profile(snapshot: &ProfileSnapshot) -> String {
    let user = &snapshot.user;
    let mut out = String::new();
    let _ = writeln!(out, "@{}", user.username);
    if snapshot.is_own_profile {
        if let Some(email) = &user.email {
            let _ = writeln!(out, "email: {email}");
        }
    }
    let _ = writeln!(
        out,
        "{} followers  {} following",
        user.followers_count, user.followed_count
    );
    if !snapshot.is_own_profile && snapshot.is_following {
        let _ = writeln!(out, "you follow @{}", user.username);
    }
    if snapshot.feed.is_empty() {
        let _ = writeln!(out, "\n{}", snapshot.guidance.message());
    }
    for p in &snapshot.feed.posts {
        out.push('\n');
        post(&mut out, p);
    }
    out
}

pub fn comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return "No comments yet. Be the first to comment!\n".to_string();
    }
    let mut out = String::new();
    for c in comments {
        let _ = writeln!(
            out,
            "@{}  {}\n    {}",
            c.username,
            c.timestamp.format(TIME_FORMAT),
            c.body
        );
    }
    out
}
