pub mod api;
mod cli;
pub mod config;
pub mod error;
pub mod feed;
mod fetcher;
pub mod model;
pub mod profile;
mod progress;
mod render;
pub mod session;
pub mod timeline;
pub mod view;

use anyhow::Context as _;
use serde::Serialize;

use api::PostService;
use config::ClientConfig;
use error::ApiError;
use feed::FeedResult;
use fetcher::Fetcher;
use model::ViewerIdentity;
use profile::ProfilePage;
use session::{FileSessionStore, Session};
use timeline::{HomeTimeline, Refresh};
use view::{FeedView, LikeToggle};

pub use cli::{Args as CliArgs, Command, ProgressMode};

pub fn connect(config: &ClientConfig) -> anyhow::Result<PostService> {
    Ok(PostService::new(Fetcher::new(config, None)?))
}

pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    use std::io::IsTerminal as _;

    let progress_enabled = match args.progress {
        ProgressMode::Always => true,
        ProgressMode::Never => false,
        ProgressMode::Auto => std::io::stderr().is_terminal(),
    };
    let progress = progress::Progress::new(progress_enabled);

    let config = ClientConfig::from(&args);
    let api = PostService::new(Fetcher::new(&config, Some(progress.clone()))?);
    let mut session = Session::restore(FileSessionStore::new(&args.session_file));

    let out = Output { json: args.json };
    let res = dispatch(&args.command, &api, &mut session, &progress, &out).await;
    progress.finish();
    res
}

struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value).context("encode output")?);
        } else {
            print!("{}", text());
        }
        Ok(())
    }

    fn message(&self, message: &str) -> anyhow::Result<()> {
        self.emit(&serde_json::json!({ "message": message }), || {
            format!("{message}\n")
        })
    }
}

async fn dispatch(
    command: &Command,
    api: &PostService,
    session: &mut Session<FileSessionStore>,
    progress: &progress::Progress,
    out: &Output,
) -> anyhow::Result<()> {
    let viewer = session.viewer().cloned();
    match command {
        Command::Login { username, password } => {
            progress.set_stage("logging in");
            let resp = api.login(username, password).await.map_err(surface)?;
            session.login(resp.viewer())?;
            out.message(&format!("{} Welcome, {}!", resp.message, resp.username))
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            progress.set_stage("registering");
            let resp = api
                .register(username, email, password)
                .await
                .map_err(surface)?;
            out.message(&resp.message)
        }
        Command::Logout => {
            session.logout()?;
            out.message("Logged out.")
        }
        Command::Whoami => match viewer {
            Some(v) => out.emit(&v, || format!("@{} (id {})\n", v.username, v.user_id)),
            None => out.message("Not logged in."),
        },
        Command::Feed { search } => {
            progress.set_stage("loading feed");
            let timeline = HomeTimeline::with_service(api.clone(), viewer);
            match timeline.refresh(search).await.map_err(surface)? {
                Refresh::Applied { feed, guidance } => {
                    #[derive(Serialize)]
                    struct FeedOutput<'a> {
                        guidance: &'a str,
                        #[serde(flatten)]
                        feed: &'a FeedResult,
                    }
                    let value = FeedOutput {
                        guidance: guidance.message(),
                        feed: &feed,
                    };
                    out.emit(&value, || render::feed(&feed, guidance))
                }
                Refresh::Stale => Ok(()),
            }
        }
        Command::Profile { username, search } => {
            progress.set_stage("loading profile");
            let page = ProfilePage::load(api.clone(), viewer, username, search)
                .await
                .map_err(surface)?;
            let snapshot = page.snapshot();
            out.emit(&snapshot, || render::profile(&snapshot))
        }
        Command::Post { body } => {
            progress.set_stage("publishing");
            let timeline = HomeTimeline::with_service(api.clone(), viewer);
            let post = timeline.create_post(body).await.map_err(surface)?;
            out.emit(&post, || {
                let mut s = String::from("Post published.\n");
                render::post(&mut s, &post);
                s
            })
        }
        Command::Delete { post_id } => {
            progress.set_stage("deleting");
            let view = FeedView::new(api.clone(), viewer);
            let message = view.delete_post(*post_id).await.map_err(surface)?;
            out.message(&message)
        }
        Command::Like { post_id } => {
            progress.set_stage("toggling like");
            let view = load_single(api, viewer, *post_id).await?;
            match view.toggle_like(*post_id).await.map_err(surface)? {
                LikeToggle::Confirmed(post) => out.emit(&post, || {
                    let mut s = String::new();
                    render::post(&mut s, &post);
                    s
                }),
                LikeToggle::Unconfirmed => {
                    out.message("Done, but the updated post could not be loaded.")
                }
                LikeToggle::Suppressed => Ok(()),
            }
        }
        Command::Comments { post_id } => {
            progress.set_stage("loading comments");
            let comments = api.comments(*post_id).await.map_err(surface)?;
            out.emit(&comments, || render::comments(&comments))
        }
        Command::Comment { post_id, body } => {
            progress.set_stage("commenting");
            let view = load_single(api, viewer, *post_id).await?;
            let comment = view.add_comment(*post_id, body).await.map_err(surface)?;
            out.emit(&comment, || render::comments(std::slice::from_ref(&comment)))
        }
        Command::Follow { username } | Command::Unfollow { username } => {
            let follow = matches!(command, Command::Follow { .. });
            progress.set_stage(if follow { "following" } else { "unfollowing" });
            let mut page = ProfilePage::load(api.clone(), viewer, username, "")
                .await
                .map_err(surface)?;
            match page.set_following(follow).await.map_err(surface)? {
                Some(message) => out.message(&message),
                None if follow => out.message(&format!("You already follow @{username}.")),
                None => out.message(&format!("You do not follow @{username}.")),
            }
        }
    }
}

async fn load_single(
    api: &PostService,
    viewer: Option<ViewerIdentity>,
    post_id: model::PostId,
) -> anyhow::Result<FeedView> {
    if viewer.is_none() {
        return Err(surface(ApiError::NotLoggedIn));
    }
    let post = api
        .get_post(post_id, viewer.as_ref())
        .await
        .map_err(surface)?;
    let view = FeedView::new(api.clone(), viewer);
    view.replace(FeedResult::from_posts(vec![post]));
    Ok(view)
}

fn surface(err: ApiError) -> anyhow::Error {
    tracing::debug!(error = %err, "request failed");
    anyhow::anyhow!(err.user_message())
}
