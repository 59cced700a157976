use brasfut_client::feed::{FeedQuery, FeedResult, Guidance, QueryFence};
use brasfut_client::model::{Post, ViewerIdentity};
use chrono::{TimeZone as _, Utc};

fn post(id: i64, t: i64) -> Post {
    Post {
        id,
        author_id: 100 + id,
        author_username: format!("user{id}"),
        body: format!("post number {id}"),
        timestamp: Utc.timestamp_opt(t, 0).unwrap(),
        likes_count: 0,
        comments_count: 0,
        liked_by_viewer: false,
    }
}

fn with_body(mut p: Post, body: &str) -> Post {
    p.body = body.to_string();
    p
}

fn viewer() -> Option<ViewerIdentity> {
    Some(ViewerIdentity {
        user_id: 7,
        username: "ana".to_string(),
    })
}

fn ids(feed: &FeedResult) -> Vec<i64> {
    feed.posts.iter().map(|p| p.id).collect()
}

type Loaded = Result<Vec<Post>, String>;

#[test]
fn followed_copy_wins_on_shared_id() {
    let general: Loaded = Ok(vec![post(1, 10), post(2, 5)]);
    let mut liked = post(2, 5);
    liked.likes_count = 9;
    liked.liked_by_viewer = true;
    let followed: Loaded = Ok(vec![liked.clone()]);

    let feed = FeedResult::assemble(general, followed, &FeedQuery::new(viewer(), ""));

    assert_eq!(ids(&feed), vec![1, 2]);
    assert_eq!(feed.posts[1], liked);
    assert_eq!(feed.followed_source_count, 1);
}

#[test]
fn each_shared_id_appears_once() {
    let general: Loaded = Ok(vec![post(1, 1), post(2, 2), post(3, 3)]);
    let followed: Loaded = Ok(vec![post(3, 3), post(2, 2), post(4, 4)]);

    let feed = FeedResult::assemble(general, followed, &FeedQuery::default());

    assert_eq!(ids(&feed), vec![4, 3, 2, 1]);
    assert_eq!(feed.followed_source_count, 3);
}

#[test]
fn duplicates_inside_the_followed_source_still_count_raw() {
    let followed: Loaded = Ok(vec![post(5, 1), post(5, 1)]);
    let feed = FeedResult::assemble(Ok(vec![]), followed, &FeedQuery::default());
    assert_eq!(ids(&feed), vec![5]);
    assert_eq!(feed.followed_source_count, 2);
}

#[test]
fn sort_is_newest_first_and_stable_for_ties() {
    let general: Loaded = Ok(vec![post(1, 5), post(2, 9), post(3, 5), post(4, 1)]);
    let followed: Loaded = Ok(vec![post(5, 5)]);

    let feed = FeedResult::assemble(general, followed, &FeedQuery::default());

    assert_eq!(ids(&feed), vec![2, 1, 3, 5, 4]);
    assert!(
        feed.posts
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp)
    );
}

#[test]
fn search_keeps_only_matching_posts() {
    let general: Loaded = Ok(vec![
        with_body(post(1, 2), "xabcy"),
        with_body(post(2, 1), "nope"),
    ]);

    let feed = FeedResult::assemble(general, Ok(vec![]), &FeedQuery::new(None, "abc"));

    assert_eq!(ids(&feed), vec![1]);
}

#[test]
fn search_is_case_insensitive_over_body_and_author() {
    let mut by_author = post(1, 3);
    by_author.author_username = "GremioFan".to_string();
    let general: Loaded = Ok(vec![
        by_author,
        with_body(post(2, 2), "Vai GRÊMIO!"),
        with_body(post(3, 1), "inter"),
    ]);

    let feed = FeedResult::assemble(general, Ok(vec![]), &FeedQuery::new(None, "grêmio"));
    assert_eq!(ids(&feed), vec![2]);

    let general: Loaded = Ok(vec![
        {
            let mut p = post(1, 3);
            p.author_username = "GremioFan".to_string();
            p
        },
        with_body(post(2, 2), "gremio"),
    ]);
    let feed = FeedResult::assemble(general, Ok(vec![]), &FeedQuery::new(None, "GREMIO"));
    assert_eq!(ids(&feed), vec![1, 2]);
}

#[test]
fn search_applies_to_the_merged_copy() {
    let general: Loaded = Ok(vec![with_body(post(1, 1), "old text")]);
    let followed: Loaded = Ok(vec![with_body(post(1, 1), "edited match")]);

    let feed = FeedResult::assemble(general, followed, &FeedQuery::new(viewer(), "match"));

    assert_eq!(ids(&feed), vec![1]);
    assert_eq!(feed.posts[0].body, "edited match");
}

#[test]
fn failed_source_behaves_like_an_empty_one() {
    let query = FeedQuery::new(viewer(), "");

    let failed_general =
        FeedResult::assemble(Err("boom".to_string()), Ok(vec![post(1, 1)]), &query);
    let empty_general = FeedResult::assemble::<String>(Ok(vec![]), Ok(vec![post(1, 1)]), &query);
    assert_eq!(failed_general, empty_general);

    let failed_followed =
        FeedResult::assemble(Ok(vec![post(1, 1)]), Err("boom".to_string()), &query);
    let empty_followed = FeedResult::assemble::<String>(Ok(vec![post(1, 1)]), Ok(vec![]), &query);
    assert_eq!(failed_followed, empty_followed);
    assert_eq!(failed_followed.followed_source_count, 0);
}

#[test]
fn insert_created_goes_first_regardless_of_timestamp() {
    let feed = FeedResult::assemble::<String>(
        Ok(vec![post(1, 100), post(2, 50)]),
        Ok(vec![post(3, 75)]),
        &FeedQuery::default(),
    );

    let feed = feed.insert_created(post(9, 0));

    assert_eq!(ids(&feed), vec![9, 1, 3, 2]);
    assert_eq!(feed.followed_source_count, 1);
}

#[test]
fn insert_created_does_not_duplicate_an_already_listed_post() {
    let feed = FeedResult::from_posts(vec![post(1, 10), post(2, 5)]);
    let feed = feed.insert_created(post(2, 5));
    assert_eq!(ids(&feed), vec![2, 1]);
}

#[test]
fn counter_patch_replaces_the_whole_entry_and_is_idempotent() {
    let feed = FeedResult::from_posts(vec![post(1, 10), post(2, 5)]);
    let mut patched = post(2, 5);
    patched.likes_count = 4;
    patched.comments_count = 2;
    patched.liked_by_viewer = true;

    let once = feed.apply_counter_patch(2, patched.clone());
    let twice = once.clone().apply_counter_patch(2, patched.clone());

    assert_eq!(once, twice);
    assert_eq!(once.get(2), Some(&patched));
    assert_eq!(ids(&once), vec![1, 2]);
}

#[test]
fn operations_on_missing_ids_are_no_ops() {
    let feed = FeedResult::from_posts(vec![post(1, 10), post(2, 5)]);

    assert_eq!(feed.clone().remove_by_id(42), feed);
    assert_eq!(feed.clone().apply_counter_patch(42, post(42, 1)), feed);
}

#[test]
fn patch_for_a_different_post_is_ignored() {
    let feed = FeedResult::from_posts(vec![post(1, 10), post(2, 5)]);

    let patched = feed.clone().apply_counter_patch(2, post(1, 10));

    assert_eq!(patched, feed);
    assert_eq!(ids(&patched), vec![1, 2]);
}

#[test]
fn patch_after_delete_is_ignored() {
    let feed = FeedResult::from_posts(vec![post(1, 10), post(2, 5)]);
    let feed = feed.remove_by_id(2);
    let mut late = post(2, 5);
    late.likes_count = 3;

    let feed = feed.apply_counter_patch(2, late);

    assert_eq!(ids(&feed), vec![1]);
}

#[test]
fn guidance_follows_feed_composition() {
    let anon = FeedQuery::default();
    let logged = FeedQuery::new(viewer(), "");
    let searching = FeedQuery::new(viewer(), "zzz");

    let empty = FeedResult::default();
    assert_eq!(empty.guidance(&logged), Guidance::Empty);
    assert_eq!(empty.guidance(&searching), Guidance::NoMatches);

    let general_only = FeedResult::assemble::<String>(Ok(vec![post(1, 1)]), Ok(vec![]), &logged);
    assert_eq!(general_only.guidance(&anon), Guidance::Anonymous);
    assert_eq!(general_only.guidance(&logged), Guidance::FollowSomeone);

    let personalized =
        FeedResult::assemble::<String>(Ok(vec![post(1, 1)]), Ok(vec![post(1, 1)]), &logged);
    assert_eq!(personalized.guidance(&logged), Guidance::Personalized);
}

#[test]
fn only_the_latest_query_ticket_is_current() {
    let fence = QueryFence::default();
    let first = fence.begin();
    assert!(fence.is_current(first));

    let second = fence.begin();
    assert!(!fence.is_current(first));
    assert!(fence.is_current(second));
}
