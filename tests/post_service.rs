use std::time::{Duration, Instant};

use brasfut_client::api::PostService;
use brasfut_client::config::ClientConfig;
use brasfut_client::error::ApiError;
use brasfut_client::model::ViewerIdentity;
use httpmock::Method::{DELETE, GET, POST};
use httpmock::MockServer;
use serde_json::{Value, json};
use url::Url;

fn service(server: &MockServer) -> PostService {
    let config = ClientConfig::new(Url::parse(&server.url("/")).unwrap());
    brasfut_client::connect(&config).unwrap()
}

fn post_json(id: i64, username: &str, body: &str, ts: &str) -> Value {
    json!({
        "id": id,
        "user_id": id + 100,
        "username": username,
        "body": body,
        "timestamp": ts,
        "likes_count": 1,
        "comments_count": 0,
        "is_liked": false
    })
}

fn ana() -> ViewerIdentity {
    ViewerIdentity {
        user_id: 7,
        username: "ana".to_string(),
    }
}

#[tokio::test]
async fn login_returns_identity() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/login")
            .json_body(json!({"username": "ana", "password": "s3nha"}));
        then.status(200)
            .json_body(json!({"message": "Login ok!", "user_id": 7, "username": "ana"}));
    });

    let resp = service(&server).login("ana", "s3nha").await.unwrap();

    mock.assert();
    assert_eq!(resp.viewer(), ana());
    assert_eq!(resp.message, "Login ok!");
}

#[tokio::test]
async fn rejection_carries_the_server_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(401)
            .json_body(json!({"message": "Username ou senha inválidos."}));
    });

    let err = service(&server).login("ana", "x").await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    assert_eq!(err.user_message(), "Username ou senha inválidos.");
}

#[tokio::test]
async fn rejection_without_message_gets_a_generic_one() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/posts/3/comments");
        then.status(500).body("<html>oops</html>");
    });

    let err = service(&server).comments(3).await.unwrap_err();

    assert!(matches!(err, ApiError::Rejected { .. }));
    assert!(err.user_message().contains("could not complete"));
}

#[tokio::test]
async fn malformed_success_is_a_general_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/posts");
        then.status(200).body("not json");
    });

    let err = service(&server).list_posts(None).await.unwrap_err();

    assert!(matches!(err, ApiError::Malformed { .. }));
    assert_eq!(err.user_message(), "Something went wrong. Please try again.");
}

#[tokio::test]
async fn listings_are_personalized_only_for_a_viewer() {
    let server = MockServer::start();
    let personalized = server.mock(|when, then| {
        when.method(GET)
            .path("/posts")
            .query_param("logged_in_user_id", "7");
        then.status(200).json_body(json!([post_json(
            1,
            "bia",
            "oi",
            "2024-01-02T10:00:00Z"
        )]));
    });

    let api = service(&server);
    let posts = api.list_posts(Some(&ana())).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].author_username, "bia");
    personalized.assert_hits(1);

    let followed = server.mock(|when, then| {
        when.method(GET)
            .path("/posts/followed/7")
            .query_param("logged_in_user_id", "7");
        then.status(200).json_body(json!([]));
    });
    assert!(api.list_followed(7).await.unwrap().is_empty());
    followed.assert();
}

#[tokio::test]
async fn create_and_delete_send_the_user_id() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/posts")
            .json_body(json!({"user_id": 7, "body": "primeiro post"}));
        then.status(201).json_body(json!({
            "message": "Post criado!",
            "post": post_json(11, "ana", "primeiro post", "2024-01-02T10:00:00Z")
        }));
    });
    let delete = server.mock(|when, then| {
        when.method(DELETE)
            .path("/posts/11")
            .json_body(json!({"user_id": 7}));
        then.status(200).json_body(json!({"message": "Post excluído."}));
    });

    let api = service(&server);
    let created = api.create_post(7, "primeiro post").await.unwrap();
    assert_eq!(created.post.id, 11);
    let deleted = api.delete_post(11, 7).await.unwrap();
    assert_eq!(deleted.message, "Post excluído.");

    create.assert();
    delete.assert();
}

#[tokio::test]
async fn profile_and_follow_endpoints() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/users/bia")
            .query_param("logged_in_user_id", "7");
        then.status(200).json_body(json!({
            "user": {"id": 8, "username": "bia", "followers_count": 2, "followed_count": 1},
            "posts": [post_json(3, "bia", "oi", "2024-01-02T10:00:00Z")]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/is_following/7/8");
        then.status(200).json_body(json!({"is_following": true}));
    });
    let unfollow = server.mock(|when, then| {
        when.method(POST)
            .path("/unfollow/8")
            .json_body(json!({"follower_id": 7}));
        then.status(200).json_body(json!({"message": "ok"}));
    });

    let api = service(&server);
    let profile = api.profile("bia", Some(&ana())).await.unwrap();
    assert_eq!(profile.user.id, 8);
    assert_eq!(profile.posts.len(), 1);
    assert!(api.is_following(7, 8).await.unwrap());
    api.unfollow(8, 7).await.unwrap();
    unfollow.assert();
}

#[tokio::test]
async fn unknown_profile_surfaces_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/users/ghost");
        then.status(404)
            .json_body(json!({"message": "Usuário não encontrado."}));
    });

    let err = service(&server).profile("ghost", None).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert_eq!(err.user_message(), "Usuário não encontrado.");
}

#[tokio::test]
async fn comments_round_trip() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/posts/3/comments");
        then.status(200).json_body(json!([
            {"id": 1, "username": "bia", "body": "boa!", "timestamp": "2024-01-02T10:00:00Z"}
        ]));
    });
    let add = server.mock(|when, then| {
        when.method(POST)
            .path("/posts/3/comments")
            .json_body(json!({"user_id": 7, "body": "concordo"}));
        then.status(201).json_body(json!({
            "message": "Comentário adicionado!",
            "comment": {"id": 2, "post_id": 3, "user_id": 7, "username": "ana",
                        "body": "concordo", "timestamp": "2024-01-02T11:00:00Z"}
        }));
    });

    let api = service(&server);
    let comments = api.comments(3).await.unwrap();
    assert_eq!(comments[0].username, "bia");
    let created = api.add_comment(3, 7, "concordo").await.unwrap();
    assert_eq!(created.comment.post_id, Some(3));
    add.assert();
}

#[tokio::test]
async fn throttled_get_is_retried_within_the_timeout() {
    let server = MockServer::start();
    let throttled = server.mock(|when, then| {
        when.method(GET).path("/posts");
        then.status(429).header("Retry-After", "0");
    });

    let err = service(&server).list_posts(None).await.unwrap_err();

    throttled.assert_hits(3);
    assert_eq!(err.status().map(|s| s.as_u16()), Some(429));
}

#[tokio::test]
async fn retry_after_longer_than_the_timeout_is_not_waited_on() {
    let server = MockServer::start();
    let throttled = server.mock(|when, then| {
        when.method(GET).path("/posts/5");
        then.status(503)
            .header("Retry-After", "120")
            .json_body(json!({"message": "Volte mais tarde."}));
    });
    let mut config = ClientConfig::new(Url::parse(&server.url("/")).unwrap());
    config.timeout = Duration::from_secs(2);
    let api = brasfut_client::connect(&config).unwrap();

    let started = Instant::now();
    let err = api.get_post(5, None).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    throttled.assert_hits(1);
    assert_eq!(err.user_message(), "Volte mais tarde.");
}
