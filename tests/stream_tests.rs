mod common;

use common::{aggregator_for, page};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_static_states_are_merged_and_deduplicated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sousou-no-frieren-episode-1/"))
        .respond_with(page("animestream_episode.html"))
        .mount(&server)
        .await;

    let aggregator = aggregator_for("anoboy", &server.uri());
    let stream = aggregator
        .get_stream("anoboy", "sousou-no-frieren-episode-1")
        .await
        .expect("stream should resolve");

    assert_eq!(stream.title, "Sousou no Frieren Episode 1 Subtitle Indonesia");
    let urls: Vec<&str> = stream.servers.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.blogger.com/video.g?token=AD6v5dw",
            "https://player.example/x",
            "https://mega.test/embed/abc",
        ]
    );
    assert_eq!(stream.servers[0].quality.as_deref(), Some("720p"));
    let player = &stream.servers[1];
    assert_eq!(player.name, "Player 480p");
    assert_eq!(player.quality.as_deref(), Some("480p"));
    assert!(urls.iter().all(|u| !u.contains("facebook")));
}

#[tokio::test]
async fn test_deferred_servers_skip_failed_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sousou-no-frieren-episode-5/"))
        .respond_with(page("dooplay_episode.html"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-admin/admin-ajax.php"))
        .and(body_string_contains("action=doo_player_ajax"))
        .and(body_string_contains("nume=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"embed_url":"<iframe src=\"https://blogger.test/v/1\"></iframe>","type":"iframe"}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-admin/admin-ajax.php"))
        .and(body_string_contains("nume=2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<iframe src="https://premium.test/e/2" allowfullscreen></iframe>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-admin/admin-ajax.php"))
        .and(body_string_contains("nume=3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let aggregator = aggregator_for("samehadaku", &server.uri());
    let stream = aggregator
        .get_stream("samehadaku", "sousou-no-frieren-episode-5")
        .await
        .expect("stream should resolve");

    assert_eq!(stream.servers.len(), 2);
    assert_eq!(stream.servers[0].url, "https://blogger.test/v/1");
    assert_eq!(stream.servers[0].name, "Blogspot 360p");
    assert_eq!(stream.servers[0].quality.as_deref(), Some("360p"));
    assert_eq!(stream.servers[1].url, "https://premium.test/e/2");
    assert_eq!(stream.servers[1].quality.as_deref(), Some("720p"));
}

#[tokio::test]
async fn test_unit_page_without_servers_returns_empty_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quiet-episode-1/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1 class=\"entry-title\">Quiet</h1></body></html>"),
        )
        .mount(&server)
        .await;

    let aggregator = aggregator_for("anoboy", &server.uri());
    let stream = aggregator.get_stream("anoboy", "quiet-episode-1").await.unwrap();

    assert_eq!(stream.title, "Quiet");
    assert!(stream.servers.is_empty());
}
