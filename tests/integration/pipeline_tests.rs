//! End-to-end runs through the coordinator against a mock server

use ld_harvest::config::Config;
use ld_harvest::crawler::{run_harvest, Coordinator};
use ld_harvest::{ConfigError, HarvestError, ResultOutcome};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Page with a single hotel block
fn hotel_page(name: &str) -> String {
    format!(
        r#"<html><head>
        <script type="application/ld+json">{{"@type": "BreadcrumbList", "itemListElement": []}}</script>
        <script type="application/ld+json">{{"@type": "Hotel", "name": "{}"}}</script>
        </head><body>Welcome</body></html>"#,
        name
    )
}

/// Creates a test configuration with fast timings and no delay
fn create_test_config(urls: Vec<String>) -> Config {
    let mut config = Config {
        urls,
        ..Config::default()
    };
    config.scraper.concurrency = 2;
    config.scraper.timeout_secs = 1;
    config.scraper.resolve_timeout_secs = 2;
    config.scraper.delay_ms_min = 0;
    config.scraper.delay_ms_max = 0;
    config
}

#[tokio::test]
async fn test_timeout_then_success_on_new_session() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Short link redirects to the hotel page
    Mock::given(method("HEAD"))
        .and(path("/h1"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "/hotel/grand"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/hotel/grand"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    // First GET stalls past the fetch timeout
    Mock::given(method("GET"))
        .and(path("/hotel/grand"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(hotel_page("Grand Example"))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hotel/grand"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(hotel_page("Grand Example"))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(vec![format!("{}/h1", base_url)]);
    let coordinator = Coordinator::new(config, "test").expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Harvest failed");

    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert_eq!(result.original_url, format!("{}/h1", base_url));
    assert_eq!(result.final_url, format!("{}/hotel/grand", base_url));
    assert!(result.error.is_none(), "unexpected error {:?}", result.error);
    assert_eq!(result.outcome, ResultOutcome::EntityFound);
    assert_eq!(result.attempts, 2);
    assert_eq!(
        result.selected_entity.as_ref().unwrap()["name"],
        "Grand Example"
    );
    assert_eq!(result.structured_blocks.len(), 2);

    // The retry forced a second session
    assert_eq!(coordinator.sessions().session_count(), 2);
    assert_eq!(result.session_id, Some(2));

    assert_eq!(report.stats.total_urls, 1);
    assert_eq!(report.stats.successes, 1);
    assert_eq!(report.stats.failures, 0);
}

#[tokio::test]
async fn test_all_urls_failing() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let urls: Vec<String> = (1..=3).map(|i| format!("{}/broken/{}", base_url, i)).collect();
    let report = run_harvest(create_test_config(urls.clone()), "test")
        .await
        .expect("Harvest failed");

    assert_eq!(report.results.len(), 3);
    for (result, url) in report.results.iter().zip(&urls) {
        assert_eq!(&result.original_url, url);
        assert_eq!(result.error.as_deref(), Some("status:500"));
        assert!(result.selected_entity.is_none());
        assert_eq!(result.outcome, ResultOutcome::FetchFailed);
        assert_eq!(result.attempts, 2);
    }
    assert_eq!(report.stats.total_urls, 3);
    assert_eq!(report.stats.successes, 0);
    assert_eq!(report.stats.failures, 3);
}

#[tokio::test]
async fn test_page_without_target_entity() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/org"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<script type="application/ld+json">{"@type": "Organization"}</script>"#,
        ))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nothing here</html>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let report = run_harvest(
        create_test_config(vec![
            format!("{}/org", base_url),
            format!("{}/plain", base_url),
        ]),
        "test",
    )
    .await
    .expect("Harvest failed");

    assert_eq!(report.results[0].error.as_deref(), Some("status:200"));
    assert_eq!(report.results[0].outcome, ResultOutcome::NoMatchingEntity);
    assert_eq!(report.results[0].structured_blocks.len(), 1);
    assert_eq!(report.results[1].error.as_deref(), Some("status:200"));
    assert_eq!(report.results[1].outcome, ResultOutcome::NoStructuredData);
}

#[tokio::test]
async fn test_results_match_inputs() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(hotel_page("Any")))
        .mount(&mock_server)
        .await;

    let urls: Vec<String> = (0..11).map(|i| format!("{}/hotel/{}", base_url, i)).collect();
    let mut config = create_test_config(urls.clone());
    config.scraper.concurrency = 4;

    let report = run_harvest(config, "test").await.expect("Harvest failed");

    let recorded: Vec<&String> = report.results.iter().map(|r| &r.original_url).collect();
    assert_eq!(recorded, urls.iter().collect::<Vec<_>>());
    assert_eq!(report.stats.successes, 11);
}

#[tokio::test]
async fn test_sessions_rotate_after_page_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(hotel_page("Any")))
        .mount(&mock_server)
        .await;

    let urls: Vec<String> = (0..5).map(|i| format!("{}/hotel/{}", base_url, i)).collect();
    let mut config = create_test_config(urls);
    config.scraper.concurrency = 1;
    config.scraper.session_pages = 2;

    let coordinator = Coordinator::new(config, "test").expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Harvest failed");

    assert_eq!(report.stats.successes, 5);
    assert_eq!(coordinator.sessions().session_count(), 3);

    let session_ids: Vec<Option<u64>> = report.results.iter().map(|r| r.session_id).collect();
    assert_eq!(
        session_ids,
        vec![Some(1), Some(1), Some(2), Some(2), Some(3)]
    );
}

#[tokio::test]
async fn test_resolution_can_be_disabled() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(hotel_page("Direct")))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(vec![format!("{}/hotel", base_url)]);
    config.scraper.resolve_redirects = false;

    let report = run_harvest(config, "test").await.expect("Harvest failed");

    assert_eq!(report.stats.successes, 1);
}

#[tokio::test]
async fn test_rejected_inputs_are_reported() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/hotel/kept"))
        .respond_with(ResponseTemplate::new(200).set_body_string(hotel_page("Kept")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let urls = vec![
        "not a url".to_string(),
        format!("{}/hotel/kept", base_url),
        "ftp://files.example/hotel".to_string(),
    ];
    let mut config = create_test_config(urls);
    config.scraper.resolve_redirects = false;

    let report = run_harvest(config, "test").await.expect("Harvest failed");

    assert_eq!(report.rejected_urls, 2);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.stats.total_urls, 1);
    assert_eq!(report.stats.successes, 1);
}

#[tokio::test]
async fn test_no_usable_urls_fails_before_fetching() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(vec![
        "not a url".to_string(),
        "ftp://files.example/hotel".to_string(),
    ]);

    let result = run_harvest(config, "test").await;

    assert!(matches!(
        result,
        Err(HarvestError::Config(ConfigError::NoUrls))
    ));
}
