//! Result sinks fed by a real run

use ld_harvest::config::{load_config_with_hash, Config};
use ld_harvest::crawler::run_harvest;
use ld_harvest::storage::{RunStatus, SqliteStorage, Storage};
use ld_harvest::ResultOutcome;
use serde_json::Value;
use std::io::Write;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_site(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/hotel"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<script type="application/ld+json">{"@type": ["Hotel", "Place"], "name": "Seaside"}</script>"#,
        ))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(mock_server)
        .await;
}

fn create_test_config(base_url: &str) -> Config {
    let mut config = Config {
        urls: vec![format!("{}/hotel", base_url), format!("{}/gone", base_url)],
        ..Config::default()
    };
    config.scraper.delay_ms_min = 0;
    config.scraper.delay_ms_max = 0;
    config
}

#[tokio::test]
async fn test_jsonl_dataset() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let jsonl_path = dir.path().join("results.jsonl");

    let mut config = create_test_config(&mock_server.uri());
    config.output.jsonl_path = Some(jsonl_path.clone());

    run_harvest(config, "test").await.expect("Harvest failed");

    let content = std::fs::read_to_string(&jsonl_path).expect("Failed to read dataset");
    let records: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect();

    assert_eq!(records.len(), 3);

    let hotel = records
        .iter()
        .find(|r| r["url"].as_str().is_some_and(|u| u.ends_with("/hotel")))
        .expect("Missing hotel record");
    assert_eq!(hotel["hotelInfo"]["name"], "Seaside");
    assert!(hotel.get("error").is_none());
    assert!(hotel["scrapedAt"].is_string());

    let gone = records
        .iter()
        .find(|r| r["url"].as_str().is_some_and(|u| u.ends_with("/gone")))
        .expect("Missing gone record");
    assert_eq!(gone["error"], "status:410");
    assert!(gone.get("hotelInfo").is_none());
    assert_eq!(gone["jsonLdData"].as_array().map(Vec::len), Some(0));

    // Run statistics come last
    let stats = &records[2];
    assert_eq!(stats["type"], "run-stats");
    assert_eq!(stats["total_urls"], 2);
    assert_eq!(stats["successes"], 1);
    assert_eq!(stats["failures"], 1);
    assert!(stats["run_duration_seconds"].as_f64().is_some());
}

#[tokio::test]
async fn test_sqlite_records_run() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("harvest.db");

    let mut config = create_test_config(&mock_server.uri());
    config.output.database_path = Some(db_path.clone());

    let report = run_harvest(config, "cafebabe").await.expect("Harvest failed");

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    let run = storage
        .get_latest_run()
        .expect("Failed to query runs")
        .expect("No run recorded");

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "cafebabe");
    assert_eq!(run.stats.as_ref().map(|s| s.successes), Some(1));
    assert_eq!(run.stats.as_ref().map(|s| s.total_urls), Some(2));

    let stored = storage.results_for_run(run.id).expect("Failed to load results");
    assert_eq!(stored.len(), 2);
    assert_eq!(
        storage
            .count_results(run.id, Some(ResultOutcome::EntityFound))
            .unwrap(),
        1
    );
    assert_eq!(
        storage
            .count_results(run.id, Some(ResultOutcome::FetchFailed))
            .unwrap(),
        1
    );

    let hotel = stored
        .iter()
        .find(|s| s.result.original_url.ends_with("/hotel"))
        .expect("Missing hotel row");
    let in_report = report
        .results
        .iter()
        .find(|r| r.original_url.ends_with("/hotel"))
        .unwrap();
    assert_eq!(hotel.result.selected_entity, in_report.selected_entity);
    assert_eq!(hotel.result.structured_blocks, in_report.structured_blocks);
}

#[tokio::test]
async fn test_second_run_appends_new_run() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("harvest.db");

    for _ in 0..2 {
        let mut config = create_test_config(&mock_server.uri());
        config.output.database_path = Some(db_path.clone());
        run_harvest(config, "test").await.expect("Harvest failed");
    }

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    let latest = storage.get_latest_run().unwrap().unwrap();
    let first = storage.get_run(latest.id - 1).expect("First run missing");

    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(storage.count_results(first.id, None).unwrap(), 2);
    assert_eq!(storage.count_results(latest.id, None).unwrap(), 2);
}

#[tokio::test]
async fn test_config_file_end_to_end() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let jsonl_path = dir.path().join("out.jsonl");
    let config_path = dir.path().join("harvest.toml");

    let mut file = std::fs::File::create(&config_path).expect("Failed to create config");
    write!(
        file,
        r#"
[[start-urls]]
url = "{base}/hotel"

[scraper]
concurrency = 1
delay-ms-min = 0
delay-ms-max = 0

[extraction]
target-types = ["LodgingBusiness", "Hotel"]

[output]
jsonl-path = "{jsonl}"
"#,
        base = mock_server.uri(),
        jsonl = jsonl_path.display()
    )
    .expect("Failed to write config");
    drop(file);

    let (config, hash) = load_config_with_hash(&config_path).expect("Failed to load config");
    assert_eq!(hash.len(), 64);

    let report = run_harvest(config, &hash).await.expect("Harvest failed");

    assert_eq!(report.stats.successes, 1);
    assert!(jsonl_path.exists());
}
