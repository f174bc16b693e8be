//! Device collector tests
//!
//! Each test scripts the hub's answers with mockito and checks the samples
//! recorded by one scrape cycle.

use domoticz_exporter::collectors::{collect_device_metrics, CollectionContext, CollectionStatus};
use domoticz_exporter::config::{DomoticzConfig, ErrorPolicy, ScrapeConfig};
use domoticz_exporter::domoticz::DomoticzClient;
use domoticz_exporter::metrics::MetricsCollector;
use mockito::{Matcher, Mock, ServerGuard};

fn create_test_metrics() -> MetricsCollector {
    MetricsCollector::new().expect("Failed to create test metrics")
}

fn create_client(endpoint: String) -> DomoticzClient {
    let config = DomoticzConfig {
        endpoint,
        ..Default::default()
    };
    DomoticzClient::new(&config).expect("Failed to create client")
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|id| id.to_string()).collect()
}

async fn mock_device(server: &mut ServerGuard, rid: &str, body: &str) -> Mock {
    server
        .mock("GET", "/json.htm")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("type".into(), "devices".into()),
            Matcher::UrlEncoded("rid".into(), rid.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

fn temperature_body(idx: &str, name: &str, temp: f64) -> String {
    format!(
        r#"{{"status":"OK","title":"Devices","result":[{{"idx":"{}","Name":"{}","TypeImg":"temperature","Temp":{}}}]}}"#,
        idx, name, temp
    )
}

/// Sample lines of the rendered registry, leaving out the `domoticz_up` gauge
/// which renders on every scrape
fn device_samples(rendered: &str) -> Vec<&str> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .filter(|line| !line.starts_with("domoticz_up "))
        .collect()
}

async fn scrape(
    client: &DomoticzClient,
    metrics: &MetricsCollector,
    config: &ScrapeConfig,
    device_ids: &[String],
) -> CollectionStatus {
    let ctx = CollectionContext {
        client,
        metrics,
        config,
        device_ids,
    };
    collect_device_metrics(&ctx)
        .await
        .expect("collector returned a fatal error")
}

#[tokio::test]
async fn test_temperature_device_produces_one_sample() {
    // Given: The hub reports a single temperature device
    let mut server = mockito::Server::new_async().await;
    mock_device(
        &mut server,
        "1",
        r#"{"result":[{"idx":"1","Name":"Outdoor","TypeImg":"temperature","Temp":21.5}]}"#,
    )
    .await;

    let client = create_client(server.url());
    let metrics = create_test_metrics();

    // When: Scraping that device
    let status = scrape(&client, &metrics, &ScrapeConfig::default(), &ids(&["1"])).await;

    // Then: Exactly one temperature sample carries the reading
    assert_eq!(status, CollectionStatus::Success);
    let rendered = metrics.render().unwrap();
    assert!(
        rendered.contains("domoticz_temperature{id=\"1\",name=\"Outdoor\"} 21.5"),
        "unexpected output:\n{}",
        rendered
    );
    let gauge = metrics.family("temperature").unwrap();
    assert_eq!(gauge.with_label_values(&["1", "Outdoor"]).get(), 21.5);
}

#[tokio::test]
async fn test_temperature_device_without_reading_exposes_zero() {
    // Given: A temperature device that reports no Temp field
    let mut server = mockito::Server::new_async().await;
    mock_device(
        &mut server,
        "1",
        r#"{"result":[{"idx":"1","Name":"Outdoor","TypeImg":"temperature"}]}"#,
    )
    .await;

    let client = create_client(server.url());
    let metrics = create_test_metrics();

    // When: Scraping that device
    let status = scrape(&client, &metrics, &ScrapeConfig::default(), &ids(&["1"])).await;

    // Then: One sample is exposed with the zero reading
    assert_eq!(status, CollectionStatus::Success);
    let rendered = metrics.render().unwrap();
    assert_eq!(
        device_samples(&rendered),
        vec!["domoticz_temperature{id=\"1\",name=\"Outdoor\"} 0"]
    );
}

#[tokio::test]
async fn test_null_bookkeeping_fields_do_not_abort_the_scrape() {
    let mut server = mockito::Server::new_async().await;
    mock_device(
        &mut server,
        "1",
        r#"{"result":[{"idx":"1","Name":"Outdoor","TypeImg":"temperature","Temp":8.5,"Notifications":null,"HardwareID":null}]}"#,
    )
    .await;

    let client = create_client(server.url());
    let metrics = create_test_metrics();

    let status = scrape(&client, &metrics, &ScrapeConfig::default(), &ids(&["1"])).await;

    assert_eq!(status, CollectionStatus::Success);
    let gauge = metrics.family("temperature").unwrap();
    assert_eq!(gauge.with_label_values(&["1", "Outdoor"]).get(), 8.5);
}

#[tokio::test]
async fn test_non_temperature_device_produces_no_sample() {
    let mut server = mockito::Server::new_async().await;
    mock_device(
        &mut server,
        "12",
        r#"{"result":[{"idx":"12","Name":"Hallway Light","TypeImg":"lightbulb","Data":"On"}]}"#,
    )
    .await;

    let client = create_client(server.url());
    let metrics = create_test_metrics();

    let status = scrape(&client, &metrics, &ScrapeConfig::default(), &ids(&["12"])).await;

    assert_eq!(status, CollectionStatus::Success);
    let rendered = metrics.render().unwrap();
    assert!(!rendered.contains("id=\"12\""));
    assert!(!rendered.contains("domoticz_light{"));
}

#[tokio::test]
async fn test_empty_result_produces_no_sample() {
    // Given: The hub answers with no device for the only configured id
    let mut server = mockito::Server::new_async().await;
    mock_device(&mut server, "1", r#"{"result":[]}"#).await;

    let client = create_client(server.url());
    let metrics = create_test_metrics();

    // When: Scraping
    let status = scrape(&client, &metrics, &ScrapeConfig::default(), &ids(&["1"])).await;

    // Then: The cycle fails and no device sample is exposed, only `domoticz_up`
    assert_eq!(status, CollectionStatus::Failed);
    let rendered = metrics.render().unwrap();
    assert!(device_samples(&rendered).is_empty(), "unexpected output:\n{}", rendered);
    assert!(rendered.contains("domoticz_up 0"));
}

#[tokio::test]
async fn test_abort_policy_stops_at_first_failing_device() {
    // Given: Device 2 returns two results, device 3 must never be requested
    let mut server = mockito::Server::new_async().await;
    mock_device(&mut server, "1", &temperature_body("1", "Kitchen", 20.0)).await;
    mock_device(
        &mut server,
        "2",
        include_str!("resources/domoticz_all_devices_response.json"),
    )
    .await;
    let never_called = server
        .mock("GET", "/json.htm")
        .match_query(Matcher::UrlEncoded("rid".into(), "3".into()))
        .with_status(200)
        .with_body(temperature_body("3", "Attic", 25.0))
        .expect(0)
        .create_async()
        .await;

    let client = create_client(server.url());
    let metrics = create_test_metrics();

    // When: Scraping with the default fail-fast policy
    let status = scrape(
        &client,
        &metrics,
        &ScrapeConfig::default(),
        &ids(&["1", "2", "3"]),
    )
    .await;

    // Then: Only the device before the failure is exposed
    assert_eq!(status, CollectionStatus::Failed);
    let rendered = metrics.render().unwrap();
    assert!(rendered.contains("name=\"Kitchen\""));
    assert!(!rendered.contains("name=\"Attic\""));
    never_called.assert_async().await;
}

#[tokio::test]
async fn test_skip_policy_continues_after_failing_device() {
    let mut server = mockito::Server::new_async().await;
    mock_device(&mut server, "1", &temperature_body("1", "Kitchen", 20.0)).await;
    mock_device(&mut server, "2", "{broken").await;
    mock_device(&mut server, "3", &temperature_body("3", "Attic", 25.0)).await;

    let client = create_client(server.url());
    let metrics = create_test_metrics();
    let config = ScrapeConfig {
        error_policy: ErrorPolicy::SkipAndContinue,
        ..Default::default()
    };

    let status = scrape(&client, &metrics, &config, &ids(&["1", "2", "3"])).await;

    assert_eq!(status, CollectionStatus::Failed);
    let rendered = metrics.render().unwrap();
    assert!(rendered.contains("domoticz_temperature{id=\"1\",name=\"Kitchen\"} 20"));
    assert!(rendered.contains("domoticz_temperature{id=\"3\",name=\"Attic\"} 25"));
}

#[tokio::test]
async fn test_unreachable_hub_produces_no_sample() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = create_client(endpoint);
    let metrics = create_test_metrics();

    let status = scrape(&client, &metrics, &ScrapeConfig::default(), &ids(&["1"])).await;

    // `domoticz_up` is the only sample left
    assert_eq!(status, CollectionStatus::Failed);
    let rendered = metrics.render().unwrap();
    assert!(device_samples(&rendered).is_empty(), "unexpected output:\n{}", rendered);
    assert!(rendered.contains("domoticz_up 0"));
}

#[tokio::test]
async fn test_duplicate_ids_are_fetched_each_time() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/json.htm")
        .match_query(Matcher::UrlEncoded("rid".into(), "1".into()))
        .with_status(200)
        .with_body(temperature_body("1", "Kitchen", 20.0))
        .expect(2)
        .create_async()
        .await;

    let client = create_client(server.url());
    let metrics = create_test_metrics();

    let status = scrape(&client, &metrics, &ScrapeConfig::default(), &ids(&["1", "1"])).await;

    assert_eq!(status, CollectionStatus::Success);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_fetches_match_sequential_output() {
    // Given: Five temperature devices
    let mut server = mockito::Server::new_async().await;
    let device_ids = ids(&["1", "2", "3", "4", "5"]);
    for (offset, id) in device_ids.iter().enumerate() {
        let body = temperature_body(id, &format!("Room {}", id), 18.0 + offset as f64);
        mock_device(&mut server, id, &body).await;
    }
    let client = create_client(server.url());

    // When: Scraping sequentially and with four fetches in flight
    let sequential = create_test_metrics();
    scrape(&client, &sequential, &ScrapeConfig::default(), &device_ids).await;

    let concurrent = create_test_metrics();
    let config = ScrapeConfig {
        max_concurrent_fetches: 4,
        ..Default::default()
    };
    let status = scrape(&client, &concurrent, &config, &device_ids).await;

    // Then: Both runs expose the same samples
    assert_eq!(status, CollectionStatus::Success);
    assert_eq!(sequential.render().unwrap(), concurrent.render().unwrap());
    assert!(concurrent
        .render()
        .unwrap()
        .contains("domoticz_temperature{id=\"5\",name=\"Room 5\"} 22"));
}

#[tokio::test]
async fn test_scrape_is_deterministic() {
    let mut server = mockito::Server::new_async().await;
    mock_device(&mut server, "1", &temperature_body("1", "Kitchen", 20.0)).await;
    mock_device(&mut server, "2", r#"{"result":[]}"#).await;
    mock_device(&mut server, "3", &temperature_body("3", "Attic", 25.0)).await;

    let client = create_client(server.url());
    let device_ids = ids(&["1", "2", "3"]);

    let first = create_test_metrics();
    let second = create_test_metrics();
    scrape(&client, &first, &ScrapeConfig::default(), &device_ids).await;
    scrape(&client, &second, &ScrapeConfig::default(), &device_ids).await;

    assert_eq!(first.render().unwrap(), second.render().unwrap());
}
