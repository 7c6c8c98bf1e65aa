//! Wire format tests for the PowerDNS controller against a mock HTTP server
//!
//! Constraints verified:
//! - Every request carries the API key header
//! - Zone pulls parse RRsets including disabled flags and comments
//! - Publishes PATCH exactly one whole RRset with changetype REPLACE
//! - HTTP status codes map onto the error taxonomy
//! - Dry-run mode never PATCHes

use dnslb_core::model::{Record, RecordSet};
use dnslb_core::traits::DnsController;
use dnslb_core::Error;
use dnslb_provider_powerdns::PowerDnsController;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZONE_PATH: &str = "/api/v1/servers/localhost/zones/gw.lo.";

fn zone_body() -> serde_json::Value {
    json!({
        "id": "gw.lo.",
        "name": "gw.lo.",
        "kind": "Native",
        "serial": 2024010101,
        "rrsets": [
            {
                "comments": [],
                "name": "api-int.gw.lo.",
                "records": [
                    {"content": "192.168.1.200", "disabled": true},
                    {"content": "192.168.1.201", "disabled": false}
                ],
                "ttl": 86400,
                "type": "A"
            },
            {
                "comments": [{"content": "primary", "account": "ops", "modified_at": 0}],
                "name": "gw.lo.",
                "records": [{"content": "ns1.gw.lo. admin.gw.lo. 1 10800 3600 604800 3600", "disabled": false}],
                "ttl": 3600,
                "type": "SOA"
            }
        ]
    })
}

fn controller(server: &MockServer) -> PowerDnsController {
    PowerDnsController::new_live(server.uri(), "Secret2018", "localhost").unwrap()
}

#[tokio::test]
async fn fetch_zone_parses_rrsets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ZONE_PATH))
        .and(header("X-API-Key", "Secret2018"))
        .respond_with(ResponseTemplate::new(200).set_body_json(zone_body()))
        .expect(1)
        .mount(&server)
        .await;

    let sets = controller(&server).fetch_zone("gw.lo.").await.unwrap();

    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].name, "api-int.gw.lo.");
    assert_eq!(sets[0].record_type, "A");
    assert_eq!(sets[0].ttl, 86400);
    assert_eq!(sets[0].disabled_flags(), vec![true, false]);
    assert!(sets[0].is_eligible());
    assert_eq!(sets[1].comments.len(), 1);
    assert!(!sets[1].is_eligible());
}

#[tokio::test]
async fn list_zones_returns_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers/localhost/zones"))
        .and(header("X-API-Key", "Secret2018"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "gw.lo.", "name": "gw.lo.", "kind": "Native"},
            {"id": "example.", "name": "example.", "kind": "Master"}
        ])))
        .mount(&server)
        .await;

    let zones = controller(&server).list_zones().await.unwrap();
    assert_eq!(zones, vec!["gw.lo.".to_string(), "example.".to_string()]);
}

#[tokio::test]
async fn publish_patches_one_whole_rrset() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(ZONE_PATH))
        .and(header("X-API-Key", "Secret2018"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "rrsets": [{
                "name": "api-int.gw.lo.",
                "type": "A",
                "ttl": 86400,
                "changetype": "REPLACE",
                "records": [
                    {"content": "192.168.1.200", "disabled": false},
                    {"content": "192.168.1.201", "disabled": true}
                ],
                "comments": []
            }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let set = RecordSet::new("api-int.gw.lo.", "A", 86400)
        .with_record(Record::new("192.168.1.200"))
        .with_record(Record::new("192.168.1.201").with_disabled(true));

    controller(&server)
        .publish_record_set("gw.lo.", &set)
        .await
        .unwrap();
}

#[tokio::test]
async fn dry_run_never_patches() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let controller =
        PowerDnsController::new_dry_run(server.uri(), "Secret2018", "localhost").unwrap();
    let set = RecordSet::new("api-int.gw.lo.", "A", 60)
        .with_record(Record::new("192.168.1.200"))
        .with_record(Record::new("192.168.1.201"));

    controller.publish_record_set("gw.lo.", &set).await.unwrap();
}

#[tokio::test]
async fn status_codes_map_to_errors() {
    let server = MockServer::start().await;
    let controller = controller(&server);

    Mock::given(method("GET"))
        .and(path("/api/v1/servers/localhost/zones/denied."))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers/localhost/zones/missing."))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers/localhost/zones/busy."))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers/localhost/zones/broken."))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend down"))
        .mount(&server)
        .await;

    assert!(matches!(
        controller.fetch_zone("denied.").await,
        Err(Error::Authentication(_))
    ));
    assert!(matches!(
        controller.fetch_zone("missing.").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        controller.fetch_zone("busy.").await,
        Err(Error::RateLimited(_))
    ));
    let err = controller.fetch_zone("broken.").await.unwrap_err();
    assert!(err.to_string().contains("backend down"));
}

#[tokio::test]
async fn rejected_publish_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(ZONE_PATH))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"error": "Record api-int.gw.lo./A: bad content"})),
        )
        .mount(&server)
        .await;

    let set = RecordSet::new("api-int.gw.lo.", "A", 60)
        .with_record(Record::new("192.168.1.200"))
        .with_record(Record::new("192.168.1.201"));

    let err = controller(&server)
        .publish_record_set("gw.lo.", &set)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
    assert!(err.to_string().contains("bad content"));
}

#[tokio::test]
async fn malformed_zone_is_a_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ZONE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "gw.lo.",
            "rrsets": [{"name": "api-int.gw.lo.", "records": "not-a-list"}]
        })))
        .mount(&server)
        .await;

    let err = controller(&server).fetch_zone("gw.lo.").await.unwrap_err();
    assert!(matches!(err, Error::Fetch { .. }));
}
