//! Integration tests for notifier delivery
//!
//! These tests verify that:
//! - The webhook notifier posts status and combined payloads
//! - The Discord notifier mentions the configured user on errors
//! - An unchanged combined view is posted to Discord only once
//! - A combined view whose post failed is posted again next cycle
//! - Rejected posts surface as delivery errors and are swallowed by notifiers

use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::{Value, json};
use url::Url;
use watchpost::{
    Error, Severity, Unit,
    alerting::StatusAlerter,
    config::{Discord, Webhook},
    notify::{DiscordNotifier, Notifier, WebhookNotifier},
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{current, measurement, snapshot};

async fn mock_endpoint(status: u16) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&mock_server)
        .await;
    mock_server
}

fn hook_url(mock_server: &MockServer) -> String {
    Url::parse(&mock_server.uri())
        .and_then(|base| base.join("/hook"))
        .unwrap()
        .to_string()
}

async fn received_bodies(mock_server: &MockServer) -> Vec<Value> {
    mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_webhook_receives_single_and_combined_alerts() {
    let mock_server = mock_endpoint(200).await;
    let notifier = Arc::new(WebhookNotifier::new(Webhook {
        url: hook_url(&mock_server),
    }));
    let alerter = StatusAlerter::new(vec![notifier]);

    let unit = Unit::new("api", "api-1");
    let snapshot = snapshot(&unit, vec![measurement("latency", Severity::Error, "900ms")]);
    alerter
        .handle(&unit, &snapshot, &current(&[snapshot.clone()]))
        .await;

    let bodies = received_bodies(&mock_server).await;
    assert_eq!(bodies.len(), 2);

    assert_eq!(bodies[0]["type"], "status");
    assert_eq!(bodies[0]["measurement"]["key"], "latency");
    assert_eq!(bodies[0]["measurement"]["status"], "ERROR");

    assert_eq!(bodies[1]["type"], "combined");
    assert_eq!(
        bodies[1]["lines"][0]["header"],
        "latency @ api: 1 x error, 0 x warn, 0 x ok"
    );
}

#[tokio::test]
async fn test_discord_mentions_user_on_error() {
    let mock_server = mock_endpoint(204).await;
    let notifier = DiscordNotifier::new(Discord {
        url: hook_url(&mock_server),
        user_id: Some("1234".to_string()),
    });

    let unit = Unit::new("api", "api-1");
    notifier
        .alert_about_status(&unit, &measurement("latency", Severity::Error, "900ms"))
        .await;
    notifier
        .alert_about_status(&unit, &measurement("disk", Severity::Warn, "81%"))
        .await;

    let bodies = received_bodies(&mock_server).await;
    assert_eq!(bodies.len(), 2);

    assert_eq!(bodies[0]["content"], "🟥 (api-1 ~ latency) <@1234>");
    assert_eq!(bodies[0]["embeds"][0]["title"], "🟥 latency is ERROR");
    assert!(bodies[1].get("content").is_none());
}

#[tokio::test]
async fn test_discord_posts_combined_view_on_change_only() {
    let mock_server = mock_endpoint(204).await;
    let notifier = Arc::new(DiscordNotifier::new(Discord {
        url: hook_url(&mock_server),
        user_id: None,
    }));
    let alerter = StatusAlerter::new(vec![notifier]);

    let unit = Unit::new("api", "api-1");
    let degraded = current(&[snapshot(
        &unit,
        vec![measurement("latency", Severity::Warn, "300ms")],
    )]);

    alerter.handle_combined_alerting(&degraded).await;
    alerter.handle_combined_alerting(&degraded).await;
    assert_eq!(received_bodies(&mock_server).await.len(), 1);

    let healthy = current(&[snapshot(
        &unit,
        vec![measurement("latency", Severity::Info, "80ms")],
    )]);
    alerter.handle_combined_alerting(&healthy).await;
    alerter.handle_combined_alerting(&healthy).await;

    let bodies = received_bodies(&mock_server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["embeds"][0]["title"], "latency @ api: 0 x error, 1 x warn, 0 x ok");
    assert_eq!(bodies[1]["content"], "✅ All components are OK");
}

#[tokio::test]
async fn test_failed_delivery_does_not_block_alerting() {
    let mock_server = mock_endpoint(500).await;
    let notifier = Arc::new(WebhookNotifier::new(Webhook {
        url: hook_url(&mock_server),
    }));
    let alerter = StatusAlerter::new(vec![notifier]);

    let unit = Unit::new("api", "api-1");
    let snapshot = snapshot(&unit, vec![measurement("latency", Severity::Error, "900ms")]);

    let plan = alerter.handle_single_event_alerting(&unit, &snapshot).await;
    assert_eq!(plan.changes.len(), 1);

    // The alert is recorded even though delivery failed
    let plan = alerter.handle_single_event_alerting(&unit, &snapshot).await;
    assert!(plan.is_empty());
}

#[tokio::test]
async fn test_discord_retries_combined_view_after_failed_post() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let notifier = Arc::new(DiscordNotifier::new(Discord {
        url: hook_url(&mock_server),
        user_id: None,
    }));
    let alerter = StatusAlerter::new(vec![notifier]);

    let degraded = current(&[snapshot(
        &Unit::new("api", "api-1"),
        vec![measurement("latency", Severity::Error, "900ms")],
    )]);

    // rejected, then delivered, then unchanged
    for _ in 0..3 {
        alerter.handle_combined_alerting(&degraded).await;
    }

    let bodies = received_bodies(&mock_server).await;
    assert_eq!(bodies.len(), 2);
    for body in &bodies {
        assert_eq!(
            body["embeds"][0]["title"],
            "latency @ api: 1 x error, 0 x warn, 0 x ok"
        );
    }
}

#[tokio::test]
async fn test_rejected_webhook_post_is_delivery_error() {
    let mock_server = mock_endpoint(503).await;
    let notifier = WebhookNotifier::new(Webhook {
        url: hook_url(&mock_server),
    });

    let result = notifier.send(&json!({ "type": "combined", "lines": [] })).await;
    assert_matches!(result, Err(Error::Delivery { status: 503, .. }));
}
