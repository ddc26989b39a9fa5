// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook-backed publisher and notifier.
//!
//! Both adapters POST JSON to a configured URL with a bounded timeout. The
//! publisher classifies HTTP status codes into
//! [`PublishErrorKind`](dripfeed_core::PublishErrorKind) so the routing
//! layer can fall back to manual review when the surface is degraded. When
//! no review endpoint is configured, review requests are written to the log
//! and resolved through the `review` subcommand.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use dripfeed_core::traits::{Notifier, Publisher};
use dripfeed_core::{
    DripfeedError, MediaItem, PublishErrorKind, PublishReceipt, QueueEntry, ReviewHandle,
};

fn build_client(timeout: std::time::Duration) -> Result<reqwest::Client, DripfeedError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DripfeedError::Internal(format!("http client: {e}")))
}

/// Publishes items by POSTing them to a webhook endpoint.
pub struct WebhookPublisher {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl WebhookPublisher {
    pub fn new(
        endpoint: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, DripfeedError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
        })
    }

    fn classify(status: reqwest::StatusCode) -> PublishErrorKind {
        match status.as_u16() {
            429 => PublishErrorKind::RateLimited,
            401 | 403 => PublishErrorKind::CredentialExpired,
            500..=599 => PublishErrorKind::Transient,
            _ => PublishErrorKind::Permanent,
        }
    }
}

#[async_trait]
impl Publisher for WebhookPublisher {
    async fn publish(
        &self,
        item: &MediaItem,
        idempotency_key: &str,
    ) -> Result<PublishReceipt, DripfeedError> {
        let Some(endpoint) = &self.endpoint else {
            // Unconfigured surface routes everything to review.
            return Err(DripfeedError::Publish {
                kind: PublishErrorKind::Transient,
                message: "no publish endpoint configured".to_string(),
            });
        };

        let body = json!({
            "media_id": item.id.0,
            "tenant": item.tenant.as_param(),
            "source": item.source,
            "caption": item.caption,
            "category": item.category,
            "idempotency_key": idempotency_key,
        });

        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| DripfeedError::Publish {
                kind: PublishErrorKind::Transient,
                message: format!("publish request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DripfeedError::Publish {
                kind: Self::classify(status),
                message: format!("publish endpoint answered {status}"),
            });
        }

        let remote_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("remote_id").and_then(|id| id.as_str()).map(String::from));
        Ok(PublishReceipt { remote_id })
    }
}

/// Delivers review requests to a webhook, or to the log when no endpoint is
/// configured.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl WebhookNotifier {
    pub fn new(
        endpoint: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, DripfeedError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_for_review(
        &self,
        item: &MediaItem,
        entry: &QueueEntry,
    ) -> Result<ReviewHandle, DripfeedError> {
        let Some(endpoint) = &self.endpoint else {
            info!(
                entry_id = %entry.id,
                media_id = %item.id,
                source = %item.source,
                "review requested; resolve with: dripfeed review {} <posted|skipped|rejected>",
                entry.id
            );
            return Ok(ReviewHandle {
                reference: format!("log:{}", entry.id),
            });
        };

        let body = json!({
            "entry_id": entry.id,
            "media_id": item.id.0,
            "tenant": item.tenant.as_param(),
            "source": item.source,
            "caption": item.caption,
            "scheduled_for": entry.scheduled_for.to_rfc3339(),
        });

        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| DripfeedError::Notify {
                message: format!("review request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DripfeedError::Notify {
                message: format!("review endpoint answered {status}"),
                source: None,
            });
        }

        let reference = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("reference").and_then(|r| r.as_str()).map(String::from))
            .unwrap_or_else(|| format!("webhook:{}", entry.id));
        Ok(ReviewHandle { reference })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dripfeed_core::Tenant;
    use dripfeed_test_utils::{entry_fixture, media_fixture};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn timeout() -> std::time::Duration {
        std::time::Duration::from_secs(2)
    }

    #[tokio::test]
    async fn publisher_posts_item_and_reads_remote_id() {
        let server = MockServer::start().await;
        let item = media_fixture("m1", &Tenant::global(), Some("general"));
        Mock::given(method("POST"))
            .and(path("/publish"))
            .and(body_partial_json(json!({
                "media_id": "m1",
                "idempotency_key": "e1:m1",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "remote_id": "post-777",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let publisher =
            WebhookPublisher::new(Some(format!("{}/publish", server.uri())), timeout()).unwrap();
        let receipt = publisher.publish(&item, "e1:m1").await.unwrap();
        assert_eq!(receipt.remote_id.as_deref(), Some("post-777"));
    }

    #[tokio::test]
    async fn publisher_classifies_http_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let publisher = WebhookPublisher::new(Some(server.uri()), timeout()).unwrap();
        let item = media_fixture("m1", &Tenant::global(), None);
        let err = publisher.publish(&item, "k").await.unwrap_err();
        match err {
            DripfeedError::Publish { kind, .. } => {
                assert_eq!(kind, PublishErrorKind::RateLimited);
            }
            other => panic!("expected publish error, got {other}"),
        }

        assert_eq!(
            WebhookPublisher::classify(reqwest::StatusCode::UNAUTHORIZED),
            PublishErrorKind::CredentialExpired
        );
        assert_eq!(
            WebhookPublisher::classify(reqwest::StatusCode::BAD_GATEWAY),
            PublishErrorKind::Transient
        );
        assert_eq!(
            WebhookPublisher::classify(reqwest::StatusCode::NOT_FOUND),
            PublishErrorKind::Permanent
        );
    }

    #[tokio::test]
    async fn unconfigured_publisher_reports_transient() {
        let publisher = WebhookPublisher::new(None, timeout()).unwrap();
        let item = media_fixture("m1", &Tenant::global(), None);
        let err = publisher.publish(&item, "k").await.unwrap_err();
        assert!(matches!(
            err,
            DripfeedError::Publish {
                kind: PublishErrorKind::Transient,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn notifier_delivers_and_returns_reference() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/review"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "reference": "msg-42",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::new(Some(format!("{}/review", server.uri())), timeout()).unwrap();
        let item = media_fixture("m1", &Tenant::global(), None);
        let entry = entry_fixture(&item, Utc::now());
        let handle = notifier.notify_for_review(&item, &entry).await.unwrap();
        assert_eq!(handle.reference, "msg-42");
    }

    #[tokio::test]
    async fn notifier_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(Some(server.uri()), timeout()).unwrap();
        let item = media_fixture("m1", &Tenant::global(), None);
        let entry = entry_fixture(&item, Utc::now());
        assert!(notifier.notify_for_review(&item, &entry).await.is_err());
    }

    #[tokio::test]
    async fn unconfigured_notifier_falls_back_to_the_log() {
        let notifier = WebhookNotifier::new(None, timeout()).unwrap();
        let item = media_fixture("m1", &Tenant::global(), None);
        let entry = entry_fixture(&item, Utc::now());
        let handle = notifier.notify_for_review(&item, &entry).await.unwrap();
        assert_eq!(handle.reference, format!("log:{}", entry.id));
    }
}
