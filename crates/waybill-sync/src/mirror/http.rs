//! # HTTP Mirror
//!
//! Uploads into a PostgREST-compatible REST endpoint: one table per entity
//! class, a unique constraint on the natural-key column.
//!
//! ## Requests
//! ```text
//! count   HEAD /{table}?select={key}          Prefer: count=exact
//!         ← Content-Range: 0-24/25
//!
//! keys    GET  /{table}?select={key}&order={key}.asc&limit=1000&offset=N
//!         ← [{"invoice_number": "KS1001"}, ...]
//!
//! upsert  POST /{table}?on_conflict={key}
//!         Prefer: resolution=merge-duplicates,return=minimal
//!         → [{...}, {...}]
//! ```
//!
//! Every request carries the API key both as `apikey` and as a bearer token.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use waybill_core::EntityClass;

use super::{MirrorRecord, RemoteMirror};
use crate::error::{MirrorError, MirrorResult};

/// Rows fetched per page when listing keys.
const KEY_PAGE_SIZE: usize = 1000;

/// REST mirror client.
#[derive(Debug, Clone)]
pub struct HttpMirror {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMirror {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> MirrorResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpMirror {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: Method, class: EntityClass, query: &str) -> RequestBuilder {
        let url = format!("{}/{}?{}", self.base_url, class.as_str(), query);
        let mut builder = self.client.request(method, url);
        if let Some(ref key) = self.api_key {
            builder = builder
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}"));
        }
        builder
    }

    /// Turns a non-2xx answer into `MirrorError::Status` with its body.
    async fn check(response: Response) -> MirrorResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MirrorError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Total from a `Content-Range` value: `0-24/25` or `*/0`.
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Key column of one row; numbers are accepted and stringified.
fn key_of(row: &Map<String, Value>, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl RemoteMirror for HttpMirror {
    fn describe(&self) -> String {
        format!("http {}", self.base_url)
    }

    async fn count(&self, class: EntityClass) -> MirrorResult<u64> {
        let query = format!("select={}", class.natural_key_field());
        let response = self
            .request(Method::HEAD, class, &query)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = Self::check(response).await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| MirrorError::InvalidResponse("missing Content-Range".into()))?;
        parse_content_range(range)
            .ok_or_else(|| MirrorError::InvalidResponse(format!("bad Content-Range: {range}")))
    }

    async fn keys(&self, class: EntityClass) -> MirrorResult<HashSet<String>> {
        let field = class.natural_key_field();
        let mut keys = HashSet::new();
        let mut offset = 0usize;

        loop {
            // Offset paging is only stable over a total order.
            let query =
                format!("select={field}&order={field}.asc&limit={KEY_PAGE_SIZE}&offset={offset}");
            let response = self.request(Method::GET, class, &query).send().await?;
            let rows: Vec<Map<String, Value>> = Self::check(response).await?.json().await?;

            let page_len = rows.len();
            keys.extend(rows.iter().filter_map(|row| key_of(row, field)));
            if page_len < KEY_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        debug!(class = %class, keys = keys.len(), "Fetched remote keys");
        Ok(keys)
    }

    async fn upsert(&self, class: EntityClass, records: &[MirrorRecord]) -> MirrorResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let body: Vec<&Value> = records.iter().map(|r| &r.payload).collect();
        let query = format!("on_conflict={}", class.natural_key_field());

        let response = self
            .request(Method::POST, class, &query)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;

        debug!(class = %class, records = records.len(), "Upserted batch");
        Ok(records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, headers, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mirror(server: &MockServer) -> HttpMirror {
        HttpMirror::new(&server.uri(), Some("secret".into()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-24/25"), Some(25));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[tokio::test]
    async fn test_count_reads_content_range() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/shipments"))
            .and(query_param("select", "invoice_number"))
            .and(header("Prefer", "count=exact"))
            .and(header("apikey", "secret"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-2/3"))
            .mount(&server)
            .await;

        assert_eq!(mirror(&server).count(EntityClass::Shipments).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shippers"))
            .and(query_param("select", "name_key"))
            .and(query_param("order", "name_key.asc"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name_key": "andes flowers"},
                {"name_key": "rosaprima"}
            ])))
            .mount(&server)
            .await;

        let keys = mirror(&server).keys(EntityClass::Shippers).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("rosaprima"));
    }

    #[tokio::test]
    async fn test_keys_walk_ordered_pages() {
        let server = MockServer::start().await;
        let first_page: Vec<Value> = (0..KEY_PAGE_SIZE)
            .map(|n| json!({"invoice_number": format!("KS{n:05}")}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/shipments"))
            .and(query_param("order", "invoice_number.asc"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(first_page)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/shipments"))
            .and(query_param("order", "invoice_number.asc"))
            .and(query_param("offset", KEY_PAGE_SIZE.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"invoice_number": "ZZ1"},
                {"invoice_number": "ZZ2"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let keys = mirror(&server).keys(EntityClass::Shipments).await.unwrap();
        assert_eq!(keys.len(), KEY_PAGE_SIZE + 2);
        assert!(keys.contains("KS00999"));
        assert!(keys.contains("ZZ2"));
    }

    #[tokio::test]
    async fn test_upsert_merges_on_natural_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shipments"))
            .and(query_param("on_conflict", "invoice_number"))
            .and(headers("Prefer", vec!["resolution=merge-duplicates", "return=minimal"]))
            .and(header("Authorization", "Bearer secret"))
            .and(body_json(json!([{"invoice_number": "KS1001"}])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let records = vec![MirrorRecord {
            key: "KS1001".into(),
            payload: json!({"invoice_number": "KS1001"}),
        }];
        let written = mirror(&server)
            .upsert(EntityClass::Shipments, &records)
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_empty_upsert_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let written = mirror(&server).upsert(EntityClass::Consignees, &[]).await.unwrap();
        assert_eq!(written, 0);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/flower_types"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let records = vec![MirrorRecord {
            key: "freedom".into(),
            payload: json!({"name_key": "freedom"}),
        }];
        let err = mirror(&server)
            .upsert(EntityClass::FlowerTypes, &records)
            .await
            .unwrap_err();
        match err {
            MirrorError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
