//! Mercari `entities:search` integration.

use std::collections::HashMap;

use nanoid::nanoid;
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::adapter::{Marketplace, RawResponse};
use crate::data_models::{Item, SearchParams};
use crate::error::{Error, Result};
use crate::signing::DpopSigner;

const DEFAULT_BASE_URL: &str = "https://api.mercari.jp";
const SEARCH_PATH: &str = "/v2/entities:search";
const ITEM_URL_PREFIX: &str = "https://jp.mercari.com/item/";

const SESSION_ID_LEN: usize = 32;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Human size labels to Mercari's internal size ids. Labels outside this
/// map are a hard error: an unmapped size would otherwise degrade to "no
/// size filter" and silently change what a query means.
static SIZE_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("S", "2"), ("M", "3"), ("L", "4"), ("XL", "5")]));

/// Request body for the search endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload {
    pub user_id: String,
    pub page_size: Option<u32>,
    pub page_token: String,
    pub search_session_id: String,
    pub index_routing: String,
    pub thumbnail_types: Vec<String>,
    pub search_condition: SearchCondition,
    pub default_datasets: Vec<String>,
    pub service_from: String,
    pub with_item_brand: bool,
    pub with_item_size: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCondition {
    pub keyword: String,
    pub exclude_keyword: String,
    pub sort: String,
    pub order: String,
    pub status: Vec<String>,
    pub size_id: Vec<String>,
    pub category_id: Vec<String>,
    pub brand_id: Vec<String>,
    pub seller_id: Vec<String>,
    pub price_min: u32,
    pub price_max: u32,
    pub item_condition_id: Vec<String>,
    pub shipping_payer_id: Vec<String>,
    pub shipping_from_area: Vec<String>,
    pub shipping_method: Vec<String>,
    pub color_id: Vec<String>,
    pub has_coupon: bool,
    pub attributes: Vec<String>,
    pub item_types: Vec<String>,
    pub sku_ids: Vec<String>,
}

/// Adapter for Mercari's search endpoint.
///
/// Holds a shared async HTTP client; the blocking mode builds its own
/// client per call. No state is carried between calls.
#[derive(Debug, Clone)]
pub struct Mercari<S> {
    http: reqwest::Client,
    base_url: String,
    signer: S,
}

impl<S: DpopSigner> Mercari<S> {
    pub fn new(signer: S) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, signer)
    }

    /// Point the adapter at a different host, e.g. a local test endpoint.
    pub fn with_base_url(base_url: impl Into<String>, signer: S) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            signer,
        }
    }

    fn search_url(&self) -> String {
        format!("{}{}", self.base_url, SEARCH_PATH)
    }

    fn request_headers(&self, url: &str) -> Result<HeaderMap> {
        let proof = self.signer.proof_token(url, "POST")?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "dpop",
            HeaderValue::from_str(&proof).map_err(|_| {
                Error::InvalidArgument("proof token is not a valid header value".into())
            })?,
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert("x-platform", HeaderValue::from_static("web"));
        Ok(headers)
    }

    fn check_status(status: StatusCode) -> Result<()> {
        if status != StatusCode::OK {
            return Err(Error::Transport {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

fn new_session_id() -> String {
    let alphabet: Vec<char> = ('a'..='z').chain('0'..='9').collect();
    nanoid!(SESSION_ID_LEN, &alphabet)
}

fn map_sizes(labels: &[String]) -> Result<Vec<String>> {
    labels
        .iter()
        .map(|label| {
            SIZE_MAP
                .get(label.as_str())
                .map(|id| (*id).to_string())
                .ok_or_else(|| Error::InvalidArgument(format!("unknown size label `{label}`")))
        })
        .collect()
}

// Input pages are 1-based, wire tokens are 0-based.
fn page_token(page: Option<u32>) -> String {
    match page {
        Some(page) => format!("v1:{}", page - 1),
        None => String::new(),
    }
}

fn malformed(field: &str) -> Error {
    Error::MalformedResponse {
        field: field.to_string(),
    }
}

fn parse_entry(entry: &Value) -> Result<Item> {
    let id = entry
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| malformed("id"))?;
    let title = entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| malformed("name"))?;
    let price = entry
        .get("price")
        .and_then(Value::as_f64)
        .filter(|price| *price >= 0.0)
        .ok_or_else(|| malformed("price"))?;
    let images = entry
        .get("thumbnails")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("thumbnails"))?
        .iter()
        .map(|thumb| {
            thumb
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| malformed("thumbnails"))
        })
        .collect::<Result<Vec<String>>>()?;
    let size = match entry.get("itemSize") {
        Some(Value::Object(item_size)) => item_size.get("name").and_then(Value::as_str).map(str::to_string),
        Some(Value::Null) | None => None,
        Some(_) => return Err(malformed("itemSize")),
    };

    Ok(Item {
        id: id.to_string(),
        title: title.to_string(),
        price,
        size,
        url: format!("{ITEM_URL_PREFIX}{id}"),
        images,
    })
}

impl<S: DpopSigner + Sync> Marketplace for Mercari<S> {
    type Query = SearchPayload;

    fn extract_params(&self, params: &SearchParams) -> Result<SearchPayload> {
        let size_id = map_sizes(params.sizes())?;
        Ok(SearchPayload {
            user_id: String::new(),
            page_size: params.item_count(),
            page_token: page_token(params.page()),
            search_session_id: new_session_id(),
            index_routing: "INDEX_ROUTING_UNSPECIFIED".to_string(),
            thumbnail_types: Vec::new(),
            search_condition: SearchCondition {
                keyword: params.keyword().to_string(),
                exclude_keyword: String::new(),
                sort: "SORT_CREATED_TIME".to_string(),
                order: "ORDER_DESC".to_string(),
                status: vec!["STATUS_ON_SALE".to_string()],
                size_id,
                category_id: Vec::new(),
                brand_id: Vec::new(),
                seller_id: Vec::new(),
                price_min: 0,
                price_max: 0,
                item_condition_id: Vec::new(),
                shipping_payer_id: Vec::new(),
                shipping_from_area: Vec::new(),
                shipping_method: Vec::new(),
                color_id: Vec::new(),
                has_coupon: false,
                attributes: Vec::new(),
                item_types: Vec::new(),
                sku_ids: Vec::new(),
            },
            default_datasets: vec![
                "DATASET_TYPE_MERCARI".to_string(),
                "DATASET_TYPE_BEYOND".to_string(),
            ],
            service_from: "suruga".to_string(),
            with_item_brand: true,
            with_item_size: true,
        })
    }

    async fn fetch(&self, params: &SearchParams) -> Result<RawResponse> {
        let url = self.search_url();
        let payload = self.extract_params(params)?;
        let headers = self.request_headers(&url)?;
        debug!(url = %url, keyword = params.keyword(), "posting search request");

        let response = self
            .http
            .post(&url)
            .headers(headers)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        Self::check_status(status)?;
        let body = response.text().await?;
        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }

    fn fetch_blocking(&self, params: &SearchParams) -> Result<RawResponse> {
        let url = self.search_url();
        let payload = self.extract_params(params)?;
        let headers = self.request_headers(&url)?;
        debug!(url = %url, keyword = params.keyword(), "posting search request (blocking)");

        let client = reqwest::blocking::Client::new();
        let response = client.post(&url).headers(headers).json(&payload).send()?;
        let status = response.status();
        Self::check_status(status)?;
        let body = response.text()?;
        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }

    fn parse(&self, response: &RawResponse) -> Result<Vec<Item>> {
        let body: Value = serde_json::from_str(&response.body)?;
        let entries = body
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("items"))?;

        let items = entries.iter().map(parse_entry).collect::<Result<Vec<Item>>>()?;
        info!(count = items.len(), "parsed search response");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoopSigner;

    impl DpopSigner for NoopSigner {
        fn proof_token(&self, _url: &str, _method: &str) -> Result<String> {
            Ok("test-proof".to_string())
        }
    }

    fn adapter() -> Mercari<NoopSigner> {
        Mercari::new(NoopSigner)
    }

    fn params(keyword: &str) -> SearchParams {
        SearchParams::builder(keyword).build().unwrap()
    }

    fn raw(body: Value) -> RawResponse {
        RawResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn session_ids_are_lowercase_alphanumeric_and_32_chars() {
        let id = new_session_id();
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn consecutive_session_ids_differ() {
        assert_ne!(new_session_id(), new_session_id());
    }

    #[test]
    fn every_known_size_label_maps() {
        for (label, expected) in [("S", "2"), ("M", "3"), ("L", "4"), ("XL", "5")] {
            let mapped = map_sizes(&[label.to_string()]).unwrap();
            assert_eq!(mapped, vec![expected.to_string()]);
        }
    }

    #[test]
    fn unknown_size_label_is_rejected() {
        let err = map_sizes(&["XXL".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn page_token_is_zero_based() {
        assert_eq!(page_token(Some(1)), "v1:0");
        assert_eq!(page_token(Some(3)), "v1:2");
        assert_eq!(page_token(None), "");
    }

    #[test]
    fn extract_params_builds_vendor_payload() {
        let params = SearchParams::builder("comme des garcons")
            .sizes(["XL"])
            .page(1)
            .item_count(10)
            .build()
            .unwrap();
        let payload = adapter().extract_params(&params).unwrap();

        assert_eq!(payload.search_condition.keyword, "comme des garcons");
        assert_eq!(payload.search_condition.size_id, vec!["5".to_string()]);
        assert_eq!(payload.page_token, "v1:0");
        assert_eq!(payload.page_size, Some(10));
        assert_eq!(payload.search_session_id.len(), SESSION_ID_LEN);
        assert_eq!(payload.service_from, "suruga");
        assert!(payload.with_item_brand);
        assert!(payload.with_item_size);
    }

    #[test]
    fn no_size_filter_yields_empty_size_array() {
        let params = SearchParams::builder("comme des garcons")
            .item_count(10)
            .build()
            .unwrap();
        let payload = adapter().extract_params(&params).unwrap();

        assert_eq!(payload.page_size, Some(10));
        assert!(payload.search_condition.size_id.is_empty());
        assert_eq!(payload.page_token, "");
    }

    #[test]
    fn payload_serializes_with_vendor_field_names() {
        let payload = adapter().extract_params(&params("denim")).unwrap();
        let value = serde_json::to_value(&payload).unwrap();

        assert!(value.get("searchSessionId").is_some());
        assert!(value.get("pageToken").is_some());
        assert!(value.get("pageSize").is_some());
        assert!(value.get("withItemSize").is_some());
        let condition = value.get("searchCondition").unwrap();
        assert!(condition.get("sizeId").is_some());
        assert!(condition.get("excludeKeyword").is_some());
        assert_eq!(
            condition.get("sort").and_then(Value::as_str),
            Some("SORT_CREATED_TIME")
        );
        assert_eq!(
            condition.get("status").unwrap(),
            &json!(["STATUS_ON_SALE"])
        );
    }

    #[test]
    fn each_extract_gets_a_fresh_session_id() {
        let a = adapter().extract_params(&params("denim")).unwrap();
        let b = adapter().extract_params(&params("denim")).unwrap();
        assert_ne!(a.search_session_id, b.search_session_id);
    }

    #[test]
    fn parse_normalizes_items() {
        let response = raw(json!({
            "items": [
                {
                    "id": "m111",
                    "name": "comme des garcons shirt",
                    "price": 15800,
                    "thumbnails": ["https://static.mercdn.net/m111.jpg"],
                    "itemSize": {"name": "XL"}
                },
                {
                    "id": "m222",
                    "name": "comme des garcons coat",
                    "price": 42000.5,
                    "thumbnails": []
                }
            ]
        }));
        let items = adapter().parse(&response).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "m111");
        assert_eq!(items[0].title, "comme des garcons shirt");
        assert_eq!(items[0].price, 15800.0);
        assert_eq!(items[0].size.as_deref(), Some("XL"));
        assert_eq!(items[0].url, "https://jp.mercari.com/item/m111");
        assert_eq!(items[0].images.len(), 1);
        assert_eq!(items[1].size, None);
        assert!(items[1].images.is_empty());
    }

    #[test]
    fn parse_accepts_zero_items() {
        let items = adapter().parse(&raw(json!({"items": []}))).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn parse_rejects_missing_items_array() {
        let err = adapter().parse(&raw(json!({"data": []}))).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { field } if field == "items"));
    }

    #[test]
    fn one_bad_entry_fails_the_whole_parse() {
        let response = raw(json!({
            "items": [
                {"id": "m111", "name": "good", "price": 100, "thumbnails": []},
                {"id": 12345, "name": "bad id", "price": 100, "thumbnails": []}
            ]
        }));
        let err = adapter().parse(&response).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { field } if field == "id"));
    }

    #[test]
    fn parse_names_the_offending_field() {
        let cases = [
            (json!({"name": "x", "price": 1, "thumbnails": []}), "id"),
            (json!({"id": "m1", "price": 1, "thumbnails": []}), "name"),
            (
                json!({"id": "m1", "name": "x", "price": "1500", "thumbnails": []}),
                "price",
            ),
            (
                json!({"id": "m1", "name": "x", "price": -1, "thumbnails": []}),
                "price",
            ),
            (json!({"id": "m1", "name": "x", "price": 1}), "thumbnails"),
            (
                json!({"id": "m1", "name": "x", "price": 1, "thumbnails": [7]}),
                "thumbnails",
            ),
            (
                json!({"id": "m1", "name": "x", "price": 1, "thumbnails": [], "itemSize": "XL"}),
                "itemSize",
            ),
        ];
        for (entry, field) in cases {
            let err = adapter().parse(&raw(json!({"items": [entry]}))).unwrap_err();
            assert!(
                matches!(&err, Error::MalformedResponse { field: f } if f == field),
                "entry should fail on `{field}`, got {err}"
            );
        }
    }

    #[test]
    fn item_size_without_name_is_none() {
        let response = raw(json!({
            "items": [
                {"id": "m1", "name": "x", "price": 1, "thumbnails": [], "itemSize": {}},
                {"id": "m2", "name": "y", "price": 1, "thumbnails": [], "itemSize": null}
            ]
        }));
        let items = adapter().parse(&response).unwrap();
        assert_eq!(items[0].size, None);
        assert_eq!(items[1].size, None);
    }
}
