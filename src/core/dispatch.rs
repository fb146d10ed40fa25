//! Purpose: Send requests, normalize success shapes, and read through the entry cache.
//! Exports: `Dispatcher`, `RequestDescriptor`, `RequestBody`, `Outcome`, `NormalizedResult`.
//! Role: Single-shot request path shared by every façade; `send` also backs pagination.
//! Invariants: The credential header is always set from config and never overridable.
//! Invariants: Cache is consulted only for single-entry datastore URLs with a full key.
//! Invariants: Keys come from the URL query; a `Json` envelope is a write-only fallback.
//! Invariants: Cached values are served only while fresh; writes upsert after a 200.
//! Invariants: Failures are never retried or swallowed; each surfaces as one `Error`.
use super::cache::{CacheKey, EntryCache};
use super::classify::{classify_response, classify_transport};
use super::config::ClientConfig;
use super::error::{ApiResult, Error, ErrorKind};
use super::query::query_value;
use super::transport::{HttpRequest, HttpResponse, Method, Transport, UreqTransport};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

const ENTRY_PATH_MARKER: &str = "datastore/entries/entry";
const ENTRY_VALUE_FIELD: &str = "entryValue";

#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Request envelope, serialized when the outgoing content type is JSON. Its
    /// `entryKey`/`scope`/`dataStoreName`/`entryValue` fields are read for caching.
    Json(Value),
    /// A caller's value, already JSON-encoded and sent as-is. Cached whole.
    Encoded(String),
    /// Opaque bytes for binary or multipart uploads.
    Bytes(Vec<u8>),
}

/// Immutable description of one outbound call, built by a façade.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub body: RequestBody,
    pub header_overrides: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: RequestBody::Empty,
            header_overrides: Vec::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_overrides.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedResult {
    pub data: Value,
    pub from_cache: bool,
}

/// Result of a call that did not fail.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Success(NormalizedResult),
    /// A response arrived without error but with a status other than 200.
    /// Carries no data; callers must decide what it means for them.
    Indeterminate { status: u16 },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn from_cache(&self) -> bool {
        matches!(self, Outcome::Success(result) if result.from_cache)
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Outcome::Success(result) => Some(&result.data),
            Outcome::Indeterminate { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<Value> {
        match self {
            Outcome::Success(result) => Some(result.data),
            Outcome::Indeterminate { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cache: Arc<EntryCache>,
}

impl Dispatcher {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(UreqTransport::new()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let cache = match config.cache_capacity {
            Some(capacity) => EntryCache::with_capacity_limit(capacity),
            None => EntryCache::new(),
        };
        Self {
            config,
            transport,
            cache: Arc::new(cache),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    pub fn cache(&self) -> &EntryCache {
        &self.cache
    }

    pub fn execute(&self, request: &RequestDescriptor) -> ApiResult<Outcome> {
        let key = self.cache_key(request);

        if request.method.is_read() {
            if let Some(key) = &key {
                if let Some(value) = self.cache.get_fresh(key) {
                    debug!(key = key.as_str(), "serving entry from cache");
                    return Ok(Outcome::Success(NormalizedResult {
                        data: value,
                        from_cache: true,
                    }));
                }
                debug!(key = key.as_str(), "cache miss");
            }
        }

        let response = self.send(request)?;
        if response.status != 200 {
            debug!(status = response.status, url = %request.url, "indeterminate response");
            return Ok(Outcome::Indeterminate {
                status: response.status,
            });
        }

        let data = decode_success_body(&response.body)?;
        if let Some(key) = key {
            self.update_cache(request, key, &data);
        }
        Ok(Outcome::Success(NormalizedResult {
            data,
            from_cache: false,
        }))
    }

    /// Sends without consulting the cache. Error statuses are classified; every other
    /// response is returned untouched.
    pub fn send(&self, request: &RequestDescriptor) -> ApiResult<HttpResponse> {
        let outbound = self.build_request(request)?;
        debug!(method = %outbound.method, url = %outbound.url, "dispatching request");
        let response = self
            .transport
            .send(&outbound)
            .map_err(classify_transport)?;
        if response.is_error() {
            let err = classify_response(response.status, &response.status_text, &response.body);
            debug!(status = response.status, kind = err.kind().as_str(), "request failed");
            return Err(err);
        }
        Ok(response)
    }

    fn build_request(&self, request: &RequestDescriptor) -> ApiResult<HttpRequest> {
        let headers = assemble_headers(&self.config.api_key, &request.header_overrides);
        let json_content = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE_HEADER))
            .is_some_and(|(_, value)| value.starts_with(JSON_CONTENT_TYPE));
        let body = encode_body(&request.body, json_content)?;
        Ok(HttpRequest {
            method: request.method,
            url: request.url.clone(),
            headers,
            body,
        })
    }

    fn cache_key(&self, request: &RequestDescriptor) -> Option<CacheKey> {
        if !self.config.use_cache || !request.url.path().contains(ENTRY_PATH_MARKER) {
            return None;
        }
        if let Some(key) = url_cache_key(&request.url) {
            return Some(key);
        }
        if request.method.is_read() {
            return None;
        }
        envelope_cache_key(&request.body)
    }

    fn update_cache(&self, request: &RequestDescriptor, key: CacheKey, data: &Value) {
        let value = match request.method {
            Method::Get => data.clone(),
            Method::Post | Method::Put | Method::Patch => {
                if query_value(&request.url, "incrementBy").is_some() {
                    data.clone()
                } else {
                    match written_value(&request.body) {
                        Some(value) => value,
                        None => return,
                    }
                }
            }
            Method::Head | Method::Delete => return,
        };
        debug!(key = key.as_str(), "caching entry");
        self.cache.put(key, value, self.config.cache_interval);
    }
}

fn assemble_headers(api_key: &str, overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut headers = vec![
        (API_KEY_HEADER.to_string(), api_key.to_string()),
        (CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string()),
    ];
    for (name, value) in overrides {
        if name.eq_ignore_ascii_case(API_KEY_HEADER) {
            continue;
        }
        match headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value.clone(),
            None => headers.push((name.clone(), value.clone())),
        }
    }
    headers
}

fn encode_body(body: &RequestBody, json_content: bool) -> ApiResult<Option<Vec<u8>>> {
    let bytes = match body {
        RequestBody::Empty => return Ok(None),
        RequestBody::Json(Value::String(text)) if !json_content => text.clone().into_bytes(),
        RequestBody::Json(value) => serde_json::to_vec(value).map_err(|err| {
            Error::new(ErrorKind::Validation)
                .with_message("failed to encode request json")
                .with_source(err)
        })?,
        RequestBody::Encoded(text) => text.clone().into_bytes(),
        RequestBody::Bytes(bytes) => bytes.clone(),
    };
    Ok(Some(bytes))
}

fn url_cache_key(url: &Url) -> Option<CacheKey> {
    let entry_key = query_value(url, "entryKey")?;
    let scope = query_value(url, "scope")?;
    let data_store = query_value(url, "dataStoreName")?;
    Some(CacheKey::new(&entry_key, &scope, &data_store))
}

fn envelope_cache_key(body: &RequestBody) -> Option<CacheKey> {
    let RequestBody::Json(envelope) = body else {
        return None;
    };
    let field = |name: &str| envelope.get(name).and_then(Value::as_str);
    Some(CacheKey::new(
        field("entryKey")?,
        field("scope")?,
        field("dataStoreName")?,
    ))
}

fn written_value(body: &RequestBody) -> Option<Value> {
    match body {
        RequestBody::Json(envelope) => match envelope.get(ENTRY_VALUE_FIELD) {
            Some(inner) => Some(inner.clone()),
            None => Some(envelope.clone()),
        },
        RequestBody::Encoded(text) => {
            Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone())))
        }
        RequestBody::Empty | RequestBody::Bytes(_) => None,
    }
}

fn decode_success_body(body: &[u8]) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        Error::new(ErrorKind::Network)
            .with_message("invalid response json")
            .with_source(err)
    })?;
    match value.get(ENTRY_VALUE_FIELD) {
        Some(Value::String(wrapped)) => serde_json::from_str(wrapped).map_err(|err| {
            Error::new(ErrorKind::Network)
                .with_message("invalid entryValue json")
                .with_source(err)
        }),
        Some(inner) => Ok(inner.clone()),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        API_KEY_HEADER, RequestBody, assemble_headers, decode_success_body, encode_body,
        envelope_cache_key, url_cache_key, written_value,
    };
    use super::Dispatcher;
    use crate::core::cache::CacheKey;
    use crate::core::config::ClientConfig;
    use crate::core::error::ErrorKind;
    use crate::core::transport::UreqTransport;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    #[test]
    fn credential_header_cannot_be_overridden() {
        let overrides = vec![
            ("X-Api-Key".to_string(), "stolen".to_string()),
            ("content-type".to_string(), "application/xml".to_string()),
            ("Content-MD5".to_string(), "abc".to_string()),
        ];
        let headers = assemble_headers("secret", &overrides);
        assert_eq!(
            headers,
            vec![
                (API_KEY_HEADER.to_string(), "secret".to_string()),
                ("Content-Type".to_string(), "application/xml".to_string()),
                ("Content-MD5".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn json_body_is_serialized_only_for_json_content() {
        let body = RequestBody::Json(json!({"message": "hi"}));
        let encoded = encode_body(&body, true).expect("encode").expect("bytes");
        assert_eq!(encoded, br#"{"message":"hi"}"#.to_vec());

        let raw = RequestBody::Json(Value::String("<xml/>".to_string()));
        let passed = encode_body(&raw, false).expect("encode").expect("bytes");
        assert_eq!(passed, b"<xml/>".to_vec());

        let pre_encoded = RequestBody::Encoded("\"already\"".to_string());
        let passed = encode_body(&pre_encoded, true).expect("encode").expect("bytes");
        assert_eq!(passed, b"\"already\"".to_vec());

        assert!(encode_body(&RequestBody::Empty, true).expect("encode").is_none());
    }

    #[test]
    fn entry_value_is_unwrapped_and_decoded() {
        let value = decode_success_body(br#"{"entryValue":"{\"coins\":5}"}"#).expect("decode");
        assert_eq!(value, json!({"coins": 5}));

        let plain = decode_success_body(br#"{"data":[1,2]}"#).expect("decode");
        assert_eq!(plain, json!({"data": [1, 2]}));

        assert_eq!(decode_success_body(b"").expect("empty"), Value::Null);
    }

    #[test]
    fn malformed_success_body_is_network_error() {
        let err = decode_success_body(b"not json").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn envelope_fields_supply_key_and_value() {
        let body = RequestBody::Json(json!({
            "entryKey": "coins",
            "scope": "global",
            "dataStoreName": "PlayerData",
            "entryValue": 42,
        }));
        let key = envelope_cache_key(&body).expect("key");
        assert_eq!(key.as_str(), "coins_global_PlayerData");
        assert_eq!(written_value(&body), Some(json!(42)));

        let bare = RequestBody::Json(json!({"level": 3}));
        assert!(envelope_cache_key(&bare).is_none());
        assert_eq!(written_value(&bare), Some(json!({"level": 3})));
    }

    #[test]
    fn encoded_values_are_opaque() {
        let stored = json!({
            "entryKey": "gems",
            "scope": "global",
            "dataStoreName": "PlayerData",
            "entryValue": 5,
        });
        let body = RequestBody::Encoded(stored.to_string());
        assert!(envelope_cache_key(&body).is_none());
        assert_eq!(written_value(&body), Some(stored));
    }

    #[test]
    fn credential_changes_keep_the_built_cache_policy() {
        let config = ClientConfig::new(1, "old").with_cache_capacity(1);
        let mut dispatcher = Dispatcher::with_transport(config, Arc::new(UreqTransport::new()));
        dispatcher.config_mut().api_key = "new".to_string();

        let cache = dispatcher.cache();
        cache.put(CacheKey::new("a", "s", "d"), json!(1), Duration::from_secs(60));
        cache.put(CacheKey::new("b", "s", "d"), json!(2), Duration::from_secs(60));
        assert_eq!(dispatcher.config().api_key, "new");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn url_key_needs_all_three_parts() {
        let full = Url::parse(
            "http://api.test/datastore/entries/entry?entryKey=a&scope=s&dataStoreName=d",
        )
        .expect("url");
        assert_eq!(url_cache_key(&full).expect("key").as_str(), "a_s_d");

        let partial =
            Url::parse("http://api.test/datastore/entries/entry?entryKey=a&scope=s").expect("url");
        assert!(url_cache_key(&partial).is_none());
    }
}
