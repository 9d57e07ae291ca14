//! A data source backed by a conventional REST endpoint.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::DataSource;
use crate::error::DataSourceError;
use crate::filter::stringify;
use crate::query::DataSourceQuery;
use crate::response::DataSourceResponse;

/// How requests authenticate.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthScheme {
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// Key sent in a custom header.
    ApiKey { header: String, key: String },
    /// `Authorization: Basic ...`.
    Basic { username: String, password: String },
}

impl fmt::Debug for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::None => f.write_str("None"),
            AuthScheme::Bearer(_) => f.write_str("Bearer(***)"),
            AuthScheme::ApiKey { header, .. } => f.debug_struct("ApiKey").field("header", header).finish_non_exhaustive(),
            AuthScheme::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish_non_exhaustive()
            }
        }
    }
}

/// Endpoint configuration for [`HttpDataSource`].
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Collection endpoint, e.g. `https://api.example.com/users`.
    pub base_url: String,
    pub auth: AuthScheme,
    /// Per-request timeout. `None` uses the client default.
    pub timeout: Option<Duration>,
    /// Body key holding the row array.
    pub data_key: String,
    /// Body key holding the total count.
    pub total_key: String,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl HttpSourceConfig {
    /// Creates a config with `data`/`total` body keys and no auth.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthScheme::None,
            timeout: None,
            data_key: "data".to_string(),
            total_key: "total".to_string(),
            headers: Vec::new(),
        }
    }

    /// Sets the auth scheme.
    pub fn auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the body key holding rows.
    pub fn data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = key.into();
        self
    }

    /// Sets the body key holding the total.
    pub fn total_key(mut self, key: impl Into<String>) -> Self {
        self.total_key = key.into();
        self
    }

    /// Adds a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Fetches rows of `T` with `GET base_url?limit=..&offset=..&sort=..`.
///
/// Query mapping:
///
/// | Query part        | Parameter                          |
/// |-------------------|------------------------------------|
/// | pagination        | `limit`, `offset`                  |
/// | sorting           | `sort=name:asc,age:desc`           |
/// | global filter     | `search`                           |
/// | filters           | `filters` (JSON array)             |
/// | advanced filter   | `advancedFilter` (JSON tree)       |
/// | fields            | `fields` (comma list)              |
/// | include           | `include` (comma list)             |
/// | group by          | `groupBy` (comma list)             |
/// | params            | verbatim, non-strings as JSON      |
///
/// The response body is either a bare array or an object carrying the rows
/// under `data_key`, the total under `total_key` and optionally an
/// `aggregations` object. Without a total, a paginated page reports
/// `has_next_page` when it came back full and leaves `page_count` unknown.
pub struct HttpDataSource<T> {
    client: reqwest::Client,
    config: HttpSourceConfig,
    _row: PhantomData<fn() -> T>,
}

impl<T> HttpDataSource<T> {
    /// Creates a source with a fresh client.
    pub fn new(config: HttpSourceConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Creates a source sharing an existing client.
    pub fn with_client(client: reqwest::Client, config: HttpSourceConfig) -> Self {
        Self {
            client,
            config,
            _row: PhantomData,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    /// Builds the request URL for a query.
    pub fn build_url(&self, query: &DataSourceQuery) -> Result<Url, DataSourceError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| DataSourceError::InvalidQuery(format!("Invalid base URL '{}': {}", self.config.base_url, e)))?;

        let mut pairs: Vec<(String, String)> = Vec::new();

        if let Some(page) = query.pagination {
            pairs.push(("limit".to_string(), page.page_size.to_string()));
            pairs.push(("offset".to_string(), page.offset().to_string()));
        }
        if !query.sorting.is_empty() {
            let sort = query
                .sorting
                .iter()
                .map(|s| format!("{}:{}", s.field, s.direction()))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("sort".to_string(), sort));
        }
        if let Some(term) = query.search_term() {
            pairs.push(("search".to_string(), term.to_string()));
        }
        if !query.filters.is_empty() {
            pairs.push(("filters".to_string(), serde_json::to_string(&query.filters)?));
        }
        if let Some(tree) = &query.advanced_filter {
            pairs.push(("advancedFilter".to_string(), serde_json::to_string(tree)?));
        }
        if let Some(fields) = &query.fields {
            pairs.push(("fields".to_string(), fields.join(",")));
        }
        if !query.include.is_empty() {
            pairs.push(("include".to_string(), query.include.join(",")));
        }
        if !query.group_by.is_empty() {
            pairs.push(("groupBy".to_string(), query.group_by.join(",")));
        }
        for (key, value) in &query.params {
            pairs.push((key.clone(), stringify(value)));
        }

        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/json");

        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request = match &self.config.auth {
            AuthScheme::None => request,
            AuthScheme::Bearer(token) => request.bearer_auth(token),
            AuthScheme::ApiKey { header, key } => request.header(header.as_str(), key.as_str()),
            AuthScheme::Basic { username, password } => request.basic_auth(username, Some(password)),
        };

        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    fn map_send_error(&self, error: reqwest::Error) -> DataSourceError {
        match self.config.timeout {
            Some(timeout) if error.is_timeout() => DataSourceError::Timeout(timeout),
            _ => DataSourceError::Network(error),
        }
    }
}

/// Builds a backend error from a non-2xx response body.
///
/// JSON bodies contribute `message`, `code` (or `error`) and the parsed
/// payload as details.
fn error_from_body(status: u16, body: &str) -> DataSourceError {
    let Ok(details) = serde_json::from_str::<Value>(body) else {
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            body.to_string()
        };
        return DataSourceError::http(status, message);
    };

    let message = details
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status));
    let code = details
        .get("code")
        .or_else(|| details.get("error"))
        .filter(|c| !c.is_null())
        .map(stringify);

    let error = DataSourceError::http(status, message);
    let error = match code {
        Some(code) => error.with_code(code),
        None => error,
    };
    error.with_details(details)
}

#[async_trait]
impl<T> DataSource for HttpDataSource<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Row = T;

    async fn fetch(&self, query: &DataSourceQuery) -> Result<DataSourceResponse<T>, DataSourceError> {
        let url = self.build_url(query)?;
        debug!("GET {}", url);

        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| DataSourceError::parse_with_body(format!("Invalid JSON: {}", e), body.clone()))?;

        let (rows, total, aggregations) = match parsed {
            Value::Array(rows) => (rows, None, None),
            Value::Object(mut map) => {
                let rows = match map.remove(&self.config.data_key) {
                    Some(Value::Array(rows)) => rows,
                    _ => {
                        return Err(DataSourceError::parse_with_body(
                            format!("Response has no '{}' array", self.config.data_key),
                            body,
                        ));
                    }
                };
                let total = map
                    .get(&self.config.total_key)
                    .and_then(Value::as_u64)
                    .map(|t| t as usize);
                let aggregations = match map.remove("aggregations") {
                    Some(Value::Object(aggs)) => Some(aggs.into_iter().collect()),
                    _ => None,
                };
                (rows, total, aggregations)
            }
            _ => {
                return Err(DataSourceError::parse_with_body("Response is not a JSON object or array", body));
            }
        };

        let data: Vec<T> = serde_json::from_value(Value::Array(rows))
            .map_err(|e| DataSourceError::parse_with_body(format!("Invalid row: {}", e), body))?;

        let response = match (total, query.pagination) {
            (Some(total), pagination) => DataSourceResponse::paginated(data, total, pagination),
            (None, Some(page)) => DataSourceResponse::open_ended(data, page),
            (None, None) => {
                let total = data.len();
                DataSourceResponse::new(data, total)
            }
        };
        Ok(match aggregations {
            Some(aggs) => response.with_aggregations(aggs),
            None => response,
        })
    }
}

impl<T> fmt::Debug for HttpDataSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDataSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOperator;
    use crate::query::QueryFilter;

    fn source(base: &str) -> HttpDataSource<Value> {
        HttpDataSource::new(HttpSourceConfig::new(base))
    }

    fn params(url: &Url) -> Vec<(String, String)> {
        url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
    }

    #[test]
    fn test_empty_query_has_no_params() {
        let url = source("https://api.example.com/users")
            .build_url(&DataSourceQuery::new())
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/users");
    }

    #[test]
    fn test_query_params() {
        let query = DataSourceQuery::new()
            .page(2, 25)
            .sort_asc("name")
            .sort_desc("age")
            .search("  ada ")
            .filter(QueryFilter::new("age", FilterOperator::Gte, 18))
            .select(&["name", "age"])
            .include("team")
            .group_by("team")
            .param("tenant", "acme")
            .param("archived", false);

        let url = source("https://api.example.com/users").build_url(&query).unwrap();
        assert_eq!(
            params(&url),
            vec![
                ("limit".to_string(), "25".to_string()),
                ("offset".to_string(), "50".to_string()),
                ("sort".to_string(), "name:asc,age:desc".to_string()),
                ("search".to_string(), "ada".to_string()),
                (
                    "filters".to_string(),
                    r#"[{"field":"age","value":18,"operator":"gte"}]"#.to_string()
                ),
                ("fields".to_string(), "name,age".to_string()),
                ("include".to_string(), "team".to_string()),
                ("groupBy".to_string(), "team".to_string()),
                ("archived".to_string(), "false".to_string()),
                ("tenant".to_string(), "acme".to_string()),
            ]
        );
    }

    #[test]
    fn test_existing_base_query_kept() {
        let url = source("https://api.example.com/users?v=2")
            .build_url(&DataSourceQuery::new().page(0, 10))
            .unwrap();
        assert_eq!(params(&url)[0], ("v".to_string(), "2".to_string()));
        assert_eq!(params(&url).len(), 3);
    }

    #[test]
    fn test_invalid_base_url() {
        let err = source("not a url").build_url(&DataSourceQuery::new()).unwrap_err();
        assert!(matches!(err, DataSourceError::InvalidQuery(_)));
    }

    #[test]
    fn test_error_from_json_body() {
        let err = error_from_body(422, r#"{"message":"bad filter","error":"E_FILTER"}"#);
        assert_eq!(err.status_code(), Some(422));
        assert_eq!(err.error_code(), Some("E_FILTER"));
        assert_eq!(err.to_string(), "Backend error: bad filter");
    }

    #[test]
    fn test_error_from_text_body() {
        let err = error_from_body(502, "");
        assert_eq!(err.to_string(), "Backend error: HTTP 502");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let auth = AuthScheme::Basic {
            username: "ada".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", auth).contains("hunter2"));
        assert!(!format!("{:?}", AuthScheme::Bearer("tok".to_string())).contains("tok"));
    }
}
