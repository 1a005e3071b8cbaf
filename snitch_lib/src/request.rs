//! Request descriptors and query-string encoding.

use crate::error::Error;
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Which of the two senders a request goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Liveness ping against the check-in host.
    CheckIn,
    /// Authenticated call to the management API.
    Api,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::CheckIn => "check-in",
            RequestKind::Api => "api",
        }
    }
}

impl FromStr for RequestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check-in" => Ok(RequestKind::CheckIn),
            "api" => Ok(RequestKind::Api),
            _ => Err(Error::InvalidRequest(
                "Received an unknown request type. Valid request types are 'check-in' or 'api'"
                    .to_string(),
            )),
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized request: method, path relative to the sender's base URL,
/// optional query parameters and optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub path: String,
    pub query: Option<BTreeMap<String, String>>,
    pub body: Option<Value>,
}

impl RequestOptions {
    /// Build a descriptor.
    ///
    /// The query is kept only when non-empty. The body is kept only for
    /// PUT, POST, PATCH and DELETE, and only when it is a non-empty object or
    /// array.
    pub fn new(
        method: Method,
        path: impl Into<String>,
        query: Option<BTreeMap<String, String>>,
        body: Option<&Value>,
    ) -> Self {
        let query = query.filter(|q| !q.is_empty());
        let body = if carries_body(&method) {
            body.filter(|b| is_non_empty_container(b)).cloned()
        } else {
            None
        };
        Self {
            method,
            path: path.into(),
            query,
            body,
        }
    }

    /// A descriptor with nothing in it cannot be dispatched.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_none() && self.body.is_none()
    }

    /// Path plus encoded query string.
    pub fn path_and_query(&self) -> String {
        let mut url = self.path.clone();
        if let Some(ref query) = self.query {
            let params: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", encode_query_value(k), encode_query_value(v)))
                .collect();
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}

fn carries_body(method: &Method) -> bool {
    matches!(
        method.as_str().to_ascii_uppercase().as_str(),
        "PUT" | "POST" | "PATCH" | "DELETE"
    )
}

fn is_non_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => false,
    }
}

/// Percent-encode a query key or value.
///
/// Spaces become `+`; `:`, `$`, `,`, `[` and `]` stay literal so that
/// comma-joined lists such as `tags=a,b` read naturally on the wire.
pub fn encode_query_value(s: &str) -> String {
    urlencoding::encode(s)
        .replace("%3A", ":")
        .replace("%24", "$")
        .replace("%2C", ",")
        .replace("%20", "+")
        .replace("%5B", "[")
        .replace("%5D", "]")
}

/// Percent-encode a single path segment (token, tag name).
pub fn encode_segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_query_or_body() {
        let opts = RequestOptions::new(Method::GET, "/v1/snitches", None, None);
        assert_eq!(opts.method, Method::GET);
        assert_eq!(opts.path, "/v1/snitches");
        assert!(opts.query.is_none());
        assert!(opts.body.is_none());
        assert_eq!(opts.path_and_query(), "/v1/snitches");
    }

    #[test]
    fn query_without_body() {
        let query = BTreeMap::from([("tags".to_string(), "prod,app".to_string())]);
        let opts = RequestOptions::new(Method::GET, "/v1/snitches", Some(query.clone()), None);
        assert_eq!(opts.query, Some(query));
        assert!(opts.body.is_none());
        assert_eq!(opts.path_and_query(), "/v1/snitches?tags=prod,app");
    }

    #[test]
    fn empty_query_is_dropped() {
        let opts = RequestOptions::new(Method::GET, "/abc", Some(BTreeMap::new()), None);
        assert!(opts.query.is_none());
    }

    #[test]
    fn body_without_query() {
        let body = json!(["prod", "app", "www"]);
        let opts = RequestOptions::new(
            Method::POST,
            "/v1/snitches/some-token-here/tags",
            None,
            Some(&body),
        );
        assert_eq!(opts.body, Some(body));
        assert!(opts.query.is_none());
    }

    #[test]
    fn body_ignored_for_get() {
        let body = json!({"name": "x"});
        let opts = RequestOptions::new(Method::GET, "/v1/snitches", None, Some(&body));
        assert!(opts.body.is_none());
    }

    #[test]
    fn body_method_match_is_case_insensitive() {
        let method = Method::from_bytes(b"patch").unwrap();
        let body = json!({"tags": ["x"]});
        let opts = RequestOptions::new(method, "/v1/snitches/t", None, Some(&body));
        assert_eq!(opts.body, Some(body));
    }

    #[test]
    fn empty_or_scalar_body_is_dropped() {
        for body in [json!({}), json!([]), json!("text"), json!(1), Value::Null] {
            let opts = RequestOptions::new(Method::POST, "/v1/snitches", None, Some(&body));
            assert!(opts.body.is_none(), "body {body} should be dropped");
        }
    }

    #[test]
    fn query_encoding() {
        assert_eq!(encode_query_value("hello world"), "hello+world");
        assert_eq!(encode_query_value("a,b"), "a,b");
        assert_eq!(
            encode_query_value(r#"{"a":1}"#),
            "%7B%22a%22:1%7D"
        );
        assert_eq!(encode_query_value("x&y=z"), "x%26y%3Dz");
    }

    #[test]
    fn request_kind_parse() {
        assert_eq!("check-in".parse::<RequestKind>().unwrap(), RequestKind::CheckIn);
        assert_eq!("api".parse::<RequestKind>().unwrap(), RequestKind::Api);
        let err = "something".parse::<RequestKind>().unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn empty_descriptor() {
        let opts = RequestOptions::new(Method::GET, "", None, None);
        assert!(opts.is_empty());
        assert!(!RequestOptions::new(Method::GET, "/x", None, None).is_empty());
    }
}
