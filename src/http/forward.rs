//! Forwarding to the single backend.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the target base URL
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to `X-Forwarded-For`
//! - Map transport failures to `502 Bad Gateway`
//! - Reach `http` and `https` backends (rustls, webpki roots)
//!
//! # Design Decisions
//! - Method, remaining headers (including Host) and body are passed unchanged
//! - Bodies are streamed, never buffered here
//! - No retries, no timeouts; those belong to the surrounding server

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        uri::{PathAndQuery, Scheme, Uri},
        Request, Response, StatusCode, Version,
    },
    response::IntoResponse,
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

/// Errors raised while preparing the forwarder.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target URL `{url}`: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported target scheme `{0}`, use http or https")]
    Scheme(String),

    #[error("target URL `{0}` has no host")]
    MissingHost(String),

    #[error("failed to set up TLS for the target: {0}")]
    Tls(#[from] rustls::Error),
}

/// Headers that describe one connection and must not be forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Reverse proxy to one backend base URL.
#[derive(Clone)]
pub struct Forwarder {
    scheme: Scheme,
    authority: String,
    base_path: String,
    base_query: Option<String>,
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl Forwarder {
    /// Parse and check the target URL.
    pub fn new(target: &str) -> Result<Self, TargetError> {
        let url = Url::parse(target).map_err(|source| TargetError::Parse {
            url: target.to_string(),
            source,
        })?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(TargetError::Scheme(other.to_string())),
        };
        let host = url
            .host_str()
            .ok_or_else(|| TargetError::MissingHost(target.to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            scheme,
            authority,
            base_path: url.path().to_string(),
            base_query: url.query().map(str::to_string),
            client,
        })
    }

    /// `host[:port]` requests are sent to.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Send the request to the backend and return its response with the
    /// body still streaming.
    pub async fn forward(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response<Body> {
        let (mut parts, body) = request.into_parts();

        let uri = match self.target_uri(&parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(uri = %parts.uri, error = %e, "Failed to build upstream URI");
                return (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response();
            }
        };
        parts.uri = uri;
        // The pooled client speaks HTTP/1.1 to the backend whatever the client used.
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr);
        }

        let request = Request::from_parts(parts, body);
        match self.client.request(request).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(upstream = %self.authority, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
        }
    }

    /// Join the target path and query with the request's.
    pub fn target_uri(&self, incoming: &Uri) -> Result<Uri, axum::http::Error> {
        let path = join_paths(&self.base_path, incoming.path());
        let path_and_query = match (self.base_query.as_deref(), incoming.query()) {
            (None | Some(""), None) => path,
            (None | Some(""), Some(query)) => format!("{}?{}", path, query),
            (Some(base), None | Some("")) => format!("{}?{}", path, base),
            (Some(base), Some(query)) => format!("{}?{}&{}", path, base, query),
        };

        Ok(Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.as_str())
            .path_and_query(PathAndQuery::try_from(path_and_query)?)
            .build()?)
    }
}

/// Join two paths with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let value = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert("x-forwarded-for", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_target_validation() {
        assert!(Forwarder::new("http://localhost:8080").is_ok());
        assert!(matches!(Forwarder::new("not a url"), Err(TargetError::Parse { .. })));
        assert!(matches!(Forwarder::new("ftp://backend"), Err(TargetError::Scheme(_))));
    }

    #[tokio::test]
    async fn test_https_target() {
        let forwarder = Forwarder::new("https://backend.example:8443/api").unwrap();
        assert_eq!(forwarder.authority(), "backend.example:8443");
        let uri = forwarder.target_uri(&"/widgets".parse().unwrap()).unwrap();
        assert_eq!(uri.to_string(), "https://backend.example:8443/api/widgets");
    }

    #[tokio::test]
    async fn test_target_uri_joins_path_and_query() {
        let forwarder = Forwarder::new("http://backend:9000/base?key=1").unwrap();
        let uri = forwarder
            .target_uri(&"/widgets/7?verbose=true".parse().unwrap())
            .unwrap();
        assert_eq!(uri.to_string(), "http://backend:9000/base/widgets/7?key=1&verbose=true");

        let plain = Forwarder::new("http://backend").unwrap();
        assert_eq!(plain.authority(), "backend");
        let uri = plain.target_uri(&"/widgets".parse().unwrap()).unwrap();
        assert_eq!(uri.to_string(), "http://backend/widgets");
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/a"), "/a");
        assert_eq!(join_paths("/base/", "/a"), "/base/a");
        assert_eq!(join_paths("/base", "a"), "/base/a");
        assert_eq!(join_paths("/base", "/a"), "/base/a");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive, x-session"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session", HeaderValue::from_static("abc"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("content-type"));
    }

    #[test]
    fn test_forwarded_for_appends() {
        let mut headers = HeaderMap::new();
        let addr: SocketAddr = "10.0.0.2:5555".parse().unwrap();
        append_forwarded_for(&mut headers, addr);
        assert_eq!(headers["x-forwarded-for"], "10.0.0.2");

        append_forwarded_for(&mut headers, "10.0.0.3:1".parse().unwrap());
        assert_eq!(headers["x-forwarded-for"], "10.0.0.2, 10.0.0.3");
    }
}
