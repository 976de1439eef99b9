use crate::decoder::{decode_body, ContentEncoding};
use crate::params::Param;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING},
    Certificate, Client, Method, Request, StatusCode,
};
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tracing::info;

pub const DEFAULT_METHOD: &str = "GET";
pub const METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

pub trait HttpConnectionProfile {
    fn user(&self) -> Option<&String>;
    fn password(&self) -> Option<&String>;
    fn insecure(&self) -> bool;
    fn ca_cert(&self) -> Option<&String>;
}

pub trait HttpRequestArgs {
    fn method(&self) -> &str;
    fn url(&self) -> &str;
    fn headers(&self) -> Vec<&Param>;
    fn body(&self) -> Option<&String>;
    fn token(&self) -> Option<&String>;
}

#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    elapsed: Duration,
    raw: Bytes,
    body: String,
}

impl HttpResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

pub struct HttpClient {
    client: Client,
    user: Option<String>,
    password: Option<String>,
}

impl Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("client", &"Client")
            .field("user", &self.user)
            .finish()
    }
}

impl HttpClient {
    pub fn new(profile: &impl HttpConnectionProfile) -> Result<Self> {
        Ok(HttpClient {
            client: Self::build_client(profile)?,
            user: profile.user().cloned(),
            password: profile.password().cloned(),
        })
    }

    pub async fn request(&self, args: &impl HttpRequestArgs) -> Result<HttpResponse> {
        let req = self.build_request(args)?;
        info!("> {} {}", req.method(), req.url());

        let start = Instant::now();
        let res = self
            .client
            .execute(req)
            .await
            .context("Failed to send request")?;
        let status = res.status();
        let headers = res.headers().clone();
        let raw = res.bytes().await.context("Failed to read response body")?;
        let elapsed = start.elapsed();
        info!("< {} ({} bytes, {}ms)", status, raw.len(), elapsed.as_millis());

        let encoding = ContentEncoding::from_header(
            headers.get(CONTENT_ENCODING).and_then(|v| v.to_str().ok()),
        );
        let body = decode_body(&raw, encoding)?;

        Ok(HttpResponse {
            status,
            headers,
            elapsed,
            raw,
            body,
        })
    }

    fn build_request(&self, args: &impl HttpRequestArgs) -> Result<Request> {
        let method = Method::from_bytes(args.method().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", args.method()))?;
        let url = reqwest::Url::parse(args.url())
            .with_context(|| format!("Invalid URL: {}", args.url()))?;

        let mut req_builder = self.client.request(method, url);

        for header in args.headers() {
            let name = HeaderName::from_bytes(header.key.as_bytes())
                .with_context(|| format!("Invalid header name: {}", header.key))?;
            let value = HeaderValue::from_str(&header.value)
                .with_context(|| format!("Invalid value for header {}", header.key))?;
            req_builder = req_builder.header(name, value);
        }

        if let Some(token) = args.token() {
            req_builder = req_builder.bearer_auth(token);
        } else if let Some(user) = &self.user {
            req_builder = req_builder.basic_auth(user, self.password.clone());
        }

        if let Some(body) = args.body() {
            req_builder = req_builder.body(body.to_string());
        }

        req_builder.build().context("Failed to build request")
    }

    fn build_client(profile: &impl HttpConnectionProfile) -> Result<Client> {
        let insecure = profile.insecure();
        let mut cli_builder = Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(insecure);

        if let Some(ca_cert) = profile.ca_cert() {
            let path = shellexpand::tilde(ca_cert).to_string();
            let pem = std::fs::read(&path)
                .with_context(|| format!("Failed to read CA certificate {path}"))?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|e| anyhow!("Invalid CA certificate {}: {}", path, e))?;
            cli_builder = cli_builder.add_root_certificate(cert);
        }

        cli_builder.build().context("Failed to build HTTP client")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct TestProfile {
        user: Option<String>,
        password: Option<String>,
    }

    impl HttpConnectionProfile for TestProfile {
        fn user(&self) -> Option<&String> {
            self.user.as_ref()
        }

        fn password(&self) -> Option<&String> {
            self.password.as_ref()
        }

        fn insecure(&self) -> bool {
            false
        }

        fn ca_cert(&self) -> Option<&String> {
            None
        }
    }

    struct TestRequest {
        method: String,
        url: String,
        headers: Vec<Param>,
        body: Option<String>,
        token: Option<String>,
    }

    impl HttpRequestArgs for TestRequest {
        fn method(&self) -> &str {
            &self.method
        }

        fn url(&self) -> &str {
            &self.url
        }

        fn headers(&self) -> Vec<&Param> {
            self.headers.iter().collect()
        }

        fn body(&self) -> Option<&String> {
            self.body.as_ref()
        }

        fn token(&self) -> Option<&String> {
            self.token.as_ref()
        }
    }

    fn request(method: &str, url: &str) -> TestRequest {
        TestRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
            token: None,
        }
    }

    fn client(user: Option<&str>) -> HttpClient {
        HttpClient::new(&TestProfile {
            user: user.map(String::from),
            password: Some("secret".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn build_request_should_carry_method_url_headers_and_body() {
        let mut args = request("POST", "https://x.test/p?a=1");
        args.headers.push(Param::new("Content-Type", "application/json"));
        args.body = Some("{}".to_string());

        let req = client(None).build_request(&args).unwrap();

        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.url().as_str(), "https://x.test/p?a=1");
        assert_eq!(req.headers()["content-type"], "application/json");
        assert!(req.body().is_some());
    }

    #[test]
    fn build_request_should_prefer_token_over_basic_auth() {
        let mut args = request("GET", "https://x.test/");
        args.token = Some("abc".to_string());

        let req = client(Some("ann")).build_request(&args).unwrap();
        assert_eq!(req.headers()["authorization"], "Bearer abc");

        let req = client(Some("ann"))
            .build_request(&request("GET", "https://x.test/"))
            .unwrap();
        let auth = req.headers()["authorization"].to_str().unwrap();
        assert!(auth.starts_with("Basic "));
    }

    #[test]
    fn build_request_should_reject_bad_input() {
        let c = client(None);
        assert!(c.build_request(&request("GE T", "https://x.test/")).is_err());
        assert!(c.build_request(&request("GET", "/relative")).is_err());

        let mut args = request("GET", "https://x.test/");
        args.headers.push(Param::new("Bad Header", "x"));
        assert!(c.build_request(&args).is_err());
    }
}
