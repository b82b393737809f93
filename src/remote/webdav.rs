//! WebDAV backend built on reqwest
//!
//! Directory listings use `PROPFIND` with `Depth: 1`; file contents are
//! streamed from a plain `GET`. A single client is shared by every worker
//! (reqwest pools connections internally).

use crate::error::{RemoteError, RemoteResult};
use crate::remote::propfind::{parse_multistatus, to_remote_entries, PROPFIND_BODY};
use crate::remote::{normalize_path, RemoteEntry, RemoteFs, RemoteReader};
use async_trait::async_trait;
use futures::TryStreamExt;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{header, Method, RequestBuilder, StatusCode};
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::{debug, info};
use url::Url;

/// Characters escaped in request paths (`/` is kept as separator)
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Default connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for [`WebDavClient`]
#[derive(Debug, Clone)]
pub struct WebDavClientBuilder {
    address: String,
    user: String,
    password: Option<String>,
    connect_timeout: Duration,
}

impl WebDavClientBuilder {
    /// Start a builder for a base address such as `http://host:5244/dav`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user: String::new(),
            password: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Basic auth user
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Basic auth password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// TCP connect timeout (transfers themselves are not time-limited)
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build the client without contacting the server
    pub fn build(self) -> RemoteResult<WebDavClient> {
        let base = Url::parse(&self.address).map_err(|e| RemoteError::InvalidUrl {
            url: self.address.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidUrl {
                url: self.address,
                reason: format!("unsupported scheme '{}'", base.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| RemoteError::InitFailed(e.to_string()))?;

        let propfind = Method::from_bytes(b"PROPFIND")
            .map_err(|e| RemoteError::InitFailed(e.to_string()))?;

        let base_path = percent_decode_str(base.path())
            .decode_utf8_lossy()
            .trim_end_matches('/')
            .to_string();

        Ok(WebDavClient {
            http,
            base,
            base_path,
            user: self.user,
            password: self.password,
            propfind,
        })
    }

    /// Build the client and verify the remote root is reachable
    ///
    /// Failure here is fatal: no traversal is attempted.
    pub async fn connect(self, root: &str) -> RemoteResult<WebDavClient> {
        let client = self.build()?;
        client.check(root).await?;
        Ok(client)
    }
}

/// WebDAV client implementing [`RemoteFs`]
#[derive(Debug, Clone)]
pub struct WebDavClient {
    http: reqwest::Client,
    base: Url,
    base_path: String,
    user: String,
    password: Option<String>,
    propfind: Method,
}

impl WebDavClient {
    /// Full request URL for a remote path
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base.as_str().trim_end_matches('/');
        let path = normalize_path(path);
        format!("{}{}", base, utf8_percent_encode(&path, PATH_ENCODE_SET))
    }

    /// Decoded server-side path for a remote path (base path included)
    fn server_path(&self, path: &str) -> String {
        let path = normalize_path(path);
        if path == "/" {
            format!("{}/", self.base_path)
        } else {
            format!("{}{}", self.base_path, path)
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.user, self.password.as_deref())
    }

    fn propfind(&self, url: &str, depth: &'static str) -> RequestBuilder {
        self.request(self.propfind.clone(), url)
            .header("Depth", depth)
            .header(header::CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY)
    }

    /// Probe the remote root with a `Depth: 0` PROPFIND
    pub async fn check(&self, root: &str) -> RemoteResult<()> {
        let url = self.url_for(root);
        info!(url = %url, "Checking WebDAV endpoint");

        let resp = self
            .propfind(&url, "0")
            .send()
            .await
            .map_err(|e| RemoteError::ConnectionFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::AuthFailed {
                url,
                status: resp.status().as_u16(),
            }),
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound {
                path: normalize_path(root),
            }),
            s => Err(RemoteError::ConnectionFailed {
                url,
                reason: format!("unexpected HTTP status {}", s),
            }),
        }
    }
}

/// Map a non-success status to the matching error
fn status_error(path: &str, status: StatusCode, fallback: impl FnOnce(String) -> RemoteError) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::PermissionDenied {
            path: path.to_string(),
        },
        StatusCode::NOT_FOUND => RemoteError::NotFound {
            path: path.to_string(),
        },
        s => fallback(format!("HTTP {}", s)),
    }
}

#[async_trait]
impl RemoteFs for WebDavClient {
    async fn list_dir(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let mut url = self.url_for(path);
        if !url.ends_with('/') {
            url.push('/');
        }
        debug!(path = %path, "PROPFIND");

        let list_failed = |reason: String| RemoteError::ListFailed {
            path: path.to_string(),
            reason,
        };

        let resp = self
            .propfind(&url, "1")
            .send()
            .await
            .map_err(|e| list_failed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(status_error(path, resp.status(), list_failed));
        }

        let body = resp.text().await.map_err(|e| list_failed(e.to_string()))?;
        let props = parse_multistatus(&body).map_err(|e| RemoteError::Protocol {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        Ok(to_remote_entries(&self.server_path(path), props))
    }

    async fn open_read(&self, path: &str) -> RemoteResult<RemoteReader> {
        let url = self.url_for(path);
        debug!(path = %path, "GET");

        let open_failed = |reason: String| RemoteError::OpenFailed {
            path: path.to_string(),
            reason,
        };

        let resp = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| open_failed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(status_error(path, resp.status(), open_failed));
        }

        let stream = resp.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Canned reply for one method and raw request path
    struct Route {
        method: &'static str,
        path: &'static str,
        status: u16,
        body: &'static str,
    }

    /// Request line and headers of every request the fake server saw
    type RequestLog = Arc<Mutex<Vec<String>>>;

    /// Serve `routes` over plain HTTP/1.1; returns the `/dav` base address
    async fn fake_server(routes: Vec<Route>) -> (String, RequestLog) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(routes);
        let log = RequestLog::default();

        let server_log = Arc::clone(&log);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&server_log);
                tokio::spawn(async move { respond(stream, &routes, &log).await });
            }
        });

        (format!("http://{}/dav", addr), log)
    }

    async fn respond(mut stream: TcpStream, routes: &[Route], log: &Mutex<Vec<String>>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let mut request_line = head.lines().next().unwrap_or_default().split(' ');
        let method = request_line.next().unwrap_or_default();
        let path = request_line.next().unwrap_or_default();
        let (status, body) = routes
            .iter()
            .find(|r| r.method == method && r.path == path)
            .map_or((404, ""), |r| (r.status, r.body));
        log.lock().unwrap().push(head.clone());

        let reply = format!(
            "HTTP/1.1 {} Fake\r\nContent-Length: {}\r\nContent-Type: application/xml\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(reply.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
    }

    const ROOT_PROPS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:"><D:response><D:href>/dav/</D:href>
<D:propstat><D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
<D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response></D:multistatus>"#;

    const MOVIES_LISTING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:">
<D:response><D:href>/dav/movies/</D:href>
<D:propstat><D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop></D:propstat></D:response>
<D:response><D:href>/dav/movies/Foo%20Bar%20%282020%29.mkv</D:href>
<D:propstat><D:prop><D:resourcetype/></D:prop></D:propstat></D:response>
<D:response><D:href>/dav/movies/%E5%BD%B1%E7%89%87/</D:href>
<D:propstat><D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop></D:propstat></D:response>
<D:response><D:href>/dav/movies/Foo.nfo</D:href>
<D:propstat><D:prop><D:resourcetype/></D:prop></D:propstat></D:response>
</D:multistatus>"#;

    fn builder(address: &str) -> WebDavClientBuilder {
        WebDavClientBuilder::new(address)
            .user("admin")
            .password("secret")
            .connect_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_connect_checks_root_with_depth_zero() {
        let (address, log) = fake_server(vec![Route {
            method: "PROPFIND",
            path: "/dav/",
            status: 207,
            body: ROOT_PROPS,
        }])
        .await;

        builder(&address).connect("/").await.unwrap();

        let requests = log.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let head = requests[0].to_ascii_lowercase();
        assert!(head.starts_with("propfind /dav/ "));
        assert!(head.contains("depth: 0"));
        assert!(head.contains("authorization: basic "));
    }

    #[tokio::test]
    async fn test_connect_rejected_credentials() {
        for status in [401u16, 403] {
            let (address, _log) = fake_server(vec![Route {
                method: "PROPFIND",
                path: "/dav/",
                status,
                body: "",
            }])
            .await;

            match builder(&address).connect("/").await {
                Err(RemoteError::AuthFailed { status: got, .. }) => assert_eq!(got, status),
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_connect_unreachable() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = builder(&format!("http://{}/dav", addr)).connect("/").await;
        assert!(matches!(result, Err(RemoteError::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn test_list_dir_over_http() {
        let (address, log) = fake_server(vec![Route {
            method: "PROPFIND",
            path: "/dav/movies/",
            status: 207,
            body: MOVIES_LISTING,
        }])
        .await;
        let client = builder(&address).build().unwrap();

        let entries = client.list_dir("/movies").await.unwrap();
        assert_eq!(
            entries,
            vec![
                RemoteEntry::file("Foo Bar (2020).mkv"),
                RemoteEntry::dir("影片"),
                RemoteEntry::file("Foo.nfo"),
            ]
        );
        assert!(log.lock().unwrap()[0].to_ascii_lowercase().contains("depth: 1"));

        assert!(matches!(
            client.list_dir("/missing").await,
            Err(RemoteError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_dir_malformed_body() {
        let (address, _log) = fake_server(vec![Route {
            method: "PROPFIND",
            path: "/dav/tv/",
            status: 207,
            body: "<D:multistatus xmlns:D=\"DAV:\"><D:response></D:multistatus>",
        }])
        .await;
        let client = builder(&address).build().unwrap();

        assert!(matches!(
            client.list_dir("/tv").await,
            Err(RemoteError::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_read_streams_body() {
        let (address, _log) = fake_server(vec![
            Route {
                method: "GET",
                path: "/dav/movies/Foo%20Bar.nfo",
                status: 200,
                body: "<movie><title>Foo Bar</title></movie>",
            },
            Route {
                method: "GET",
                path: "/dav/movies/locked.nfo",
                status: 403,
                body: "",
            },
        ])
        .await;
        let client = builder(&address).build().unwrap();

        let mut reader = client.open_read("/movies/Foo Bar.nfo").await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "<movie><title>Foo Bar</title></movie>");

        assert!(matches!(
            client.open_read("/movies/locked.nfo").await,
            Err(RemoteError::PermissionDenied { .. })
        ));
        assert!(matches!(
            client.open_read("/movies/gone.nfo").await,
            Err(RemoteError::NotFound { .. })
        ));
    }

    fn client() -> WebDavClient {
        WebDavClientBuilder::new("http://localhost:5244/dav")
            .user("admin")
            .password("secret")
            .build()
            .unwrap()
    }

    #[test]
    fn test_url_for() {
        let c = client();
        assert_eq!(c.url_for("/"), "http://localhost:5244/dav/");
        assert_eq!(
            c.url_for("/movies/Foo Bar.mkv"),
            "http://localhost:5244/dav/movies/Foo%20Bar.mkv"
        );
        assert_eq!(c.url_for("tv/#1.nfo"), "http://localhost:5244/dav/tv/%231.nfo");
    }

    #[test]
    fn test_server_path() {
        let c = client();
        assert_eq!(c.server_path("/"), "/dav/");
        assert_eq!(c.server_path("/movies"), "/dav/movies");
    }

    #[test]
    fn test_invalid_address() {
        assert!(matches!(
            WebDavClientBuilder::new("not a url").build(),
            Err(RemoteError::InvalidUrl { .. })
        ));
        assert!(matches!(
            WebDavClientBuilder::new("ftp://host/dav").build(),
            Err(RemoteError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_status_error() {
        let err = status_error("/a", StatusCode::NOT_FOUND, |r| RemoteError::ListFailed {
            path: "/a".into(),
            reason: r,
        });
        assert!(matches!(err, RemoteError::NotFound { .. }));

        let err = status_error("/a", StatusCode::BAD_GATEWAY, |r| RemoteError::ListFailed {
            path: "/a".into(),
            reason: r,
        });
        match err {
            RemoteError::ListFailed { reason, .. } => assert!(reason.contains("502")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
