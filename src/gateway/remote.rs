use super::{AudioPreference, Capabilities, SessionRecord, StreakRecord};
use crate::error::{FocusError, Result};
use crate::settings::SessionSettings;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Record-level access to the remote store, keyed by the authenticated user.
///
/// `fetch_*` methods return `Ok(None)` when the user has no record yet.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn capabilities(&self) -> Result<Capabilities>;
    async fn fetch_settings(&self) -> Result<Option<SessionSettings>>;
    async fn store_settings(&self, settings: &SessionSettings) -> Result<()>;
    async fn fetch_streak(&self) -> Result<StreakRecord>;
    async fn insert_session(&self, record: &SessionRecord) -> Result<()>;
    async fn fetch_audio_preference(&self) -> Result<Option<AudioPreference>>;
    async fn store_audio_preference(&self, pref: &AudioPreference) -> Result<()>;
}

/// JSON-over-HTTP store authenticated with a bearer token.
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FocusError::Connection(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(&self.token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(transport_error)?;
        debug!(event = "remote_response", url = %response.url(), status = %response.status());
        Ok(response)
    }

    async fn fetch_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.send(self.get(path)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response)?;
        response.json::<T>().await.map(Some).map_err(transport_error)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = check_status(self.send(self.get(path)).await?)?;
        response.json::<T>().await.map_err(transport_error)
    }

    async fn write(&self, request: RequestBuilder) -> Result<()> {
        check_status(self.send(request.bearer_auth(&self.token)).await?)?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn capabilities(&self) -> Result<Capabilities> {
        self.fetch("/v1/capabilities").await
    }

    async fn fetch_settings(&self) -> Result<Option<SessionSettings>> {
        self.fetch_optional("/v1/focus/settings").await
    }

    async fn store_settings(&self, settings: &SessionSettings) -> Result<()> {
        self.write(self.client.put(self.url("/v1/focus/settings")).json(settings))
            .await
    }

    async fn fetch_streak(&self) -> Result<StreakRecord> {
        Ok(self
            .fetch_optional::<StreakRecord>("/v1/focus/streak")
            .await?
            .unwrap_or_default())
    }

    async fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        self.write(self.client.post(self.url("/v1/focus/sessions")).json(record))
            .await
    }

    async fn fetch_audio_preference(&self) -> Result<Option<AudioPreference>> {
        self.fetch_optional("/v1/focus/audio-preference").await
    }

    async fn store_audio_preference(&self, pref: &AudioPreference) -> Result<()> {
        self.write(self.client.put(self.url("/v1/focus/audio-preference")).json(pref))
            .await
    }
}

fn transport_error(err: reqwest::Error) -> FocusError {
    if err.is_decode() {
        FocusError::Protocol(err.to_string())
    } else {
        FocusError::Connection(err.to_string())
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FocusError::Auth(format!("remote store answered {status}")));
    }
    if status.is_server_error() {
        return Err(FocusError::Connection(format!("remote store answered {status}")));
    }
    if !status.is_success() {
        return Err(FocusError::Protocol(format!("remote store answered {status}")));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Serves a single canned HTTP response on a local port.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}")
    }

    fn store(base: &str) -> HttpRemoteStore {
        HttpRemoteStore::new(base, "token", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = store(&format!("http://127.0.0.1:{port}"))
            .capabilities()
            .await
            .unwrap_err();
        assert!(matches!(err, FocusError::Connection(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unauthorized_is_auth_error() {
        let base = serve_once("401 Unauthorized", "");
        let err = store(&base).capabilities().await.unwrap_err();
        assert!(matches!(err, FocusError::Auth(_)), "{err:?}");
    }

    #[tokio::test]
    async fn missing_record_reads_as_none() {
        let base = serve_once("404 Not Found", "");
        assert_eq!(store(&base).fetch_settings().await.unwrap(), None);
    }

    #[tokio::test]
    async fn capabilities_are_decoded() {
        let base = serve_once(
            "200 OK",
            r#"{"authenticated":true,"collections":["focus_settings"]}"#,
        );
        let caps = store(&base).capabilities().await.unwrap();
        assert!(caps.authenticated);
        assert_eq!(caps.collections, vec!["focus_settings".to_string()]);
    }

    #[tokio::test]
    async fn garbage_body_is_protocol_error() {
        let base = serve_once("200 OK", "not json");
        let err = store(&base).fetch_streak().await.unwrap_err();
        assert!(matches!(err, FocusError::Protocol(_)), "{err:?}");
    }
}
