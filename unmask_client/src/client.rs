use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::error::UnmaskError;
use crate::prediction::{FileRef, MaskPrediction, Output};
use crate::sse;
use crate::MaskPredictor;

pub const HUB_SPACES_API: &str = "https://huggingface.co/api/spaces";
pub const DEFAULT_API_NAME: &str = "predict";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Either a Space id (`owner/name`) or the base URL of a running app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceRef {
    Id(String),
    Url(String),
}

impl FromStr for SpaceRef {
    type Err = UnmaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(Self::Url(s.trim_end_matches('/').to_string()));
        }
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::Id(s.to_string()))
            }
            _ => Err(UnmaskError::InvalidSpace(s.to_string())),
        }
    }
}

impl fmt::Display for SpaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Clone)]
pub struct ClientConfig {
    pub space: SpaceRef,
    pub api_name: String,
    pub token: Option<String>,
    pub timeout: Duration,
    /// Base of the Hub API used to resolve Space ids to hosts.
    pub hub_api: String,
}

impl ClientConfig {
    pub fn new(space: SpaceRef, token: Option<String>) -> Self {
        Self {
            space,
            api_name: DEFAULT_API_NAME.to_string(),
            token,
            timeout: DEFAULT_TIMEOUT,
            hub_api: HUB_SPACES_API.to_string(),
        }
    }
}

// Keeps the token out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("space", &self.space)
            .field("api_name", &self.api_name)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("hub_api", &self.hub_api)
            .finish()
    }
}

#[derive(Deserialize)]
struct SpaceHost {
    host: String,
}

#[derive(Deserialize)]
struct QueuedCall {
    event_id: String,
}

/// Blocking client for one endpoint of a Gradio app.
pub struct GradioClient {
    http: Client,
    host: String,
    api_name: String,
    token: Option<String>,
}

impl GradioClient {
    #[instrument(skip_all, fields(space = %config.space))]
    pub fn connect(config: ClientConfig) -> Result<Self, UnmaskError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| UnmaskError::Http {
                url: config.space.to_string(),
                source,
            })?;

        let host = match &config.space {
            SpaceRef::Url(url) => url.clone(),
            SpaceRef::Id(id) => {
                let url = format!("{}/{}/host", config.hub_api.trim_end_matches('/'), id);
                let resolved: SpaceHost = read_json(send(http.get(&url), config.token.as_deref(), &url)?, &url)?;
                resolved.host.trim_end_matches('/').to_string()
            }
        };

        info!("Using endpoint {}/call/{}", host, config.api_name);
        Ok(Self {
            http,
            host,
            api_name: config.api_name,
            token: config.token,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn fetch_file(&self, file: &FileRef) -> Result<MaskPrediction, UnmaskError> {
        let url = match (&file.url, &file.path) {
            (Some(url), _) => url.clone(),
            (None, Some(path)) => format!("{}/file={}", self.host, path),
            (None, None) => {
                return Err(UnmaskError::UnexpectedOutput(
                    "file reference without path or url".to_string(),
                ))
            }
        };

        debug!("Fetching prediction file {}", url);
        let token = self.token.as_deref().filter(|_| self.is_own_url(&url));
        read_json(send(self.http.get(&url), token, &url)?, &url)
    }

    /// Whether `url` points at the resolved app host; the token is only sent there.
    fn is_own_url(&self, url: &str) -> bool {
        url.strip_prefix(self.host.as_str())
            .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'))
    }
}

impl MaskPredictor for GradioClient {
    #[instrument(skip(self))]
    fn predict(&self, sentence: &str) -> Result<MaskPrediction, UnmaskError> {
        let call_url = format!("{}/call/{}", self.host, self.api_name);
        let request = self.http.post(&call_url).json(&json!({ "data": [sentence] }));
        let queued: QueuedCall = read_json(send(request, self.token.as_deref(), &call_url)?, &call_url)?;
        debug!("Queued as event {}", queued.event_id);

        let stream_url = format!("{}/{}", call_url, queued.event_id);
        let body = send(self.http.get(&stream_url), self.token.as_deref(), &stream_url)?
            .text()
            .map_err(|source| UnmaskError::Http {
                url: stream_url.clone(),
                source,
            })?;

        let outputs = sse::completion(&sse::parse_events(&body))?;
        let first = outputs
            .into_iter()
            .next()
            .ok_or_else(|| UnmaskError::UnexpectedOutput("empty output list".to_string()))?;

        match Output::from_value(first)? {
            Output::Inline(prediction) => Ok(prediction),
            Output::File(file) => self.fetch_file(&file),
        }
    }
}

fn send(request: RequestBuilder, token: Option<&str>, url: &str) -> Result<Response, UnmaskError> {
    let request = match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    };

    let response = request.send().map_err(|source| UnmaskError::Http {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(UnmaskError::Status {
            url: url.to_string(),
            status,
            body,
        });
    }
    Ok(response)
}

fn read_json<T: serde::de::DeserializeOwned>(response: Response, url: &str) -> Result<T, UnmaskError> {
    let body = response.text().map_err(|source| UnmaskError::Http {
        url: url.to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_space_references() {
        assert_eq!(
            "shreyasmeher/ConfliBERT_Unmask".parse::<SpaceRef>().unwrap(),
            SpaceRef::Id("shreyasmeher/ConfliBERT_Unmask".into())
        );
        assert_eq!(
            "https://example.hf.space/".parse::<SpaceRef>().unwrap(),
            SpaceRef::Url("https://example.hf.space".into())
        );
        assert!("no-owner".parse::<SpaceRef>().is_err());
        assert!("a/b/c".parse::<SpaceRef>().is_err());
        assert!("/name".parse::<SpaceRef>().is_err());
    }

    #[test]
    fn debug_output_hides_token() {
        let config = ClientConfig::new(SpaceRef::Id("o/n".into()), Some("hf_secret".into()));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hf_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn token_stays_on_the_app_host() {
        let client = GradioClient {
            http: Client::new(),
            host: "https://owner-unmask.hf.space".to_string(),
            api_name: DEFAULT_API_NAME.to_string(),
            token: Some("hf_secret".to_string()),
        };

        assert!(client.is_own_url("https://owner-unmask.hf.space/file=/tmp/out.json"));
        assert!(client.is_own_url("https://owner-unmask.hf.space"));
        assert!(!client.is_own_url("https://owner-unmask.hf.space.evil.com/file=x"));
        assert!(!client.is_own_url("https://cdn.example.com/owner-unmask.hf.space/x"));
    }
}
