pub mod error;
pub mod pagination;

use std::path::Path;

use error::{error_message, ApiError, Result};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

#[derive(Clone, Debug)]
pub struct BasicAuth {
    pub username: String,
    pub token: String,
}

/// Thin JSON transport over `reqwest` for one Jira site.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: Option<BasicAuth>,
}

impl ApiClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(base_url.as_ref().trim())?;
        // Url::join replaces the last segment unless the base ends with '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(format!("jira-ops/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::RequestFailed)?;

        Ok(Self {
            client,
            base_url: url,
            auth: None,
        })
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            token: token.into(),
        });
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> Option<&str> {
        self.auth.as_ref().map(|auth| auth.username.as_str())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, Option::<&()>::None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::DELETE, path, Option::<&()>::None)
            .await
    }

    pub async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(method = %method, url = %url, "Sending request");

        let mut req = self.apply_auth(self.client.request(method, url.clone()));
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await?;
        Self::decode(response, &url).await
    }

    /// Uploads a local file as the `file` part of a multipart request.
    pub async fn post_file<T: DeserializeOwned>(
        &self,
        path: &str,
        file: &Path,
        file_name: Option<&str>,
    ) -> Result<T> {
        let data = tokio::fs::read(file)
            .await
            .map_err(|source| ApiError::LocalFile {
                path: file.display().to_string(),
                source,
            })?;

        let name = file_name
            .map(str::to_string)
            .or_else(|| {
                file.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "attachment".to_string());

        let url = self.endpoint(path)?;
        debug!(url = %url, file = %name, bytes = data.len(), "Uploading file");

        let form = Form::new().part("file", Part::bytes(data).file_name(name));
        let req = self
            .apply_auth(self.client.post(url.clone()))
            .header("X-Atlassian-Token", "no-check")
            .multipart(form);

        let response = req.send().await?;
        Self::decode(response, &url).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(path.strip_prefix('/').unwrap_or(path))?)
    }

    async fn decode<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T> {
        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::AuthenticationFailed {
                message: "Invalid or expired credentials".to_string(),
            }),
            StatusCode::FORBIDDEN => Err(ApiError::AuthenticationFailed {
                message: format!("Permission denied for {}", url.path()),
            }),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound {
                resource: url.path().to_string(),
            }),
            StatusCode::BAD_REQUEST => {
                let message = response
                    .text()
                    .await
                    .map(|body| error_message(&body))
                    .unwrap_or_else(|_| "Bad request".to_string());
                Err(ApiError::BadRequest { message })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                Err(ApiError::RateLimitExceeded { retry_after })
            }
            status if status.is_success() => {
                let bytes = response.bytes().await?;
                // 204 No Content and friends decode as JSON null.
                let decoded = if bytes.iter().all(u8::is_ascii_whitespace) {
                    serde_json::from_value(Value::Null)
                } else {
                    serde_json::from_slice(&bytes)
                };
                decoded.map_err(|e| {
                    debug!(error = %e, "Failed to parse JSON response");
                    ApiError::InvalidResponse(e.to_string())
                })
            }
            _ => {
                let message = response
                    .text()
                    .await
                    .map(|body| error_message(&body))
                    .unwrap_or_else(|_| format!("Unexpected status: {}", status));
                Err(ApiError::ServerError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(ACCEPT, "application/json");
        match &self.auth {
            Some(BasicAuth { username, token }) => request.basic_auth(username, Some(token)),
            None => request,
        }
    }
}
