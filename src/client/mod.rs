//! HTTP client for the progress API, used by bots and the CLI.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::progress::{CourseId, ModuleId};
use crate::web::ErrorResponse;
use crate::web::dto::courses::{EnrollResponse, ResumeResponse};
use crate::web::dto::progress::{
    AllProgressResponse, CourseProgressResponse, ProgressUpdateBody, ProgressUpdateResponse,
};

mod error;
pub use error::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub struct ProgressClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ProgressClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:5000`; `token` a
    /// JWT for the user the client acts as.
    pub fn new<S: Into<String>>(base_url: &str, token: S) -> ClientResult<Self> {
        let parsed =
            Url::parse(base_url).map_err(|_| ClientError::InvalidBaseUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        let base_url = parsed.as_str().trim_end_matches('/').to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'));
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> ClientResult<T> {
        let resp = req.send().await?;
        let status = resp.status();
        tracing::debug!("progress api answered {status}");

        if !status.is_success() {
            let message = match resp.json::<ErrorResponse>().await {
                Ok(body) => body.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<T>().await?)
    }

    pub async fn course_progress(&self, course: CourseId) -> ClientResult<CourseProgressResponse> {
        self.send(self.request(Method::GET, &format!("courses/{course}/progress/")))
            .await
    }

    pub async fn all_progress(&self) -> ClientResult<AllProgressResponse> {
        self.send(self.request(Method::GET, "progress/")).await
    }

    pub async fn update_progress(
        &self,
        course: CourseId,
        module: ModuleId,
        completed: Option<bool>,
    ) -> ClientResult<ProgressUpdateResponse> {
        let body = ProgressUpdateBody {
            module_id: Some(module),
            completed,
            time_spent_seconds: None,
        };
        let req = self
            .request(Method::POST, &format!("courses/{course}/progress/"))
            .json(&body);
        self.send(req).await
    }

    pub async fn enroll(&self, course: CourseId) -> ClientResult<EnrollResponse> {
        self.send(self.request(Method::POST, &format!("courses/{course}/enroll")))
            .await
    }

    pub async fn resume(&self, course: CourseId) -> ClientResult<ResumeResponse> {
        self.send(self.request(Method::GET, &format!("courses/{course}/resume")))
            .await
    }
}
