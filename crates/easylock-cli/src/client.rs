//! HTTP client for a running easylock server.

use serde::Deserialize;

use easylock_core::{Request, Response};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server could not be reached or the connection dropped.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The reply body was not what the endpoint promises.
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

impl ClientError {
    /// Process exit code: 2 = rejected by the server, 3 = transport failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Rejected { .. } => 2,
            ClientError::Transport { .. } | ClientError::Malformed { .. } => 3,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

pub struct LockClient {
    base: String,
    http: reqwest::Client,
}

impl LockClient {
    pub fn new(server: &str) -> Self {
        LockClient {
            base: server.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn try_lock(&self, request: &Request) -> Result<Response, ClientError> {
        self.post("/locks/try-lock", request).await
    }

    pub async fn lock(&self, request: &Request) -> Result<Response, ClientError> {
        self.post("/locks/lock", request).await
    }

    pub async fn unlock(&self, request: &Request) -> Result<Response, ClientError> {
        self.post("/locks/unlock", request).await
    }

    /// Raw `GET /locks` body.
    pub async fn status(&self) -> Result<serde_json::Value, ClientError> {
        let url = self.url("/locks");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        read_body(url, response).await
    }

    async fn post(&self, path: &str, request: &Request) -> Result<Response, ClientError> {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        read_body(url, response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

async fn read_body<T>(url: String, response: reqwest::Response) -> Result<T, ClientError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    let body_text = response
        .text()
        .await
        .map_err(|source| ClientError::Transport {
            url: url.clone(),
            source,
        })?;

    if !status.is_success() {
        return Err(rejection(status.as_u16(), &body_text));
    }

    serde_json::from_str(&body_text).map_err(|err| ClientError::Malformed {
        url,
        reason: err.to_string(),
    })
}

fn rejection(status: u16, body_text: &str) -> ClientError {
    let message = match serde_json::from_str::<ErrorBody>(body_text) {
        Ok(body) => format!("{}: {}", body.error.code, body.error.message),
        Err(_) => body_text.trim().to_string(),
    };
    ClientError::Rejected { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_uses_structured_error_body() {
        let err = rejection(
            400,
            r#"{"success":false,"error":{"code":"BAD_REQUEST","message":"lock key should not be empty"}}"#,
        );
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "server rejected request (400): BAD_REQUEST: lock key should not be empty"
        );
    }

    #[test]
    fn rejection_falls_back_to_raw_text() {
        let err = rejection(422, "Failed to deserialize the JSON body\n");
        assert!(err.to_string().ends_with("Failed to deserialize the JSON body"));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = LockClient::new("http://127.0.0.1:3000/");
        assert_eq!(client.url("/locks"), "http://127.0.0.1:3000/locks");
    }
}
