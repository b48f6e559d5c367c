use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::{decode_deltas, map_body_errors};
use crate::types::{ChatCompletion, ChatCompletionRequest, DeltaEvent};

/// Base URL of Groq's OpenAI-compatible API.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/";
const COMPLETIONS_PATH: &str = "chat/completions";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A stream of decoded reply deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<DeltaEvent>> + Send>>;

/// Something that can answer chat-completions requests.
///
/// [`Groq`] talks HTTP; tests substitute canned responses.
#[async_trait::async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Send a request and return the streamed reply.
    ///
    /// Errors about the request itself (encoding, connection, status) are
    /// returned here, before any delta is produced.
    async fn stream(&self, api_key: &str, request: ChatCompletionRequest) -> Result<DeltaStream>;

    /// Send a request and wait for the whole reply.
    async fn complete(
        &self,
        api_key: &str,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletion>;
}

/// Client for the Groq chat-completions API.
#[derive(Debug, Clone)]
pub struct Groq {
    client: ReqwestClient,
    endpoint: Url,
    timeout: Duration,
}

impl Groq {
    /// Create a new client for the default endpoint.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `base_url` must end with the API version path, e.g.
    /// `https://api.groq.com/openai/v1/`; a missing trailing slash is added.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let endpoint = Url::parse(&base_url)?.join(COMPLETIONS_PATH)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// The URL requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Create the headers for an API request.
    fn headers(&self, api_key: &str, accept: &'static str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static(accept));
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| Error::authentication("API key contains characters not allowed in a header"))?;
        bearer.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Serialize and post `request`, returning the successful response.
    async fn post(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
        accept: &'static str,
    ) -> Result<Response> {
        let body = serde_json::to_vec(request).map_err(|e| {
            Error::encoding(
                format!("Failed to encode request: {e}"),
                Some(Box::new(e)),
            )
        })?;
        let headers = self.headers(api_key, accept)?;

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        tracing::debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            stream = request.stream,
            "posting chat completion"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
        let error_param = detail.as_ref().and_then(|e| e.param.clone());
        let error_message = detail
            .and_then(|e| e.message)
            .unwrap_or_else(|| error_body.clone());

        tracing::debug!(status_code, ?request_id, "chat completion rejected");

        match status_code {
            400 => Error::bad_request(error_message, error_param),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message, request_id),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message, request_id),
        }
    }
}

#[async_trait::async_trait]
impl CompletionTransport for Groq {
    async fn stream(
        &self,
        api_key: &str,
        mut request: ChatCompletionRequest,
    ) -> Result<DeltaStream> {
        request.stream = true;
        let response = self.post(api_key, &request, "text/event-stream").await?;
        let body = map_body_errors(response.bytes_stream());
        Ok(Box::pin(decode_deltas(body)))
    }

    async fn complete(
        &self,
        api_key: &str,
        mut request: ChatCompletionRequest,
    ) -> Result<ChatCompletion> {
        request.stream = false;
        let response = self.post(api_key, &request, "application/json").await?;
        response.json::<ChatCompletion>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })
    }
}
