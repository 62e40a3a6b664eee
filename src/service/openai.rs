//! OpenAI Assistants API client
//!
//! Async HTTP client for the Assistants API (v2) covering the operations
//! the orchestration loop needs: assistants, threads, runs, messages, and
//! file uploads.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{Assistant, Config, Result, Run, TandemError, ThreadMessage};
use crate::service::traits::{AssistantService, CreateAssistant};

/// OpenAI Assistants API client
#[derive(Clone)]
pub struct OpenAiService {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Assistant creation request
#[derive(Debug, Serialize)]
struct CreateAssistantRequest<'a> {
    name: &'a str,
    instructions: &'a str,
    model: &'a str,
    tools: Vec<ToolSpec>,
}

/// Tool enabled on a new assistant
#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Assistant modification request (file attachment)
#[derive(Debug, Serialize)]
struct ModifyAssistantRequest {
    file_ids: Vec<String>,
}

/// Thread-and-run creation request
#[derive(Debug, Serialize)]
struct CreateThreadAndRunRequest<'a> {
    assistant_id: &'a str,
}

/// Message creation request
#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

/// Paged listing envelope
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// File upload response
#[derive(Debug, Deserialize)]
struct FileResponse {
    id: String,
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

/// Error detail within an error body
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl OpenAiService {
    /// Create a client from configuration
    pub fn from_config(config: &Config, api_key: impl Into<String>) -> Self {
        Self::with_base_url(&config.service.base_url, api_key, config.service.timeout_secs)
    }

    /// Create a client with a custom base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Build a full endpoint URL
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request with the auth and API-version headers applied
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    /// Map a response to the expected type, translating API failures
    async fn parse<T: DeserializeOwned>(&self, what: &str, response: Response) -> Result<T> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(TandemError::not_found(what.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(TandemError::service(status.as_u16(), message));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AssistantService for OpenAiService {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        let response = self
            .request(reqwest::Method::GET, &format!("/assistants/{}", assistant_id))
            .send()
            .await?;
        self.parse(&format!("assistant {}", assistant_id), response)
            .await
    }

    async fn create_assistant(&self, request: CreateAssistant) -> Result<Assistant> {
        debug!(name = %request.name, model = %request.model, "creating assistant");
        let body = CreateAssistantRequest {
            name: &request.name,
            instructions: &request.instructions,
            model: &request.model,
            tools: vec![ToolSpec {
                kind: "file_search",
            }],
        };
        let response = self
            .request(reqwest::Method::POST, "/assistants")
            .json(&body)
            .send()
            .await?;
        self.parse("assistant creation", response).await
    }

    async fn create_thread_and_run(&self, assistant_id: &str) -> Result<Run> {
        let body = CreateThreadAndRunRequest { assistant_id };
        let response = self
            .request(reqwest::Method::POST, "/threads/runs")
            .json(&body)
            .send()
            .await?;
        self.parse("thread run creation", response).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/threads/{}/runs/{}", thread_id, run_id),
            )
            .send()
            .await?;
        self.parse(&format!("run {}", run_id), response).await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        after: Option<&str>,
    ) -> Result<Vec<ThreadMessage>> {
        let mut request = self
            .request(
                reqwest::Method::GET,
                &format!("/threads/{}/messages", thread_id),
            )
            .query(&[("order", "asc")]);
        if let Some(after) = after {
            request = request.query(&[("after", after)]);
        }

        let response = request.send().await?;
        let page: ListResponse<ThreadMessage> = self
            .parse(&format!("messages of {}", thread_id), response)
            .await?;
        Ok(page.data)
    }

    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<String> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().text("purpose", "assistants").part("file", part);

        let response = self
            .request(reqwest::Method::POST, "/files")
            .multipart(form)
            .send()
            .await?;
        let file: FileResponse = self.parse("file upload", response).await?;
        Ok(file.id)
    }

    async fn attach_file(&self, assistant_id: &str, file_id: &str) -> Result<Assistant> {
        let assistant = self.retrieve_assistant(assistant_id).await?;
        let mut file_ids = assistant.file_ids;
        file_ids.push(file_id.to_string());

        let body = ModifyAssistantRequest { file_ids };
        let response = self
            .request(reqwest::Method::POST, &format!("/assistants/{}", assistant_id))
            .json(&body)
            .send()
            .await?;
        self.parse(&format!("assistant {}", assistant_id), response)
            .await
    }

    async fn create_message(&self, thread_id: &str, text: &str) -> Result<ThreadMessage> {
        let body = CreateMessageRequest {
            role: "user",
            content: text,
        };
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/threads/{}/messages", thread_id),
            )
            .json(&body)
            .send()
            .await?;
        self.parse("message creation", response).await
    }
}
