//! REST client for the public and admin APIs.
//!
//! Every call is a single request with the bearer credential attached. A
//! non-success status becomes [`ConsoleError::Http`] carrying the response
//! body; the caller decides what to show.
//!
//! Request construction is split from sending so the exact URL, headers and
//! body of every endpoint can be checked without a server.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::auth::Credential;
use crate::config::Config;
use crate::error::{ConsoleError, Result};
use crate::model::{ChannelPage, MessagePage, QueueType, Task, TaskCountsResponse, TaskStatus, User, VideoEdit};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the console's REST endpoints.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    api_base: String,
    admin_base: String,
    page_size: u32,
    credential: Option<Credential>,
}

impl AdminClient {
    /// Client for the endpoints in `config`, without a credential.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            admin_base: config.admin_api_base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            credential: None,
        })
    }

    /// Attach the bearer credential used by the admin endpoints.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn admin(&self, path: &str) -> String {
        format!("{}{}", self.admin_base, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let credential = self.credential.as_ref().ok_or(ConsoleError::NotLoggedIn)?;
        Ok(request
            .bearer_auth(credential.as_str())
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        log::debug!("[AdminClient] Request failed: {} {}", status, body);
        Err(ConsoleError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        Ok(Self::send(request).await?.json().await?)
    }

    async fn execute(request: RequestBuilder) -> Result<()> {
        Self::send(request).await.map(|_| ())
    }

    // --- authentication ---

    fn send_otp_request(&self, phone: &str) -> RequestBuilder {
        self.http
            .post(self.api("/api/send-otp"))
            .json(&json!({ "phone": phone }))
    }

    /// Ask the server to text a one-time code to `phone`.
    pub async fn send_otp(&self, phone: &str) -> Result<()> {
        log::info!("[AdminClient] Requesting one-time code");
        Self::execute(self.send_otp_request(phone)).await
    }

    fn verify_otp_request(&self, phone: &str, otp: &str) -> RequestBuilder {
        self.http
            .post(self.api("/api/verify-otp"))
            .json(&json!({ "phone": phone, "otp": otp }))
    }

    /// Exchange a one-time code for a credential.
    pub async fn verify_otp(&self, phone: &str, otp: &str) -> Result<Credential> {
        let body: Value = Self::fetch(self.verify_otp_request(phone, otp)).await?;
        token_from_response(&body)
    }

    // --- tasks ---

    fn task_counts_request(&self, status: TaskStatus) -> Result<RequestBuilder> {
        self.authorized(
            self.http
                .get(self.admin("/tasks/counts"))
                .query(&[("status", status.code())]),
        )
    }

    /// Number of tasks per queue in `status`.
    pub async fn task_counts(&self, status: TaskStatus) -> Result<TaskCountsResponse> {
        Self::fetch(self.task_counts_request(status)?).await
    }

    fn oldest_task_request(&self, status: TaskStatus, queue: QueueType) -> Result<RequestBuilder> {
        self.authorized(
            self.http
                .get(self.admin("/tasks/oldest-task"))
                .query(&[("status", status.code()), ("queue_type", queue.code())]),
        )
    }

    /// Oldest task in `queue` with `status`, if any.
    pub async fn oldest_task(&self, status: TaskStatus, queue: QueueType) -> Result<Option<Task>> {
        let tasks: Option<Vec<Task>> = Self::fetch(self.oldest_task_request(status, queue)?).await?;
        Ok(tasks.and_then(|tasks| tasks.into_iter().next()))
    }

    fn update_task_status_request(&self, task_id: &str, status: TaskStatus) -> Result<RequestBuilder> {
        let code = status.code().to_string();
        self.authorized(
            self.http
                .post(self.admin("/tasks/update-status"))
                .query(&[("task_id", task_id), ("status", code.as_str())]),
        )
    }

    /// Move a task to `status` (resolve or defer).
    pub async fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        Self::execute(self.update_task_status_request(task_id, status)?).await
    }

    // --- users and chats ---

    fn user_request(&self, id: &str) -> Result<RequestBuilder> {
        self.authorized(self.http.get(self.admin("/users/user")).query(&[("id", id)]))
    }

    /// Fetch a user profile.
    pub async fn user(&self, id: &str) -> Result<User> {
        Self::fetch(self.user_request(id)?).await
    }

    fn chat_channels_request(&self, user_id: &str, cursor: Option<&str>) -> Result<RequestBuilder> {
        let cursor = cursor
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        self.authorized(
            self.http
                .post(self.admin("/users/chat_channels/list"))
                .query(&[("user_id", user_id)])
                .json(&json!({
                    "limit": self.page_size,
                    "chat_channel_list_type": "all",
                    "cursor_last_message_at": cursor,
                })),
        )
    }

    /// One page of a user's channels, older than `cursor` (default: now).
    pub async fn chat_channels(&self, user_id: &str, cursor: Option<&str>) -> Result<ChannelPage> {
        let mut page: ChannelPage = Self::fetch(self.chat_channels_request(user_id, cursor)?).await?;
        page.sort();
        Ok(page)
    }

    fn chat_messages_request(&self, channel_id: &str, before: Option<&str>) -> Result<RequestBuilder> {
        let mut body = json!({
            "chat_channel_id": channel_id,
            "limit": self.page_size,
        });
        if let Some(before) = before {
            body["before"] = Value::String(before.to_string());
        }
        self.authorized(self.http.post(self.admin("/users/chat_messages/list")).json(&body))
    }

    /// One page of a channel's messages: the newest, or those before `before`.
    pub async fn chat_messages(&self, channel_id: &str, before: Option<&str>) -> Result<MessagePage> {
        let mut page: MessagePage = Self::fetch(self.chat_messages_request(channel_id, before)?).await?;
        page.sort();
        Ok(page)
    }

    // --- verification videos ---

    fn edit_video_request(&self, user_id: &str, edit: &VideoEdit) -> Result<RequestBuilder> {
        self.authorized(
            self.http
                .post(self.admin("/tasks/edit-verification-video"))
                .query(&[
                    ("user_id", user_id.to_string()),
                    ("start_mil", edit.start_millis().to_string()),
                    ("end_mil", edit.end_millis().to_string()),
                    ("rotation", edit.rotation().degrees().to_string()),
                ]),
        )
    }

    /// Request a trimmed/rotated copy of a user's verification video.
    ///
    /// Completion is announced on the realtime channel, not in the response.
    pub async fn edit_verification_video(&self, user_id: &str, edit: &VideoEdit) -> Result<()> {
        Self::execute(self.edit_video_request(user_id, edit)?).await
    }

    fn video_decision_request(&self, path: &str, user_id: &str, task_id: &str) -> Result<RequestBuilder> {
        self.authorized(
            self.http
                .post(self.admin(path))
                .query(&[("user_id", user_id), ("task_id", task_id)]),
        )
    }

    /// Reject a verification video.
    pub async fn reject_verification_video(&self, user_id: &str, task_id: &str) -> Result<()> {
        Self::execute(self.video_decision_request("/tasks/reject-verification-video", user_id, task_id)?)
            .await
    }

    /// Accept the edited verification video.
    pub async fn confirm_edited_verification_video(&self, user_id: &str, task_id: &str) -> Result<()> {
        Self::execute(self.video_decision_request(
            "/tasks/confirm-edited-verification-video",
            user_id,
            task_id,
        )?)
        .await
    }
}

/// Pull the token out of a verify-otp response.
fn token_from_response(body: &Value) -> Result<Credential> {
    body.get("access_token")
        .or_else(|| body.get("token"))
        .and_then(Value::as_str)
        .filter(|token| !token.trim().is_empty())
        .map(Credential::new)
        .ok_or(ConsoleError::MissingToken)
}
