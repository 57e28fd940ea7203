use crate::backend::{AgentBackend, EventStream};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::sse::{SseDecoder, SseFrame};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, COOKIE};
use reqwest::StatusCode;
use shared_types::{
    CancelRequest, ChatSession, CreateSessionRequest, MessagesResponse, SendMessageRequest,
    SendMessageResponse, SessionListResponse, SessionResponse, ToolResultSubmission,
};
use std::collections::VecDeque;
use std::time::Duration;

/// HTTP implementation of [`AgentBackend`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        // No overall client timeout: the event stream stays open for the
        // whole run. Plain requests get `timeout` individually.
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self {
            config,
            http,
            timeout,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn set_bearer_token(&mut self, token: Option<String>) {
        self.config.bearer_token = token;
    }

    pub fn set_auth_cookie(&mut self, cookie: Option<String>) {
        self.config.auth_cookie = cookie;
    }

    fn add_auth_header(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = match &self.config.bearer_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        };
        match &self.config.auth_cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let request = self.add_auth_header(request).timeout(self.timeout);
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::HttpStatus(response.status()));
        }
        Ok(response)
    }

    pub async fn health_check(&self) -> Result<serde_json::Value, ClientError> {
        let url = format!("{}/api/health", self.config.base_url.trim_end_matches('/'));
        let response = self.send(self.http.get(&url)).await?;

        let status: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::ParseFailed(e.to_string()))?;

        Ok(status)
    }
}

#[async_trait]
impl AgentBackend for ApiClient {
    async fn fetch_messages(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<MessagesResponse, ClientError> {
        let url = self.config.api_url("/messages");
        let mut request = self.http.get(&url).query(&[("sessionId", session_id)]);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = match self.send(request).await {
            Err(ClientError::HttpStatus(StatusCode::NOT_FOUND)) => {
                return Err(ClientError::SessionNotFound(session_id.to_string()))
            }
            other => other?,
        };

        let messages: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ParseFailed(e.to_string()))?;

        tracing::debug!(
            session_id = %session_id,
            status = %messages.status,
            count = messages.messages.len(),
            "Fetched messages"
        );
        Ok(messages)
    }

    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, ClientError> {
        let url = self.config.api_url("/chat");
        let response = self.send(self.http.post(&url).json(&request)).await?;

        let sent: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ParseFailed(e.to_string()))?;

        Ok(sent)
    }

    async fn cancel(&self, session_id: &str) -> Result<(), ClientError> {
        let url = self.config.api_url("/chat/cancel");
        let body = CancelRequest {
            session_id: session_id.to_string(),
        };
        self.send(self.http.post(&url).json(&body)).await?;
        Ok(())
    }

    async fn submit_tool_results(
        &self,
        submission: ToolResultSubmission,
    ) -> Result<(), ClientError> {
        let url = self.config.tool_result_url();
        self.send(self.http.post(&url).json(&submission)).await?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, ClientError> {
        let url = self.config.api_url("/sessions");
        let response = self.send(self.http.get(&url)).await?;

        let list: SessionListResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ParseFailed(e.to_string()))?;

        Ok(list.sessions)
    }

    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<ChatSession, ClientError> {
        let url = self.config.api_url("/sessions");
        let response = self.send(self.http.post(&url).json(&request)).await?;

        let created: SessionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ParseFailed(e.to_string()))?;

        Ok(created.session)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        let url = self.config.api_url(&format!("/sessions/{}", session_id));
        match self.send(self.http.delete(&url)).await {
            Err(ClientError::HttpStatus(StatusCode::NOT_FOUND)) => {
                Err(ClientError::SessionNotFound(session_id.to_string()))
            }
            other => other.map(|_| ()),
        }
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn stream_events(&self, session_id: &str) -> Result<EventStream, ClientError> {
        let url = self.config.api_url("/events");
        let request = self
            .http
            .get(&url)
            .query(&[("sessionId", session_id)])
            .header(ACCEPT, "text/event-stream");
        let response = self
            .add_auth_header(request)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::HttpStatus(response.status()));
        }

        tracing::debug!(session_id = %session_id, "Event stream opened");

        let body = Box::pin(response.bytes_stream());
        let state = (body, SseDecoder::new(), VecDeque::<SseFrame>::new(), false);
        let events = stream::unfold(state, |(mut body, mut decoder, mut queue, mut done)| async move {
            loop {
                if let Some(frame) = queue.pop_front() {
                    return Some((frame.into_agent_event(), (body, decoder, queue, done)));
                }
                if done {
                    return None;
                }
                match body.next().await {
                    Some(Ok(chunk)) => queue.extend(decoder.push(&chunk)),
                    Some(Err(e)) => {
                        done = true;
                        let error = ClientError::Stream(e.to_string());
                        return Some((Err(error), (body, decoder, queue, done)));
                    }
                    None => {
                        done = true;
                        queue.extend(decoder.finish());
                    }
                }
            }
        });

        Ok(Box::pin(events))
    }
}
