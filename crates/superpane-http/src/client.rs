use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::collections::VecDeque;
use std::time::Duration;
use superpane_api::{
    DocumentStore, GroqParams, MutationEvent, MutationStream, PaneError, Query, QueryResult,
    Result, Selection,
};
use tracing::{debug, info};

use crate::config::HttpStoreConfig;
use crate::decode::{decode, QueryResponse};
use crate::sse::{ListenMessage, SseDecoder};

const MAX_ERROR_BODY: usize = 500;

/// Document store backed by the HTTP query and listen endpoints.
pub struct HttpStore {
    client: reqwest::Client,
    // No overall timeout: listen responses stay open indefinitely
    listen_client: reqwest::Client,
    query_url: String,
    listen_url: String,
}

impl HttpStore {
    pub fn new(config: HttpStoreConfig) -> Result<Self> {
        let query_url = config.query_url()?;
        let listen_url = config.listen_url()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| PaneError::fetch(format!("Invalid API token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .default_headers(headers.clone())
            .timeout(timeout)
            .build()
            .map_err(|e| PaneError::fetch(format!("Failed to create HTTP client: {}", e)))?;
        let listen_client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| PaneError::fetch(format!("Failed to create HTTP client: {}", e)))?;

        info!(url = %query_url, "HTTP document store ready");
        Ok(Self {
            client,
            listen_client,
            query_url,
            listen_url,
        })
    }
}

/// `query` plus one JSON-encoded `$name` argument per bound parameter.
pub fn query_params(text: String, params: GroqParams) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(params.len() + 1);
    out.push(("query".to_string(), text));
    for (name, value) in params {
        out.push((format!("${}", name), value.to_string()));
    }
    out
}

fn describe(e: &reqwest::Error, url: &str, operation: &str) -> String {
    if e.is_timeout() {
        format!("Failed to {} {}: timeout", operation, url)
    } else if e.is_connect() {
        format!("Failed to {} {}: connection error: {}", operation, url, e)
    } else if e.is_decode() {
        format!("Failed to {} {}: unexpected response body: {}", operation, url, e)
    } else {
        format!("Failed to {} {}: {}", operation, url, e)
    }
}

fn truncate(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn fetch(&self, query: &Query) -> Result<QueryResult> {
        let (text, params) = query.to_groq();
        debug!(query = %text, "GROQ query");
        let response = self
            .client
            .get(&self.query_url)
            .query(&query_params(text, params))
            .send()
            .await
            .map_err(|e| PaneError::fetch(describe(&e, &self.query_url, "query")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaneError::fetch(describe(&e, &self.query_url, "read")))?;
        if !status.is_success() {
            return Err(PaneError::fetch(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                self.query_url,
                truncate(&body)
            )));
        }

        let response: QueryResponse = serde_json::from_str(&body)
            .map_err(|e| PaneError::fetch(format!("Failed to parse query response: {}", e)))?;
        if let Some(ms) = response.ms {
            debug!(ms, "query served");
        }
        decode(query, response.result)
    }

    async fn listen(&self, selection: &Selection) -> Result<MutationStream> {
        let (text, params) = selection.to_groq();
        let mut args = query_params(text, params);
        args.push(("includeResult".to_string(), "false".to_string()));

        let response = self
            .listen_client
            .get(&self.listen_url)
            .header("Accept", "text/event-stream")
            .query(&args)
            .send()
            .await
            .map_err(|e| PaneError::subscription(describe(&e, &self.listen_url, "listen")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PaneError::subscription(format!(
                "HTTP {} from {}",
                status.as_u16(),
                self.listen_url
            )));
        }
        debug!(url = %self.listen_url, "listening for mutations");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Ok(Box::pin(mutations(body)))
    }
}

struct ListenState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<MutationEvent>>,
    finished: bool,
}

fn mutations(
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
) -> impl futures::Stream<Item = Result<MutationEvent>> + Send + 'static {
    let state = ListenState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for event in state.decoder.push(&chunk) {
                        let message = ListenMessage::from_event(&event);
                        if message == ListenMessage::Disconnect {
                            debug!("listen channel closed by server");
                            state.finished = true;
                            break;
                        }
                        if let Some(item) = message.into_item() {
                            state.pending.push_back(item);
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.push_back(Err(PaneError::subscription(format!(
                        "Listen stream failed: {}",
                        e
                    ))));
                }
                None => state.finished = true,
            }
        }
    })
}
