//! Index handle

use std::time::Duration;

use algoliasearch_types::{Result, TrafficKind};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use serde_json::{Value, json};
use tracing::debug;

use crate::executor::RequestExecutor;

/// Characters escaped in path segments (RFC 3986 unreserved characters are kept)
const PATH_SEGMENT: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// First delay between task status polls
const TASK_POLL_INITIAL: Duration = Duration::from_millis(100);
/// Upper bound for the delay between task status polls
const TASK_POLL_MAX: Duration = Duration::from_secs(10);

pub(crate) fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// A named index of the application
#[derive(Debug, Clone)]
pub struct Index {
    name: String,
    executor: RequestExecutor,
}

impl Index {
    pub(crate) fn new(name: impl Into<String>, executor: RequestExecutor) -> Self {
        Self { name: name.into(), executor }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn path(&self, suffix: &str) -> String {
        format!("/1/indexes/{}{}", encode_path_segment(&self.name), suffix)
    }

    /// Full-text search
    pub async fn search(&self, query: &str) -> Result<Value> {
        self.search_with_params(query, std::iter::empty::<(&str, &str)>()).await
    }

    /// Search with additional parameters (e.g. `hitsPerPage`, `filters`)
    pub async fn search_with_params<I, K, V>(&self, query: &str, params: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("query", query);
        for (name, value) in params {
            serializer.append_pair(name.as_ref(), value.as_ref());
        }
        let body = json!({ "params": serializer.finish() });

        self.executor
            .execute(Method::POST, &self.path("/query"), Some(&body), TrafficKind::Read)
            .await
    }

    /// Fetch one object by its `objectID`
    pub async fn get_object(&self, object_id: &str) -> Result<Value> {
        let path = self.path(&format!("/{}", encode_path_segment(object_id)));
        self.executor.execute(Method::GET, &path, None, TrafficKind::Read).await
    }

    /// Send a batch of write operations
    ///
    /// Each request is an object with `action` and `body`, e.g.
    /// `{"action": "addObject", "body": {...}}`.
    pub async fn batch(&self, requests: &[Value]) -> Result<Value> {
        let body = json!({ "requests": requests });
        self.executor
            .execute(Method::POST, &self.path("/batch"), Some(&body), TrafficKind::Write)
            .await
    }

    /// Add objects in one batch
    pub async fn add_objects(&self, objects: &[Value]) -> Result<Value> {
        let requests: Vec<Value> =
            objects.iter().map(|object| json!({ "action": "addObject", "body": object })).collect();
        self.batch(&requests).await
    }

    pub async fn set_settings(&self, settings: &Value) -> Result<Value> {
        self.executor
            .execute(Method::PUT, &self.path("/settings"), Some(settings), TrafficKind::Write)
            .await
    }

    pub async fn get_task_status(&self, task_id: i64) -> Result<Value> {
        let path = self.path(&format!("/task/{}", task_id));
        self.executor.execute(Method::GET, &path, None, TrafficKind::Read).await
    }

    /// Poll until the task is published
    ///
    /// Polls start 100ms apart and back off to at most 10s. There is no overall
    /// deadline; wrap the call in `tokio::time::timeout` to bound it.
    pub async fn wait_task(&self, task_id: i64) -> Result<Value> {
        let mut delay = TASK_POLL_INITIAL;
        loop {
            let status = self.get_task_status(task_id).await?;
            if status.get("status").and_then(Value::as_str) == Some("published") {
                return Ok(status);
            }

            debug!(
                index = %self.name,
                task_id = task_id,
                delay_ms = delay.as_millis() as u64,
                "Task not published yet"
            );
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(TASK_POLL_MAX);
        }
    }

    /// Delete this index
    pub async fn delete(&self) -> Result<Value> {
        self.executor.execute(Method::DELETE, &self.path(""), None, TrafficKind::Write).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode_path_segment("products"), "products");
        assert_eq!(encode_path_segment("my index/v2"), "my%20index%2Fv2");
        assert_eq!(encode_path_segment("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(encode_path_segment("été"), "%C3%A9t%C3%A9");
    }
}
