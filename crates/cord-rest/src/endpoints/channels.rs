//! Channel and message endpoints

use crate::client::RestClient;
use crate::error::RestResult;
use crate::route::Route;
use serde_json::{json, Value};

/// Position to page messages from; the API accepts at most one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageAnchor {
    Around(String),
    Before(String),
    After(String),
}

/// Query for `GET /channels/{id}/messages`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagesQuery {
    pub anchor: Option<MessageAnchor>,
    /// 1-100; the API defaults to 50
    pub limit: Option<u8>,
}

impl MessagesQuery {
    #[must_use]
    pub fn around(message_id: impl Into<String>) -> Self {
        Self {
            anchor: Some(MessageAnchor::Around(message_id.into())),
            limit: None,
        }
    }

    #[must_use]
    pub fn before(message_id: impl Into<String>) -> Self {
        Self {
            anchor: Some(MessageAnchor::Before(message_id.into())),
            limit: None,
        }
    }

    #[must_use]
    pub fn after(message_id: impl Into<String>) -> Self {
        Self {
            anchor: Some(MessageAnchor::After(message_id.into())),
            limit: None,
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: u8) -> Self {
        self.limit = Some(limit.clamp(1, 100));
        self
    }

    fn apply(&self, mut route: Route) -> Route {
        match &self.anchor {
            Some(MessageAnchor::Around(id)) => route = route.with_query("around", id),
            Some(MessageAnchor::Before(id)) => route = route.with_query("before", id),
            Some(MessageAnchor::After(id)) => route = route.with_query("after", id),
            None => {}
        }
        if let Some(limit) = self.limit {
            route = route.with_query("limit", limit);
        }
        route
    }
}

impl RestClient {
    /// `GET /channels/{channel_id}`
    pub async fn get_channel(&self, channel_id: &str) -> RestResult<Value> {
        self.request_value(Route::get(format!("/channels/{channel_id}")), None)
            .await
    }

    /// `GET /channels/{channel_id}/messages`
    pub async fn get_channel_messages(
        &self,
        channel_id: &str,
        query: &MessagesQuery,
    ) -> RestResult<Value> {
        let route = query.apply(Route::get(format!("/channels/{channel_id}/messages")));
        self.request_value(route, None).await
    }

    /// `POST /channels/{channel_id}/messages`
    pub async fn create_message(&self, channel_id: &str, content: &str) -> RestResult<Value> {
        let body = json!({ "content": content });
        self.request_value(
            Route::post(format!("/channels/{channel_id}/messages")),
            Some(&body),
        )
        .await
    }

    /// `GET /channels/{channel_id}/messages/{message_id}`
    pub async fn get_channel_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> RestResult<Value> {
        self.request_value(
            Route::get(format!("/channels/{channel_id}/messages/{message_id}")),
            None,
        )
        .await
    }

    /// `PATCH /channels/{channel_id}/messages/{message_id}`: replace the content
    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> RestResult<Value> {
        let body = json!({ "content": content });
        self.request_value(
            Route::patch(format!("/channels/{channel_id}/messages/{message_id}")),
            Some(&body),
        )
        .await
    }

    /// `DELETE /channels/{channel_id}/messages/{message_id}`
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> RestResult<()> {
        self.request_empty(Route::delete(format!(
            "/channels/{channel_id}/messages/{message_id}"
        )))
        .await
    }

    /// `GET /channels/{channel_id}/pins`
    pub async fn get_pinned_messages(&self, channel_id: &str) -> RestResult<Value> {
        self.request_value(Route::get(format!("/channels/{channel_id}/pins")), None)
            .await
    }

    /// `PUT /channels/{channel_id}/pins/{message_id}`
    pub async fn pin_message(&self, channel_id: &str, message_id: &str) -> RestResult<()> {
        self.request_empty(Route::put(format!("/channels/{channel_id}/pins/{message_id}")))
            .await
    }

    /// `DELETE /channels/{channel_id}/pins/{message_id}`
    pub async fn unpin_message(&self, channel_id: &str, message_id: &str) -> RestResult<()> {
        self.request_empty(Route::delete(format!(
            "/channels/{channel_id}/pins/{message_id}"
        )))
        .await
    }
}
