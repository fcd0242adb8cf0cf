//! Gateway discovery endpoints

use crate::client::RestClient;
use crate::error::RestResult;
use crate::route::Route;
use serde_json::Value;

impl RestClient {
    /// `GET /gateway`: `{"url": ...}`
    pub async fn get_gateway(&self) -> RestResult<Value> {
        self.request_value(Route::get("/gateway"), None).await
    }

    /// `GET /gateway/bot`: URL plus shard count and session start limits
    pub async fn get_gateway_bot(&self) -> RestResult<Value> {
        self.request_value(Route::get("/gateway/bot"), None).await
    }
}
