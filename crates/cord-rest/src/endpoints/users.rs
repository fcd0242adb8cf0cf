//! User endpoints

use crate::client::RestClient;
use crate::error::RestResult;
use crate::route::Route;
use serde_json::{json, Value};

impl RestClient {
    /// `GET /users/{user_id}`
    pub async fn get_user(&self, user_id: &str) -> RestResult<Value> {
        self.request_value(Route::get(format!("/users/{user_id}")), None)
            .await
    }

    /// `GET /users/@me`
    pub async fn get_current_user(&self) -> RestResult<Value> {
        self.request_value(Route::get("/users/@me"), None).await
    }

    /// `PATCH /users/@me` with `username` and/or `avatar`
    pub async fn edit_current_user(&self, changes: &Value) -> RestResult<Value> {
        self.request_value(Route::patch("/users/@me"), Some(changes))
            .await
    }

    /// `GET /users/@me/guilds`
    pub async fn get_current_user_guilds(&self) -> RestResult<Value> {
        self.request_value(Route::get("/users/@me/guilds"), None)
            .await
    }

    /// `GET /users/@me/guilds/{guild_id}/member`
    pub async fn get_current_user_guild_member(&self, guild_id: &str) -> RestResult<Value> {
        self.request_value(
            Route::get(format!("/users/@me/guilds/{guild_id}/member")),
            None,
        )
        .await
    }

    /// `DELETE /users/@me/guilds/{guild_id}`
    pub async fn leave_guild(&self, guild_id: &str) -> RestResult<()> {
        self.request_empty(Route::delete(format!("/users/@me/guilds/{guild_id}")))
            .await
    }

    /// `POST /users/@me/channels`: open a DM channel with `recipient_id`
    pub async fn create_dm(&self, recipient_id: &str) -> RestResult<Value> {
        let body = json!({ "recipient_id": recipient_id });
        self.request_value(Route::post("/users/@me/channels"), Some(&body))
            .await
    }
}
