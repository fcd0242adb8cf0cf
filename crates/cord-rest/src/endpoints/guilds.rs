//! Guild endpoints

use crate::client::RestClient;
use crate::error::RestResult;
use crate::route::Route;
use serde_json::{json, Value};

impl RestClient {
    /// `GET /guilds/{guild_id}`
    pub async fn get_guild(&self, guild_id: &str, with_counts: bool) -> RestResult<Value> {
        let mut route = Route::get(format!("/guilds/{guild_id}"));
        if with_counts {
            route = route.with_query("with_counts", true);
        }
        self.request_value(route, None).await
    }

    /// `GET /guilds/{guild_id}/preview`
    pub async fn get_guild_preview(&self, guild_id: &str) -> RestResult<Value> {
        self.request_value(Route::get(format!("/guilds/{guild_id}/preview")), None)
            .await
    }

    /// `GET /guilds/{guild_id}/channels` (threads excluded)
    pub async fn get_guild_channels(&self, guild_id: &str) -> RestResult<Value> {
        self.request_value(Route::get(format!("/guilds/{guild_id}/channels")), None)
            .await
    }

    /// `GET /guilds/{guild_id}/members`
    pub async fn get_guild_members(&self, guild_id: &str, limit: Option<u16>) -> RestResult<Value> {
        let mut route = Route::get(format!("/guilds/{guild_id}/members"));
        if let Some(limit) = limit {
            route = route.with_query("limit", limit);
        }
        self.request_value(route, None).await
    }

    /// `GET /guilds/{guild_id}/members/{user_id}`
    pub async fn get_guild_member(&self, guild_id: &str, user_id: &str) -> RestResult<Value> {
        self.request_value(
            Route::get(format!("/guilds/{guild_id}/members/{user_id}")),
            None,
        )
        .await
    }

    /// `PATCH /guilds/{guild_id}/members/@me`: set (or clear) the nickname
    pub async fn modify_current_member(
        &self,
        guild_id: &str,
        nick: Option<&str>,
    ) -> RestResult<Value> {
        let body = json!({ "nick": nick });
        self.request_value(
            Route::patch(format!("/guilds/{guild_id}/members/@me")),
            Some(&body),
        )
        .await
    }
}
