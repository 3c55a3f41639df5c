use foundation::{BoxFuture, UserId};
use reqwest::Method;
use serde::Serialize;

use super::{RestClient, single_row};
use crate::error::StoreError;
use crate::settings::{SettingsDefaults, SettingsPatch, UserSettings};
use crate::store::SettingsStore;

pub struct RestSettingsStore {
    client: RestClient,
}

impl RestSettingsStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    fn table(&self) -> &str {
        &self.client.config().settings_table
    }
}

#[derive(Serialize)]
struct NewSettingsRow<'a> {
    user_id: &'a UserId,
    #[serde(flatten)]
    preferences: &'a SettingsDefaults,
}

impl SettingsStore for RestSettingsStore {
    fn find<'a>(
        &'a self,
        user: &'a UserId,
    ) -> BoxFuture<'a, Result<Option<UserSettings>, StoreError>> {
        let req = self
            .client
            .table_request(Method::GET, self.table())
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user}")),
                ("limit", "1".to_string()),
            ]);
        Box::pin(async move {
            let rows: Vec<UserSettings> = self.client.send_rows(req).await?;
            Ok(rows.into_iter().next())
        })
    }

    fn insert<'a>(
        &'a self,
        user: &'a UserId,
        preferences: &'a SettingsDefaults,
    ) -> BoxFuture<'a, Result<UserSettings, StoreError>> {
        let row = NewSettingsRow {
            user_id: user,
            preferences,
        };
        let req = self
            .client
            .table_request(Method::POST, self.table())
            .header("Prefer", "return=representation")
            .json(&[row]);
        Box::pin(async move {
            let rows = self.client.send_rows(req).await?;
            single_row(rows, || "insert returned no row".to_string())
                .map_err(|e| StoreError::store(e.to_string()))
        })
    }

    fn update<'a>(
        &'a self,
        user: &'a UserId,
        patch: &'a SettingsPatch,
    ) -> BoxFuture<'a, Result<UserSettings, StoreError>> {
        let req = self
            .client
            .table_request(Method::PATCH, self.table())
            .query(&[("user_id", format!("eq.{user}"))])
            .header("Prefer", "return=representation")
            .json(patch);
        Box::pin(async move {
            let rows = self.client.send_rows(req).await?;
            single_row(rows, || format!("settings for user {user}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::NewSettingsRow;
    use crate::settings::SettingsDefaults;

    #[test]
    fn new_row_flattens_preferences() {
        let user = "u-1".into();
        let prefs = SettingsDefaults::default();
        let json = serde_json::to_value(NewSettingsRow {
            user_id: &user,
            preferences: &prefs,
        })
        .unwrap();
        assert_eq!(json["user_id"], "u-1");
        assert_eq!(json["default_zoom"], 8.0);
        assert_eq!(json["map_style"], "mapbox://styles/mapbox/streets-v12");
    }
}
