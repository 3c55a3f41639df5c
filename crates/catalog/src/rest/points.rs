use foundation::{BoxFuture, PointId};
use reqwest::Method;

use super::{RestClient, single_row};
use crate::error::StoreError;
use crate::point::{MapPoint, PointDraft, PointPatch};
use crate::store::PointStore;

pub struct RestPointStore {
    client: RestClient,
}

impl RestPointStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    fn table(&self) -> &str {
        &self.client.config().points_table
    }
}

fn eq(id: &PointId) -> String {
    format!("eq.{id}")
}

impl PointStore for RestPointStore {
    fn list(&self) -> BoxFuture<'_, Result<Vec<MapPoint>, StoreError>> {
        let req = self
            .client
            .table_request(Method::GET, self.table())
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        Box::pin(async move { self.client.send_rows(req).await })
    }

    fn get<'a>(&'a self, id: &'a PointId) -> BoxFuture<'a, Result<MapPoint, StoreError>> {
        let req = self
            .client
            .table_request(Method::GET, self.table())
            .query(&[("select", "*".to_string()), ("id", eq(id))]);
        Box::pin(async move {
            let rows = self.client.send_rows(req).await?;
            single_row(rows, || format!("map point {id}"))
        })
    }

    fn insert<'a>(
        &'a self,
        draft: &'a PointDraft,
    ) -> BoxFuture<'a, Result<MapPoint, StoreError>> {
        let req = self
            .client
            .table_request(Method::POST, self.table())
            .header("Prefer", "return=representation")
            .json(&[draft]);
        Box::pin(async move {
            let rows = self.client.send_rows(req).await?;
            single_row(rows, || "insert returned no row".to_string())
                .map_err(|e| StoreError::store(e.to_string()))
        })
    }

    fn update<'a>(
        &'a self,
        id: &'a PointId,
        patch: &'a PointPatch,
    ) -> BoxFuture<'a, Result<MapPoint, StoreError>> {
        let req = self
            .client
            .table_request(Method::PATCH, self.table())
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .json(patch);
        Box::pin(async move {
            let rows = self.client.send_rows(req).await?;
            single_row(rows, || format!("map point {id}"))
        })
    }

    fn delete<'a>(&'a self, id: &'a PointId) -> BoxFuture<'a, Result<(), StoreError>> {
        // Ask for the deleted rows back: an empty result means nothing matched.
        let req = self
            .client
            .table_request(Method::DELETE, self.table())
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation");
        Box::pin(async move {
            let rows: Vec<MapPoint> = self.client.send_rows(req).await?;
            single_row(rows, || format!("map point {id}")).map(|_| ())
        })
    }
}
