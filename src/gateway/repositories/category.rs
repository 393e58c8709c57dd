//! Category repository implementation

use std::sync::Arc;
use crate::gateway::{Gateway, Query, Table};
use crate::models::category::Category;
use crate::utils::errors::EventHubError;
use super::decode_rows;

#[derive(Clone)]
pub struct CategoryRepository {
    gateway: Arc<dyn Gateway>,
}

impl CategoryRepository {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// List categories ordered by name
    pub async fn list(&self) -> Result<Vec<Category>, EventHubError> {
        let rows = self
            .gateway
            .select(Table::Categories, Query::all().order_by("name", true))
            .await?;

        Ok(decode_rows(Table::Categories, rows)?)
    }

    /// Find category by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Category>, EventHubError> {
        let rows = self
            .gateway
            .select(Table::Categories, Query::all().eq("id", id))
            .await?;

        Ok(decode_rows::<Category>(Table::Categories, rows)?.into_iter().next())
    }
}
