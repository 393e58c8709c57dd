//! User repository implementation

use std::sync::Arc;
use uuid::Uuid;
use crate::gateway::{Gateway, Query, Table};
use crate::models::user::UserProfile;
use crate::utils::errors::EventHubError;
use super::decode_rows;

#[derive(Clone)]
pub struct UserRepository {
    gateway: Arc<dyn Gateway>,
}

impl UserRepository {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, EventHubError> {
        let rows = self
            .gateway
            .select(Table::Users, Query::all().eq("id", id.to_string()))
            .await?;

        Ok(decode_rows::<UserProfile>(Table::Users, rows)?.into_iter().next())
    }

    /// List users for the admin view
    pub async fn list(&self) -> Result<Vec<UserProfile>, EventHubError> {
        let rows = self
            .gateway
            .select(
                Table::Users,
                Query::all()
                    .columns("id,email,role,full_name,avatar_url,created_at")
                    .order_by("email", true),
            )
            .await?;

        Ok(decode_rows(Table::Users, rows)?)
    }
}
