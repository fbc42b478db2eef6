//! Request-scoped authentication context.
//!
//! Every business operation receives the authenticated principal explicitly
//! instead of reading it from ambient session state. Role checks are an
//! exhaustive match on [`Role`], so adding a role forces every gate to be revisited.

use crate::{
    entities::{Artisan, Customer, Role, User, artisan, customer, user},
    errors::{Error, Result},
};
use sea_orm::prelude::*;

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl From<&user::Model> for Principal {
    fn from(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Everything an operation needs to know about who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub principal: Principal,
}

impl RequestContext {
    #[must_use]
    pub const fn new(principal: Principal) -> Self {
        Self { principal }
    }

    /// Builds a context for a stored user, e.g. after a successful login.
    #[must_use]
    pub fn for_user(user: &user::Model) -> Self {
        Self::new(Principal::from(user))
    }

    fn require_role(&self, wanted: Role) -> Result<()> {
        let allowed = match (self.principal.role, wanted) {
            (Role::Admin, Role::Admin)
            | (Role::Artisan, Role::Artisan)
            | (Role::Customer, Role::Customer) => true,
            (Role::Admin | Role::Artisan | Role::Customer, _) => false,
        };

        if allowed {
            Ok(())
        } else {
            tracing::warn!(
                user_id = self.principal.user_id,
                role = %self.principal.role,
                "Rejected request requiring role {wanted}"
            );
            Err(Error::unauthorized(format!("{wanted} login required")))
        }
    }

    /// Resolves the caller to their customer profile.
    ///
    /// # Errors
    /// `Unauthorized` if the caller is not a customer, `NotFound` if the profile is missing.
    pub async fn require_customer<C>(&self, db: &C) -> Result<customer::Model>
    where
        C: ConnectionTrait,
    {
        self.require_role(Role::Customer)?;
        Customer::find()
            .filter(customer::Column::UserId.eq(self.principal.user_id))
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Customer profile for user", self.principal.user_id))
    }

    /// Resolves the caller to their artisan profile.
    ///
    /// # Errors
    /// `Unauthorized` if the caller is not an artisan, `NotFound` if the profile is missing.
    pub async fn require_artisan<C>(&self, db: &C) -> Result<artisan::Model>
    where
        C: ConnectionTrait,
    {
        self.require_role(Role::Artisan)?;
        Artisan::find()
            .filter(artisan::Column::UserId.eq(self.principal.user_id))
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Artisan profile for user", self.principal.user_id))
    }

    /// Confirms the caller is an administrator whose account still exists.
    pub async fn require_admin<C>(&self, db: &C) -> Result<user::Model>
    where
        C: ConnectionTrait,
    {
        self.require_role(Role::Admin)?;
        User::find_by_id(self.principal.user_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("User", self.principal.user_id))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn context(role: Role) -> RequestContext {
        RequestContext::new(Principal {
            user_id: 1,
            username: "someone".to_string(),
            role,
        })
    }

    #[tokio::test]
    async fn test_wrong_role_rejected_before_query() -> Result<()> {
        // No query results configured: any database access would fail the test
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = context(Role::Artisan).require_customer(&db).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        let result = context(Role::Customer).require_artisan(&db).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        let result = context(Role::Customer).require_admin(&db).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<customer::Model>::new()])
            .into_connection();

        let result = context(Role::Customer).require_customer(&db).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_resolves_profiles_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let (customer_ctx, customer) = create_test_customer(&db, "buyer").await?;
        let (artisan_ctx, artisan) = create_test_artisan(&db, "maker").await?;

        assert_eq!(customer_ctx.require_customer(&db).await?, customer);
        assert_eq!(artisan_ctx.require_artisan(&db).await?, artisan);
        assert!(artisan_ctx.require_customer(&db).await.is_err());

        Ok(())
    }
}
