//! User and role administration.
//!
//! Thin forwarding to the backend's auth API. Grants are additive and
//! revokes subtractive; nothing here rewrites a user's role list or a
//! role's permission list wholesale. Lookups keyed by a name that does
//! not exist return `Ok(None)`.

use std::sync::Arc;

use etcdash_backend::{AuthStatus, EtcdBackend, Permission, Role, User};
use tracing::info;

use crate::Success;
use crate::error::{ConsoleError, ConsoleResultExt};
use crate::validate;

/// A new user as submitted by the add-user form.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub password: String,
    pub password_confirmation: Option<String>,
    pub roles: Vec<String>,
}

/// Users, roles, and permissions.
pub struct AuthAdmin {
    backend: Arc<dyn EtcdBackend>,
}

impl AuthAdmin {
    #[must_use]
    pub fn new(backend: Arc<dyn EtcdBackend>) -> Self {
        Self { backend }
    }

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] if the status cannot be
    /// determined.
    pub async fn auth_status(&self) -> Result<AuthStatus, ConsoleError> {
        Ok(self.backend.auth_status().await?)
    }

    // ── Users ────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] on any failure except
    /// not-found, which yields an empty list.
    pub async fn get_users(&self) -> Result<Vec<User>, ConsoleError> {
        self.backend.users().await.or_not_found(Vec::new())
    }

    /// Create a user and grant it the listed roles. Blank role names are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a blank name, an empty
    /// password, or a mismatched confirmation; otherwise a normalized
    /// backend error (e.g. the user already exists).
    pub async fn add_user(&self, user: NewUser) -> Result<User, ConsoleError> {
        let name = validate::name("user", &user.name)?;
        validate::password(&user.password, user.password_confirmation.as_deref())?;
        let roles: Vec<String> = user
            .roles
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_owned)
            .collect();

        let created = self.backend.add_user(&name, &user.password, &roles).await?;
        info!(user = %created.name, roles = ?created.roles, "user added");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] (`NOT_FOUND` if the user does
    /// not exist).
    pub async fn delete_user(&self, name: &str) -> Result<Success, ConsoleError> {
        let name = validate::name("user", name)?;
        self.backend.delete_user(&name).await?;
        info!(user = %name, "user deleted");
        Ok(Success::ok())
    }

    /// Grant `role` to `user`. `Ok(None)` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for blank names, or a
    /// normalized backend error.
    pub async fn grant_user_role(
        &self,
        user: &str,
        role: &str,
    ) -> Result<Option<User>, ConsoleError> {
        let user = validate::name("user", user)?;
        let role = validate::name("role", role)?;
        let updated = self.backend.grant_user_role(&user, &role).await?;
        if updated.is_some() {
            info!(user = %user, role = %role, "role granted");
        }
        Ok(updated)
    }

    /// Revoke `role` from `user`. `Ok(None)` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for blank names, or a
    /// normalized backend error.
    pub async fn revoke_user_role(
        &self,
        user: &str,
        role: &str,
    ) -> Result<Option<User>, ConsoleError> {
        let user = validate::name("user", user)?;
        let role = validate::name("role", role)?;
        let updated = self.backend.revoke_user_role(&user, &role).await?;
        if updated.is_some() {
            info!(user = %user, role = %role, "role revoked");
        }
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for an empty password or a
    /// mismatched confirmation, or a normalized backend error.
    pub async fn change_password(
        &self,
        user: &str,
        password: &str,
        confirmation: Option<&str>,
    ) -> Result<Success, ConsoleError> {
        let user = validate::name("user", user)?;
        validate::password(password, confirmation)?;
        self.backend.change_password(&user, password).await?;
        info!(user = %user, "password changed");
        Ok(Success::ok())
    }

    // ── Roles ────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] on any failure except
    /// not-found, which yields an empty list.
    pub async fn get_roles(&self) -> Result<Vec<Role>, ConsoleError> {
        self.backend.roles().await.or_not_found(Vec::new())
    }

    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a blank name, or a
    /// normalized backend error.
    pub async fn add_role(&self, name: &str) -> Result<Role, ConsoleError> {
        let name = validate::name("role", name)?;
        let role = self.backend.add_role(&name).await?;
        info!(role = %role.name, "role added");
        Ok(role)
    }

    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] (`NOT_FOUND` if the role does
    /// not exist).
    pub async fn delete_role(&self, name: &str) -> Result<Success, ConsoleError> {
        let name = validate::name("role", name)?;
        self.backend.delete_role(&name).await?;
        info!(role = %name, "role deleted");
        Ok(Success::ok())
    }

    /// `Ok(None)` if the role does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a blank role name or
    /// permission key, or a normalized backend error.
    pub async fn grant_permission(
        &self,
        role: &str,
        permission: &Permission,
    ) -> Result<Option<Role>, ConsoleError> {
        let role = validate::name("role", role)?;
        validate::permission(permission)?;
        let updated = self.backend.grant_permission(&role, permission).await?;
        if updated.is_some() {
            info!(role = %role, key = %permission.key, perm = %permission.perm_type, "permission granted");
        }
        Ok(updated)
    }

    /// `Ok(None)` if the role does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for a blank role name or
    /// permission key, or a normalized backend error.
    pub async fn revoke_permission(
        &self,
        role: &str,
        permission: &Permission,
    ) -> Result<Option<Role>, ConsoleError> {
        let role = validate::name("role", role)?;
        validate::permission(permission)?;
        let updated = self.backend.revoke_permission(&role, permission).await?;
        if updated.is_some() {
            info!(role = %role, key = %permission.key, "permission revoked");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use etcdash_backend::{DemoConfig, MemoryBackend, PermissionType};

    use super::*;
    use crate::error::ErrorCode;

    fn admin() -> AuthAdmin {
        AuthAdmin::new(Arc::new(MemoryBackend::demo(DemoConfig::default())))
    }

    #[tokio::test]
    async fn added_user_is_listed_with_roles() {
        let admin = admin();
        admin
            .add_user(NewUser {
                name: " carol ".to_owned(),
                password: "pw".to_owned(),
                password_confirmation: Some("pw".to_owned()),
                roles: vec!["reader".to_owned(), " ".to_owned()],
            })
            .await
            .unwrap();

        let users = admin.get_users().await.unwrap();
        let carol = users.iter().find(|u| u.name == "carol").unwrap();
        assert_eq!(carol.roles, vec!["reader"]);
    }

    #[tokio::test]
    async fn add_user_rejects_mismatched_confirmation() {
        let err = admin()
            .add_user(NewUser {
                name: "dave".to_owned(),
                password: "one".to_owned(),
                password_confirmation: Some("two".to_owned()),
                roles: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn duplicate_user_is_an_etcd_error() {
        let err = admin()
            .add_user(NewUser {
                name: "root".to_owned(),
                password: "pw".to_owned(),
                ..NewUser::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::EtcdError));
    }

    #[tokio::test]
    async fn grant_to_missing_user_is_none_and_leaves_users_alone() {
        let admin = admin();
        let before = admin.get_users().await.unwrap();
        assert!(admin.grant_user_role("ghost", "reader").await.unwrap().is_none());
        assert_eq!(admin.get_users().await.unwrap(), before);
    }

    #[tokio::test]
    async fn grant_then_revoke_role() {
        let admin = admin();
        let user = admin.grant_user_role("app-reader", "writer").await.unwrap().unwrap();
        assert!(user.roles.contains(&"writer".to_owned()));

        let user = admin.revoke_user_role("app-reader", "writer").await.unwrap().unwrap();
        assert!(!user.roles.contains(&"writer".to_owned()));
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let err = admin().delete_user("ghost").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn change_password_validates_confirmation() {
        let admin = admin();
        assert!(admin.change_password("root", "new", Some("new")).await.is_ok());
        assert!(admin.change_password("root", "new", Some("old")).await.is_err());
        assert!(admin.change_password("root", "", None).await.is_err());
    }

    #[tokio::test]
    async fn role_lifecycle_with_permissions() {
        let admin = admin();
        admin.add_role("auditor").await.unwrap();

        let perm = Permission {
            perm_type: PermissionType::Read,
            key: "/audit/".to_owned(),
            range_end: None,
            prefix: Some(true),
        };
        let role = admin.grant_permission("auditor", &perm).await.unwrap().unwrap();
        assert_eq!(role.permissions, vec![perm.clone()]);

        let role = admin.revoke_permission("auditor", &perm).await.unwrap().unwrap();
        assert!(role.permissions.is_empty());

        assert!(admin.grant_permission("ghost", &perm).await.unwrap().is_none());
        admin.delete_role("auditor").await.unwrap();
        assert!(admin.get_roles().await.unwrap().iter().all(|r| r.name != "auditor"));
    }

    #[tokio::test]
    async fn auth_status_reflects_backend() {
        let backend = MemoryBackend::new();
        let admin = AuthAdmin::new(Arc::new(backend.clone()));
        assert!(!admin.auth_status().await.unwrap().enabled);
        backend.set_auth_enabled(true).await;
        assert!(admin.auth_status().await.unwrap().enabled);
    }
}
