use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthData, LoginRequest, PublicUser, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_dummy, verify_password},
        repo::{StoreError, UserStore},
        repo_types::{NewUser, Role},
    },
    error::AppError,
};

const DUPLICATE_PHONE: &str = "User with this phone number already exists";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const ACCOUNT_DEACTIVATED: &str = "Your account has been deactivated. Please contact support.";
const ROLE_MISMATCH: &str = "You do not have permission to access this role";
const PROFILE_NOT_FOUND: &str = "Invalid token or user not found";

/// validate -> uniqueness check -> hash -> persist -> issue token
pub async fn signup(
    store: &dyn UserStore,
    keys: &JwtKeys,
    payload: SignupRequest,
) -> Result<AuthData, AppError> {
    let input = payload.validate()?;

    if store.find_by_phone(&input.phone_number).await?.is_some() {
        warn!(phone = %input.phone_number, "phone number already registered");
        return Err(AppError::Conflict(DUPLICATE_PHONE.into()));
    }

    let password_hash = hash_password(&input.password)?;

    // The store has the final word on uniqueness; a concurrent signup can still lose here.
    let user = match store
        .insert(NewUser {
            full_name: input.full_name,
            phone_number: input.phone_number,
            address: input.address,
            password_hash,
            role: input.role,
        })
        .await
    {
        Ok(u) => u,
        Err(StoreError::DuplicatePhone) => {
            warn!("duplicate phone rejected by store");
            return Err(AppError::Conflict(DUPLICATE_PHONE.into()));
        }
        Err(StoreError::Backend(e)) => return Err(AppError::Internal(e)),
    };

    let token = keys.sign(user.id).context("sign session token")?;

    info!(user_id = %user.id, role = user.role.as_str(), "user registered");
    Ok(AuthData {
        user: PublicUser::from(user),
        token,
    })
}

/// lookup -> active check -> verify hash -> role check -> issue token
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    payload: LoginRequest,
) -> Result<AuthData, AppError> {
    let input = payload.validate()?;

    let Some(user) = store.find_by_phone(&input.phone_number).await? else {
        verify_dummy(&input.password);
        warn!("login for unknown phone number");
        return Err(AppError::Authentication(INVALID_CREDENTIALS.into()));
    };

    if !user.is_active {
        warn!(user_id = %user.id, "login attempt on deactivated account");
        return Err(AppError::Authentication(ACCOUNT_DEACTIVATED.into()));
    }

    if !verify_password(&input.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Authentication(INVALID_CREDENTIALS.into()));
    }

    if let Some(requested) = input.role.as_deref() {
        // Unknown role names can never match a stored role.
        if requested.parse::<Role>().ok() != Some(user.role) {
            warn!(user_id = %user.id, requested, "login role mismatch");
            return Err(AppError::Authorization(ROLE_MISMATCH.into()));
        }
    }

    let token = keys.sign(user.id).context("sign session token")?;

    info!(user_id = %user.id, "user logged in");
    Ok(AuthData {
        user: PublicUser::from(user),
        token,
    })
}

/// Resolves a verified token subject to an existing, active user.
pub async fn profile(store: &dyn UserStore, user_id: Uuid) -> Result<PublicUser, AppError> {
    match store.find_by_id(user_id).await? {
        Some(user) if user.is_active => Ok(PublicUser::from(user)),
        Some(_) => {
            warn!(%user_id, "profile requested for deactivated account");
            Err(AppError::Authentication(PROFILE_NOT_FOUND.into()))
        }
        None => {
            warn!(%user_id, "profile requested for unknown user");
            Err(AppError::Authentication(PROFILE_NOT_FOUND.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::memory::MemoryUserStore, config::JwtConfig};

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_days: 7,
        })
    }

    fn signup_req(phone: &str) -> SignupRequest {
        SignupRequest {
            full_name: Some("Asha Rao".into()),
            phone_number: Some(phone.into()),
            address: Some("Pune".into()),
            password: Some("secret1".into()),
            role: None,
        }
    }

    fn login_req(phone: &str, password: &str, role: Option<&str>) -> LoginRequest {
        LoginRequest {
            phone_number: Some(phone.into()),
            password: Some(password.into()),
            role: role.map(String::from),
        }
    }

    #[tokio::test]
    async fn distinct_signups_get_distinct_ids_and_tokens() {
        let store = MemoryUserStore::new();
        let keys = keys();
        let a = signup(&store, &keys, signup_req("9876543210")).await.unwrap();
        let b = signup(&store, &keys, signup_req("9876543211")).await.unwrap();
        assert_ne!(a.user.id, b.user.id);
        assert_ne!(a.token, b.token);
        assert_eq!(a.user.role, Role::WarehouseStaff);
        assert!(a.user.is_active);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts_and_keeps_one_record() {
        let store = MemoryUserStore::new();
        let keys = keys();
        signup(&store, &keys, signup_req("9876543210")).await.unwrap();
        let err = signup(&store, &keys, signup_req("9876543210"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn stored_password_is_hashed() {
        let store = MemoryUserStore::new();
        let data = signup(&store, &keys(), signup_req("9876543210")).await.unwrap();
        let stored = store.find_by_id(data.user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret1");
        assert!(verify_password("secret1", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_phone_look_the_same() {
        let store = MemoryUserStore::new();
        let keys = keys();
        signup(&store, &keys, signup_req("9876543210")).await.unwrap();

        let wrong = login(&store, &keys, login_req("9876543210", "nope12", None))
            .await
            .unwrap_err();
        let unknown = login(&store, &keys, login_req("9000000000", "secret1", None))
            .await
            .unwrap_err();
        assert_eq!(wrong.status(), unknown.status());
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.to_string(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn deactivated_account_cannot_login() {
        let store = MemoryUserStore::new();
        let keys = keys();
        let data = signup(&store, &keys, signup_req("9876543210")).await.unwrap();
        store.set_active(data.user.id, false).await;

        let err = login(&store, &keys, login_req("9876543210", "secret1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(ref m) if m == ACCOUNT_DEACTIVATED));
    }

    #[tokio::test]
    async fn role_must_match_when_given() {
        let store = MemoryUserStore::new();
        let keys = keys();
        signup(&store, &keys, signup_req("9876543210")).await.unwrap();

        let err = login(&store, &keys, login_req("9876543210", "secret1", Some("admin")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let err = login(&store, &keys, login_req("9876543210", "secret1", Some("janitor")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        login(&store, &keys, login_req("9876543210", "secret1", Some("warehouse_staff")))
            .await
            .unwrap();
        let ok = login(&store, &keys, login_req("9876543210", "secret1", None))
            .await
            .unwrap();
        assert!(!ok.token.is_empty());
    }

    #[tokio::test]
    async fn login_does_not_touch_updated_at() {
        let store = MemoryUserStore::new();
        let keys = keys();
        let data = signup(&store, &keys, signup_req("9876543210")).await.unwrap();
        login(&store, &keys, login_req("9876543210", "secret1", None))
            .await
            .unwrap();
        let stored = store.find_by_id(data.user.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, data.user.updated_at);
    }

    #[tokio::test]
    async fn profile_requires_active_existing_user() {
        let store = MemoryUserStore::new();
        let data = signup(&store, &keys(), signup_req("9876543210")).await.unwrap();

        let user = profile(&store, data.user.id).await.unwrap();
        assert_eq!(user.phone_number, "9876543210");

        assert!(matches!(
            profile(&store, Uuid::new_v4()).await.unwrap_err(),
            AppError::Authentication(_)
        ));

        store.set_active(data.user.id, false).await;
        assert!(matches!(
            profile(&store, data.user.id).await.unwrap_err(),
            AppError::Authentication(_)
        ));
    }
}
