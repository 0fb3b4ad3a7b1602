//! Identity service: password hashing and session tokens.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use markaz_common::{AppError, AppResult, IdGenerator, config::AuthConfig};
use markaz_db::{
    entities::user::{self, UserRole},
    repositories::{UserRepository, normalize_email},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Identity service for authentication.
#[derive(Clone)]
pub struct IdentityService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_hours: i64,
}

impl IdentityService {
    /// Create a new identity service.
    #[must_use]
    pub fn new(user_repo: UserRepository, config: &AuthConfig) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_ttl_hours: config.token_ttl_hours,
        }
    }

    /// Sign a session token for `user`.
    pub fn issue_token(&self, user: &user::Model) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: now,
            exp: now + self.token_ttl_hours * 3600,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify a session token and return its claims.
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }

    /// Authenticate by email and password.
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(user::Model, String)> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::Unauthorized);
        }

        let token = self.issue_token(&user)?;
        info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// Resolve the user behind a verified token.
    pub async fn me(&self, claims: &Claims) -> AppResult<user::Model> {
        self.user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Create an administrator account unless one with `email` exists.
    ///
    /// Returns `true` when an account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str, name: &str) -> AppResult<bool> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            return Ok(false);
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(normalize_email(email)),
            name: Set(name.to_string()),
            password_hash: Set(hash_password(password)?),
            role: Set(UserRole::Admin),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let admin = self.user_repo.create(model).await?;
        info!(user_id = %admin.id, email = %admin.email, "Created bootstrap administrator");
        Ok(true)
    }
}

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 24,
            cookie_name: "auth_token".to_string(),
            secure_cookie: false,
            bootstrap_admin: None,
        }
    }

    fn create_test_user(password_hash: String, role: UserRole) -> user::Model {
        user::Model {
            id: "user1".to_string(),
            email: "parent@example.com".to_string(),
            name: "Aisyah".to_string(),
            password_hash,
            role,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> IdentityService {
        let repo = UserRepository::new(Arc::new(db.into_connection()));
        IdentityService::new(repo, &auth_config())
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("bismillah123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("bismillah123", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("bismillah123").unwrap();
        let b = hash_password("bismillah123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_round_trip() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let user = create_test_user(String::new(), UserRole::Admin);

        let token = svc.issue_token(&user).unwrap();
        let claims = svc.verify_token(&token).unwrap();

        assert_eq!(claims.sub, "user1");
        assert_eq!(claims.email, "parent@example.com");
        assert!(claims.is_admin());
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let user = create_test_user(String::new(), UserRole::Student);

        let mut token = svc.issue_token(&user).unwrap();
        token.push('x');

        assert!(matches!(svc.verify_token(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let mut other_config = auth_config();
        other_config.jwt_secret = "another-secret".to_string();
        let other = IdentityService::new(
            UserRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            &other_config,
        );

        let token = other
            .issue_token(&create_test_user(String::new(), UserRole::Admin))
            .unwrap();
        assert!(svc.verify_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user1".to_string(),
            email: "parent@example.com".to_string(),
            name: "Aisyah".to_string(),
            role: UserRole::Admin,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(svc.verify_token(&token), Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_success() {
        let hash = hash_password("bismillah123").unwrap();
        let user = create_test_user(hash, UserRole::Student);

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user.clone()]]),
        );

        let (found, token) = svc.login("Parent@Example.com", "bismillah123").await.unwrap();
        assert_eq!(found.id, "user1");
        assert_eq!(svc.verify_token(&token).unwrap().sub, "user1");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let hash = hash_password("bismillah123").unwrap();
        let user = create_test_user(hash, UserRole::Student);

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user.clone()]]),
        );

        let result = svc.login("parent@example.com", "not-the-password").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = svc.login("nobody@example.com", "bismillah123").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_me_for_deleted_user() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );
        let token = svc
            .issue_token(&create_test_user(String::new(), UserRole::Student))
            .unwrap();
        let claims = svc.verify_token(&token).unwrap();

        assert!(matches!(svc.me(&claims).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_ensure_admin_existing() {
        let user = create_test_user(String::new(), UserRole::Admin);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user.clone()]]),
        );

        assert!(!svc.ensure_admin("parent@example.com", "secret123", "Admin").await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_admin_creates_account() {
        let admin = create_test_user(String::new(), UserRole::Admin);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[admin.clone()]]),
        );

        assert!(svc.ensure_admin("admin@example.com", "secret123", "Admin").await.unwrap());
    }
}
