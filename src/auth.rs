use bcrypt::{hash, verify};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use std::sync::Arc;
use actix_web::web;
use actix_web::HttpMessage;
use validator::Validate;
use actix_web::{HttpRequest, dev::ServiceRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};
use crate::validator::FieldValidator;
use crate::AppState;

// ======== USER MODEL ========

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

// ======== REQUEST/RESPONSE STRUCTS ========

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Email as stored: trimmed and lowercased.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id, the attribute that scopes event reads and writes
    pub email: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

// ======== AUTH SERVICE ========

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_lifetime: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_lifetime: Duration::hours(config.token_expiration_hours),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    pub fn token_lifetime_secs(&self) -> i64 {
        self.token_lifetime.num_seconds()
    }

    pub fn hash_password(&self, password: &str) -> ApiResult<String> {
        FieldValidator::password(password).map_err(ApiError::ValidationError)?;
        hash(password, self.bcrypt_cost)
            .map_err(|_| ApiError::InternalServerError("Failed to hash password".to_string()))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> ApiResult<bool> {
        verify(password, hash)
            .map_err(|_| ApiError::InternalServerError("Password verification failed".to_string()))
    }

    pub fn generate_token(&self, user: &User) -> ApiResult<(String, Claims)> {
        let now = Utc::now();
        let exp = now + self.token_lifetime;

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| ApiError::AuthError("Failed to generate token".to_string()))?;
        Ok((token, claims))
    }

    pub fn verify_token(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::default();
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                match err.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature =>
                        ApiError::AuthError("Token expired".to_string()),
                    jsonwebtoken::errors::ErrorKind::InvalidToken =>
                        ApiError::AuthError("Invalid token".to_string()),
                    _ =>
                        ApiError::AuthError("Token verification failed".to_string()),
                }
            })
    }
}

// ======== USER METHODS ========

impl User {
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn create(
        pool: &SqlitePool,
        credentials: &Credentials,
        auth_service: &AuthService,
    ) -> ApiResult<User> {
        let email = credentials.normalized_email();
        FieldValidator::email(&email).map_err(ApiError::ValidationError)?;

        if User::find_by_email(pool, &email).await?.is_some() {
            return Err(ApiError::email_already_registered(&email));
        }

        let now = Utc::now();
        let password_hash = auth_service.hash_password(&credentials.password)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
            failed_login_attempts: 0,
            locked_until: None,
        };

        sqlx::query(
            r#"INSERT INTO users (
                id, email, password_hash, is_active,
                created_at, updated_at, failed_login_attempts, locked_until
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#
        )
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.is_active as i32)
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(user.failed_login_attempts)
            .bind(user.locked_until)
            .execute(pool)
            .await?;

        Ok(user)
    }

    pub async fn update_last_login(&mut self, pool: &SqlitePool) -> ApiResult<()> {
        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(now)
            .bind(&self.id)
            .execute(pool)
            .await?;
        self.last_login = Some(now);
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        if let Some(locked_until) = self.locked_until {
            Utc::now() < locked_until
        } else {
            false
        }
    }

    pub async fn increment_failed_attempts(&mut self, pool: &SqlitePool) -> ApiResult<()> {
        self.failed_login_attempts += 1;
        sqlx::query("UPDATE users SET failed_login_attempts = ? WHERE id = ?")
            .bind(self.failed_login_attempts)
            .bind(&self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn lock_for_duration(&mut self, pool: &SqlitePool, duration: Duration) -> ApiResult<()> {
        self.locked_until = Some(Utc::now() + duration);
        sqlx::query("UPDATE users SET locked_until = ? WHERE id = ?")
            .bind(self.locked_until)
            .bind(&self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn reset_failed_attempts(&mut self, pool: &SqlitePool) -> ApiResult<()> {
        self.failed_login_attempts = 0;
        self.locked_until = None;
        sqlx::query(
            "UPDATE users SET failed_login_attempts = 0, locked_until = NULL WHERE id = ?"
        )
            .bind(&self.id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// Verifies email and password against the users table, applying the
/// failed-attempt lockout. Shared by the HTTP login and the local identity
/// provider.
pub async fn authenticate(
    pool: &SqlitePool,
    auth_service: &AuthService,
    auth_config: &AuthConfig,
    credentials: &Credentials,
) -> ApiResult<User> {
    let mut user = User::find_by_email(pool, &credentials.normalized_email())
        .await?
        .ok_or_else(ApiError::invalid_credentials)?;

    if !user.is_active {
        return Err(ApiError::AuthError("Account is disabled".to_string()));
    }

    if user.is_locked() {
        return Err(ApiError::AuthError("Account is temporarily locked. Try again later.".to_string()));
    }

    if !auth_service.verify_password(&credentials.password, &user.password_hash)? {
        user.increment_failed_attempts(pool).await?;

        if user.failed_login_attempts >= auth_config.max_login_attempts {
            user.lock_for_duration(pool, Duration::minutes(auth_config.lockout_duration_minutes)).await?;
            log::warn!("User {} locked after {} failed attempts", user.email, user.failed_login_attempts);
            return Err(ApiError::AuthError(format!(
                "Account locked due to too many failed attempts. Try again in {} minutes.",
                auth_config.lockout_duration_minutes
            )));
        }

        return Err(ApiError::invalid_credentials());
    }

    if user.failed_login_attempts > 0 || user.locked_until.is_some() {
        user.reset_failed_attempts(pool).await?;
    }
    user.update_last_login(pool).await?;

    Ok(user)
}

// ======== TOKEN REVOCATION ========

pub async fn revoke_token(pool: &SqlitePool, claims: &Claims) -> ApiResult<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO revoked_tokens (jti, user_id, expires_at, revoked_at) VALUES (?, ?, ?, ?)"
    )
        .bind(&claims.jti)
        .bind(&claims.sub)
        .bind(claims.expires_at())
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn is_token_revoked(pool: &SqlitePool, jti: &str) -> ApiResult<bool> {
    let revoked: Option<(String,)> = sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = ?")
        .bind(jti)
        .fetch_optional(pool)
        .await?;
    Ok(revoked.is_some())
}

/// Drops revocation rows whose token has expired anyway.
pub async fn purge_expired_revocations(pool: &SqlitePool) -> ApiResult<u64> {
    let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ======== HELPER FUNCTIONS ========

pub fn get_current_user(req: &HttpRequest) -> ApiResult<Claims> {
    req.extensions()
        .get::<Claims>().cloned()
        .ok_or_else(ApiError::session_required)
}

// ======== JWT MIDDLEWARE ========

pub async fn jwt_middleware(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let token = credentials.token();

    let auth_service = match req.app_data::<web::Data<Arc<AuthService>>>() {
        Some(svc) => svc.clone(),
        None => {
            log::error!("AuthService not found in app data");
            return Err((
                ApiError::InternalServerError("Auth service not available".to_string()).into(),
                req,
            ));
        }
    };

    let claims = match auth_service.verify_token(token) {
        Ok(claims) => claims,
        Err(err) => {
            log::warn!("JWT verification failed: {}", err);
            return Err((err.into(), req));
        }
    };

    let pool = req
        .app_data::<web::Data<Arc<AppState>>>()
        .map(|state| state.db_pool.clone());

    if let Some(pool) = pool {
        match is_token_revoked(&pool, &claims.jti).await {
            Ok(false) => {}
            Ok(true) => {
                return Err((ApiError::AuthError("Session has been signed out".to_string()).into(), req));
            }
            Err(err) => {
                log::error!("Revocation check failed: {}", err);
                return Err((err.into(), req));
            }
        }
    }

    req.extensions_mut().insert(claims);
    Ok(req)
}
