//! User accounts and access tokens
//!
//! Accounts are stored in SQLite so they survive restarts. Passwords are
//! hashed with argon2; tokens are HS256 JWTs carrying the username and id.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::access::{AccessRequest, CredentialVerifier, Identity};
use crate::config::{AuthConfig, MAX_TOKEN_TTL_MINUTES};
use crate::error::ApiError;
use crate::state::AppState;

/// Authentication failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,

    #[error("{0}")]
    InvalidEmail(String),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("User not found")]
    UnknownUser,

    #[error("user store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("authentication error: {0}")]
    Internal(String),
}

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_admin: bool,
}

/// Stored account, including the password hash
#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    full_name TEXT,
    is_admin INTEGER NOT NULL DEFAULT 0,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

/// SQLite account store. Usernames are case-sensitive, emails are not.
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    /// Open (or create) the store named by a database url.
    ///
    /// Accepts a plain path, `sqlite:///relative.db`, `sqlite:////abs/path.db`
    /// or `:memory:`.
    pub fn open(url: &str) -> Result<Self, AuthError> {
        let path = sqlite_path(url);
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(Path::new(path))?
        };
        conn.execute_batch(SCHEMA)?;

        debug!("Opened user store at {}", path);
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// A private store that lives as long as the process
    pub fn in_memory() -> Result<Self, AuthError> {
        Self::open(":memory:")
    }

    /// Insert a new account, enforcing unique username and email
    fn insert(&self, record: UserRecord) -> Result<User, AuthError> {
        let conn = self.conn.lock();

        let username_taken = conn
            .query_row(
                "SELECT 1 FROM users WHERE username = ?1",
                params![record.user.username],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if username_taken {
            return Err(AuthError::UsernameTaken);
        }

        let email_taken = conn
            .query_row(
                "SELECT 1 FROM users WHERE email = ?1",
                params![record.user.email],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if email_taken {
            return Err(AuthError::EmailTaken);
        }

        conn.execute(
            "INSERT INTO users (id, username, email, full_name, is_admin, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.user.id.to_string(),
                record.user.username,
                record.user.email,
                record.user.full_name,
                record.user.is_admin,
                record.password_hash,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(record.user)
    }

    fn find(&self, username: &str) -> Result<Option<UserRecord>, AuthError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, username, email, full_name, is_admin, password_hash
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        UserRecord {
                            user: User {
                                id: Uuid::nil(),
                                username: row.get(1)?,
                                email: row.get(2)?,
                                full_name: row.get(3)?,
                                is_admin: row.get(4)?,
                            },
                            password_hash: row.get(5)?,
                        },
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, mut record)) => {
                record.user.id = Uuid::parse_str(&id)
                    .map_err(|e| AuthError::Internal(format!("stored id for '{}' is not a uuid: {}", username, e)))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub fn get(&self, username: &str) -> Result<Option<User>, AuthError> {
        Ok(self.find(username)?.map(|r| r.user))
    }

    /// Number of registered accounts
    pub fn count(&self) -> Result<usize, AuthError> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }
}

fn sqlite_path(url: &str) -> &str {
    url.strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .unwrap_or(url)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, alias = "full_name")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub id: String,
    pub exp: usize,
    pub iat: usize,
}

/// Account registration, login and token verification
pub struct AuthService {
    store: UserStore,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(config: &AuthConfig, store: UserStore) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            token_ttl: Duration::minutes(config.token_ttl_minutes.clamp(1, MAX_TOKEN_TTL_MINUTES)),
        }
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    /// Register an account. Hashing is CPU-heavy; call from a blocking task.
    pub fn signup(&self, req: SignupRequest) -> Result<User, AuthError> {
        let username = req.username.trim().to_string();
        if username.is_empty() {
            return Err(AuthError::EmptyField("username"));
        }
        if req.password.is_empty() {
            return Err(AuthError::EmptyField("password"));
        }
        validate_email(&req.email)?;

        // insert re-checks while holding the connection
        if self.store.find(&username)?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .to_string();

        let user = self.store.insert(UserRecord {
            user: User {
                id: Uuid::new_v4(),
                username,
                email: req.email.trim().to_string(),
                full_name: req.full_name,
                is_admin: false,
            },
            password_hash,
        })?;

        info!(user_id = %user.id, "Registered user {}", user.username);
        Ok(user)
    }

    /// Check a password and issue an access token
    pub fn login(&self, req: &LoginRequest) -> Result<TokenResponse, AuthError> {
        let record = self
            .store
            .find(req.username.trim())?
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed_hash =
            PasswordHash::new(&record.password_hash).map_err(|e| AuthError::Internal(e.to_string()))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let access_token = self.issue_token(&record.user)?;
        debug!(user_id = %record.user.id, "Issued access token");

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Issue a token for an existing account
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.username.clone(),
            id: user.id.to_string(),
            exp: (now + self.token_ttl).timestamp().max(0) as usize,
            iat: now.timestamp().max(0) as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Validate a token and resolve the account it names
    pub fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?;

        let user = self
            .store
            .get(&data.claims.sub)?
            .ok_or(AuthError::UnknownUser)?;

        // A re-registered username gets a fresh id; old tokens must not carry over
        if user.id.to_string() != data.claims.id {
            return Err(AuthError::InvalidToken);
        }

        Ok(user)
    }
}

impl CredentialVerifier for AuthService {
    fn verify(&self, token: &str) -> Option<Identity> {
        match self.authenticate(token) {
            Ok(user) => Some(Identity {
                user_id: user.id,
                username: user.username,
            }),
            Err(e) => {
                debug!("Bearer credential rejected: {}", e);
                None
            }
        }
    }
}

/// HTML5-style address check, plus a dotted domain so `coach@localhost` is refused
fn validate_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim().to_string();
    let dotted_domain = email
        .rsplit_once('@')
        .is_some_and(|(_, domain)| domain.contains('.'));

    if email.validate_email() && dotted_domain {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail(format!("invalid email address: {}", email)))
    }
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let auth = state.auth.clone();

    let user = tokio::task::spawn_blocking(move || auth.signup(req))
        .await
        .map_err(|e| ApiError::Defect(format!("signup task failed: {}", e)))??;

    Ok(Json(user))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let auth = state.auth.clone();

    let token = tokio::task::spawn_blocking(move || auth.login(&req))
        .await
        .map_err(|e| ApiError::Defect(format!("login task failed: {}", e)))??;

    Ok(Json(token))
}

/// GET /auth/me; a bearer credential is required, the guest marker is not enough
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>, ApiError> {
    let request = AccessRequest::from_headers(&headers, &state.config.auth.guest_header);
    let token = request
        .bearer
        .ok_or_else(|| ApiError::Denied("Not authenticated".to_string()))?;

    Ok(Json(state.auth.authenticate(&token)?))
}
