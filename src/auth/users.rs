use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{AuthError, AuthResult};
use crate::core::OwnerId;
use crate::storage::SnapshotFile;

const MIN_PASSWORD_LEN: usize = 6;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    id: Uuid,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn owner_id(&self) -> OwnerId {
        OwnerId::new(self.id.to_string())
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Registered users, keyed by normalised email.
pub struct UserDirectory {
    users: RwLock<HashMap<String, UserAccount>>,
    bcrypt_cost: u32,
    snapshot: Option<SnapshotFile>,
}

impl UserDirectory {
    pub const FILE_NAME: &'static str = "users.snapshot";

    pub fn new(bcrypt_cost: u32) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            bcrypt_cost,
            snapshot: None,
        }
    }

    /// Loads users from `data_dir` and saves every signup back to it.
    pub fn open<P: AsRef<Path>>(data_dir: P, bcrypt_cost: u32) -> AuthResult<Self> {
        let file = SnapshotFile::new(data_dir.as_ref().join(Self::FILE_NAME));
        let accounts: Vec<UserAccount> = file
            .load()
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .unwrap_or_default();
        info!(users = accounts.len(), "loaded user directory");

        let users = accounts
            .into_iter()
            .map(|account| (account.email.clone(), account))
            .collect();
        Ok(Self {
            users: RwLock::new(users),
            bcrypt_cost,
            snapshot: Some(file),
        })
    }

    pub async fn signup(&self, email: &str, password: &str) -> AuthResult<UserAccount> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.users.read().await.contains_key(&email) {
            return Err(AuthError::EmailTaken(email));
        }

        let password_hash = self.hash_password(password).await?;

        let mut users = self.users.write().await;
        if users.contains_key(&email) {
            return Err(AuthError::EmailTaken(email));
        }
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash,
            created_at: Utc::now(),
        };
        users.insert(email, account.clone());

        if let Some(file) = &self.snapshot {
            let accounts: Vec<UserAccount> = users.values().cloned().collect();
            let file = file.clone();
            let saved = tokio::task::spawn_blocking(move || file.save(&accounts))
                .await
                .map_err(|e| AuthError::Internal(e.to_string()))
                .and_then(|res| res.map_err(|e| AuthError::Internal(e.to_string())));
            if let Err(err) = saved {
                users.remove(account.email());
                return Err(err);
            }
        }

        info!(user_id = %account.id, "user registered");
        Ok(account)
    }

    /// Unknown emails and wrong passwords fail the same way.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<UserAccount> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let account = self
            .users
            .read()
            .await
            .get(&email)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        let password = password.to_string();
        let hash = account.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || {
            bcrypt::verify(password, &hash).unwrap_or(false)
        })
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !valid {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(account)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    async fn hash_password(&self, password: &str) -> AuthResult<String> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(|e| AuthError::Internal(format!("Failed to hash password: {}", e)))
    }
}

fn normalize_email(raw: &str) -> AuthResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation("a valid email is required".into()));
    }
    Ok(email)
}
