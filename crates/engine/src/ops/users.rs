use sea_orm::{ActiveValue, prelude::*};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, users};

use super::{Engine, normalize_required_name};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(EngineError::InvalidInput(format!("invalid role: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub username: String,
    pub role: Role,
}

impl User {
    /// `Forbidden` unless the user holds the admin role.
    pub fn ensure_admin(&self) -> ResultEngine<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!(
                "'{}' is not an administrator",
                self.username
            )))
        }
    }
}

impl TryFrom<users::Model> for User {
    type Error = EngineError;

    fn try_from(model: users::Model) -> ResultEngine<Self> {
        Ok(Self {
            role: Role::try_from(model.role.as_str())?,
            username: model.username,
        })
    }
}

/// Hex SHA-256 of `salt:password`.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl Engine {
    pub async fn create_user(&self, username: &str, password: &str, role: Role) -> ResultEngine<User> {
        let username = normalize_required_name(username, "username")?;
        if password.is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        if users::Entity::find_by_id(username.clone())
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(username));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let model = users::ActiveModel {
            username: ActiveValue::Set(username),
            password_hash: ActiveValue::Set(hash_password(&salt, password)),
            salt: ActiveValue::Set(salt),
            role: ActiveValue::Set(role.as_str().to_string()),
        }
        .insert(&self.database)
        .await?;
        User::try_from(model)
    }

    /// Check a username/password pair. Unknown users and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;
        if hash_password(&model.salt, password) != model.password_hash {
            return Err(EngineError::InvalidCredentials);
        }
        User::try_from(model)
    }

    pub async fn list_users(&self) -> ResultEngine<Vec<User>> {
        users::Entity::find()
            .all(&self.database)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }
}
