use axum::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::models::user::*;
use crate::schema;

use super::{Pool, StoreError};

#[async_trait]
pub trait UserService: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::Conflict`] when the username or email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError>;
    async fn update_profile(&self, id: i32, changes: &UserChanges) -> Result<User, StoreError>;
    async fn set_password(&self, id: i32, password_hash: &str) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct UserServiceDb {
    db: Pool,
}

impl UserServiceDb {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserService for UserServiceDb {
    async fn find_by_id(&self, uid: i32) -> Result<Option<User>, StoreError> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;
        let user = users
            .find(uid)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_by_email(&self, addr: &str) -> Result<Option<User>, StoreError> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;
        let user = users
            .filter(email.eq(addr))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_by_username(&self, name: &str) -> Result<Option<User>, StoreError> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;
        let user = users
            .filter(username.eq(name))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn create_user(&self, u: &NewUser) -> Result<User, StoreError> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;

        let user = diesel::insert_into(users)
            .values(u)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(user)
    }

    async fn update_profile(&self, uid: i32, changes: &UserChanges) -> Result<User, StoreError> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;

        let user = diesel::update(users.find(uid))
            .set(changes)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(user)
    }

    async fn set_password(&self, uid: i32, password_hash: &str) -> Result<(), StoreError> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;

        let updated = diesel::update(users.find(uid))
            .set(password.eq(password_hash))
            .execute(&mut conn)
            .await?;

        match updated {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }
}
