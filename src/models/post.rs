use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use super::user::Author;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub user_id: i32,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PostChanges {
    pub title: String,
    pub content: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub date_posted: DateTime<Utc>,
    pub content: String,
    pub user_id: i32,
}

impl Post {
    pub fn is_owned_by(&self, user_id: i32) -> bool {
        self.user_id == user_id
    }
}

/// A post joined with its author, as listed on the home and profile pages.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: Author,
}

impl From<(Post, Author)> for PostWithAuthor {
    fn from((post, author): (Post, Author)) -> Self {
        Self { post, author }
    }
}
