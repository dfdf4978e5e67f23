use axum::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::models::post::*;
use crate::models::user::Author;
use crate::schema;

use super::{Page, PageRequest, Pool, StoreError};

#[async_trait]
pub trait PostService: Send + Sync {
    /// All posts, newest first.
    async fn recent_posts(&self, page: PageRequest) -> Result<Page<PostWithAuthor>, StoreError>;
    /// One author's posts, newest first.
    async fn posts_by_author(
        &self,
        author_id: i32,
        page: PageRequest,
    ) -> Result<Page<PostWithAuthor>, StoreError>;
    async fn get_post(&self, id: i32) -> Result<Option<PostWithAuthor>, StoreError>;
    async fn create_post(&self, post: &NewPost) -> Result<Post, StoreError>;
    async fn update_post(&self, id: i32, changes: &PostChanges) -> Result<Post, StoreError>;
    async fn delete_post(&self, id: i32) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PostServiceDb {
    db: Pool,
}

impl PostServiceDb {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostService for PostServiceDb {
    async fn recent_posts(&self, page: PageRequest) -> Result<Page<PostWithAuthor>, StoreError> {
        use schema::{posts, users};

        let mut conn = self.db.get().await?;

        let total: i64 = posts::table.count().get_result(&mut conn).await?;
        let rows: Vec<(Post, Author)> = posts::table
            .inner_join(users::table)
            .order((posts::date_posted.desc(), posts::id.desc()))
            .limit(page.per_page)
            .offset(page.offset())
            .select((Post::as_select(), Author::as_select()))
            .load(&mut conn)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(PostWithAuthor::from).collect(),
            page,
            total,
        ))
    }

    async fn posts_by_author(
        &self,
        author_id: i32,
        page: PageRequest,
    ) -> Result<Page<PostWithAuthor>, StoreError> {
        use schema::{posts, users};

        let mut conn = self.db.get().await?;

        let total: i64 = posts::table
            .filter(posts::user_id.eq(author_id))
            .count()
            .get_result(&mut conn)
            .await?;
        let rows: Vec<(Post, Author)> = posts::table
            .inner_join(users::table)
            .filter(posts::user_id.eq(author_id))
            .order((posts::date_posted.desc(), posts::id.desc()))
            .limit(page.per_page)
            .offset(page.offset())
            .select((Post::as_select(), Author::as_select()))
            .load(&mut conn)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(PostWithAuthor::from).collect(),
            page,
            total,
        ))
    }

    async fn get_post(&self, post_id: i32) -> Result<Option<PostWithAuthor>, StoreError> {
        use schema::{posts, users};

        let mut conn = self.db.get().await?;
        let row: Option<(Post, Author)> = posts::table
            .inner_join(users::table)
            .filter(posts::id.eq(post_id))
            .select((Post::as_select(), Author::as_select()))
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(PostWithAuthor::from))
    }

    async fn create_post(&self, p: &NewPost) -> Result<Post, StoreError> {
        use schema::posts::dsl::*;

        let mut conn = self.db.get().await?;

        let post = diesel::insert_into(posts)
            .values(p)
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(post)
    }

    async fn update_post(&self, post_id: i32, changes: &PostChanges) -> Result<Post, StoreError> {
        use schema::posts::dsl::*;

        let mut conn = self.db.get().await?;

        let post = diesel::update(posts.find(post_id))
            .set(changes)
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(post)
    }

    async fn delete_post(&self, post_id: i32) -> Result<(), StoreError> {
        use schema::posts::dsl::*;

        let mut conn = self.db.get().await?;

        let deleted = diesel::delete(posts.find(post_id))
            .execute(&mut conn)
            .await?;

        match deleted {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }
}
