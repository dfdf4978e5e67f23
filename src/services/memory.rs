//! Process-local store used when no database is configured, and by the test suite.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::post::*;
use crate::models::user::*;

use super::posts::PostService;
use super::users::UserService;
use super::{Page, PageRequest, StoreError, UniqueField};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    posts: BTreeMap<i32, Post>,
    last_user_id: i32,
    last_post_id: i32,
}

impl Tables {
    /// Mirrors the unique constraints on `users`, ignoring the row being updated.
    fn check_unique(
        &self,
        username: &str,
        email: &str,
        except: Option<i32>,
    ) -> Result<(), StoreError> {
        for user in self.users.values().filter(|u| Some(u.id) != except) {
            if user.username == username {
                return Err(StoreError::Conflict(UniqueField::Username));
            }
            if user.email == email {
                return Err(StoreError::Conflict(UniqueField::Email));
            }
        }
        Ok(())
    }

    fn with_author(&self, post: &Post) -> Option<PostWithAuthor> {
        let author = self.users.get(&post.user_id)?;
        Some(PostWithAuthor {
            post: post.clone(),
            author: Author::from(author),
        })
    }

    fn page_of<F>(&self, req: PageRequest, keep: F) -> Page<PostWithAuthor>
    where
        F: Fn(&Post) -> bool,
    {
        let mut matching: Vec<&Post> = self.posts.values().filter(|p| keep(p)).collect();
        matching.sort_by(|a, b| (b.date_posted, b.id).cmp(&(a.date_posted, a.id)));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(req.offset()).unwrap_or(usize::MAX))
            .take(req.per_page as usize)
            .filter_map(|p| self.with_author(p))
            .collect();
        Page::new(items, req, total)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserService for MemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(&new.username, &new.email, None)?;

        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            username: new.username.clone(),
            email: new.email.clone(),
            image_file: DEFAULT_IMAGE_FILE.to_owned(),
            password: new.password.clone(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: i32, changes: &UserChanges) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(&changes.username, &changes.email, Some(id))?;

        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.username = changes.username.clone();
        user.email = changes.email.clone();
        if let Some(image_file) = &changes.image_file {
            user.image_file = image_file.clone();
        }
        Ok(user.clone())
    }

    async fn set_password(&self, id: i32, password_hash: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password = password_hash.to_owned();
        Ok(())
    }
}

#[async_trait]
impl PostService for MemoryStore {
    async fn recent_posts(&self, page: PageRequest) -> Result<Page<PostWithAuthor>, StoreError> {
        Ok(self.tables.read().await.page_of(page, |_| true))
    }

    async fn posts_by_author(
        &self,
        author_id: i32,
        page: PageRequest,
    ) -> Result<Page<PostWithAuthor>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .page_of(page, |p| p.user_id == author_id))
    }

    async fn get_post(&self, id: i32) -> Result<Option<PostWithAuthor>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).and_then(|p| tables.with_author(p)))
    }

    async fn create_post(&self, new: &NewPost) -> Result<Post, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::NotFound);
        }

        tables.last_post_id += 1;
        let post = Post {
            id: tables.last_post_id,
            title: new.title.clone(),
            date_posted: Utc::now(),
            content: new.content.clone(),
            user_id: new.user_id,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: i32, changes: &PostChanges) -> Result<Post, StoreError> {
        let mut tables = self.tables.write().await;
        let post = tables.posts.get_mut(&id).ok_or(StoreError::NotFound)?;
        post.title = changes.title.clone();
        post.content = changes.content.clone();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i32) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.posts.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_owned(),
            email: email.to_owned(),
            password: "hash".to_owned(),
        }
    }

    fn new_post(user_id: i32, title: &str) -> NewPost {
        NewPost {
            title: title.to_owned(),
            content: format!("{title} body"),
            user_id,
        }
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_a_conflict() {
        let store = MemoryStore::new();
        store
            .create_user(&new_user("corey", "corey@blog.com"))
            .await
            .unwrap();

        let err = store
            .create_user(&new_user("corey", "other@blog.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::Username)));

        let err = store
            .create_user(&new_user("jane", "corey@blog.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::Email)));
    }

    #[tokio::test]
    async fn profile_update_keeps_own_values_unique() {
        let store = MemoryStore::new();
        let corey = store
            .create_user(&new_user("corey", "corey@blog.com"))
            .await
            .unwrap();
        store
            .create_user(&new_user("jane", "jane@blog.com"))
            .await
            .unwrap();

        let unchanged = UserChanges {
            username: "corey".into(),
            email: "corey@blog.com".into(),
            image_file: Some("abc.png".into()),
        };
        let updated = store.update_profile(corey.id, &unchanged).await.unwrap();
        assert_eq!(updated.image_file, "abc.png");

        let stolen = UserChanges {
            username: "jane".into(),
            email: "corey@blog.com".into(),
            image_file: None,
        };
        let err = store.update_profile(corey.id, &stolen).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::Username)));
    }

    #[tokio::test]
    async fn posts_are_listed_newest_first() {
        let store = MemoryStore::new();
        let corey = store
            .create_user(&new_user("corey", "corey@blog.com"))
            .await
            .unwrap();
        for title in ["first", "second", "third"] {
            store.create_post(&new_post(corey.id, title)).await.unwrap();
        }

        let page = store.recent_posts(PageRequest::new(1, 5)).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, ["third", "second", "first"]);
        assert_eq!(page.items[0].author.username, "corey");
    }

    #[tokio::test]
    async fn author_listing_is_filtered_and_paginated() {
        let store = MemoryStore::new();
        let corey = store
            .create_user(&new_user("corey", "corey@blog.com"))
            .await
            .unwrap();
        let jane = store
            .create_user(&new_user("jane", "jane@blog.com"))
            .await
            .unwrap();
        for n in 0..7 {
            store
                .create_post(&new_post(corey.id, &format!("corey {n}")))
                .await
                .unwrap();
        }
        store.create_post(&new_post(jane.id, "jane")).await.unwrap();

        let second = store
            .posts_by_author(corey.id, PageRequest::new(2, 5))
            .await
            .unwrap();
        assert_eq!(second.total, 7);
        assert_eq!(second.pages, 2);
        let titles: Vec<_> = second.items.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, ["corey 1", "corey 0"]);
    }

    #[tokio::test]
    async fn posts_need_an_existing_owner() {
        let store = MemoryStore::new();
        let err = store.create_post(&new_post(42, "orphan")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn update_and_delete_missing_post() {
        let store = MemoryStore::new();
        let changes = PostChanges {
            title: "t".into(),
            content: "c".into(),
        };
        assert!(matches!(
            store.update_post(1, &changes).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.delete_post(1).await, Err(StoreError::NotFound)));
    }
}
