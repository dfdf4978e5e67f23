pub mod memory;
pub mod posts;
pub mod users;

use std::fmt;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::deadpool;
use diesel_async::AsyncPgConnection;
use serde::Serialize;
use thiserror::Error;

pub type Pool = deadpool::Pool<AsyncPgConnection>;

/// Columns that carry a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Username => f.write_str("username"),
            UniqueField::Email => f.write_str("email"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("that {0} is already taken")]
    Conflict(UniqueField),

    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(DieselError),

    #[error("pool error: {0}")]
    Pool(#[from] deadpool::PoolError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &err {
            // Postgres names them `users_<column>_key`
            let field = match info.constraint_name() {
                Some(name) if name.contains("email") => Some(UniqueField::Email),
                Some(name) if name.contains("username") => Some(UniqueField::Username),
                _ => None,
            };
            if let Some(field) = field {
                return StoreError::Conflict(field);
            }
        }
        match err {
            DieselError::NotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}

/// One-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Saturates, so absurd page numbers land past the end instead of wrapping.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub prev_num: Option<i64>,
    pub next_num: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, req: PageRequest, total: i64) -> Self {
        let pages = ((total + req.per_page - 1) / req.per_page).max(1);
        Self {
            items,
            page: req.page,
            per_page: req.per_page,
            total,
            pages,
            prev_num: (req.page > 1).then(|| req.page - 1),
            next_num: (req.page < pages).then(|| req.page + 1),
        }
    }

    /// Page one always exists, even when there is nothing on it.
    pub fn is_out_of_range(&self) -> bool {
        self.page > 1 && self.page > self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constraint(&'static str);

    impl diesel::result::DatabaseErrorInformation for Constraint {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            Some("users")
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            Some(self.0)
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn unique_violation(constraint: &'static str) -> DieselError {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(Constraint(constraint)),
        )
    }

    #[test]
    fn unique_violations_name_the_column() {
        assert!(matches!(
            StoreError::from(unique_violation("users_email_key")),
            StoreError::Conflict(UniqueField::Email)
        ));
        assert!(matches!(
            StoreError::from(unique_violation("users_username_key")),
            StoreError::Conflict(UniqueField::Username)
        ));
        assert!(matches!(
            StoreError::from(unique_violation("something_else")),
            StoreError::Database(_)
        ));
        assert!(matches!(
            StoreError::from(DieselError::NotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn page_numbers() {
        let page = Page::new(vec![1, 2, 3, 4, 5], PageRequest::new(2, 5), 12);
        assert_eq!(page.pages, 3);
        assert_eq!(page.prev_num, Some(1));
        assert_eq!(page.next_num, Some(3));
        assert!(!page.is_out_of_range());

        let empty: Page<i32> = Page::new(vec![], PageRequest::new(1, 5), 0);
        assert_eq!(empty.pages, 1);
        assert_eq!(empty.next_num, None);
        assert!(!empty.is_out_of_range());

        let past_end: Page<i32> = Page::new(vec![], PageRequest::new(4, 5), 12);
        assert!(past_end.is_out_of_range());
    }

    #[test]
    fn page_request_clamps_to_first_page() {
        let req = PageRequest::new(0, 5);
        assert_eq!(req.page, 1);
        assert_eq!(req.offset(), 0);
        assert_eq!(PageRequest::new(3, 5).offset(), 10);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let req = PageRequest::new(i64::MAX, 5);
        assert_eq!(req.offset(), i64::MAX);

        let page: Page<i32> = Page::new(vec![], req, 12);
        assert!(page.is_out_of_range());
        assert_eq!(page.next_num, None);
    }
}
