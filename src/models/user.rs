use diesel::prelude::*;
use serde::Serialize;

/// Picture shown until the user uploads one.
pub const DEFAULT_IMAGE_FILE: &str = "default.jpg";

// the input to the `register` handler, with the password already hashed
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Profile fields editable from the account page. A `None` picture keeps the current one.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserChanges {
    pub username: String,
    pub email: String,
    pub image_file: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub image_file: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password: String,
}

/// The slice of a user shown next to their posts.
#[derive(Serialize, Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Author {
    pub id: i32,
    pub username: String,
    pub image_file: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            image_file: user.image_file.clone(),
        }
    }
}
