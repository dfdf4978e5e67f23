pub mod flash;
pub mod password;
pub mod session;
pub mod token;

pub use flash::Category;
pub use session::{CurrentUser, MaybeUser};
pub use token::ResetTokens;
