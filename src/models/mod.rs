//! Data models
//!
//! Database entities (Item, Article, User, Session) and the input types the
//! services accept.

mod article;
mod item;
mod session;
mod user;

pub use article::{Article, ArticleInput};
pub use item::{Item, ItemInput};
pub use session::Session;
pub use user::User;
