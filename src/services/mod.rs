//! Services layer
//!
//! Business rules sit here: form validation, password hashing, session
//! handling and checkout. Handlers call services; services call repositories.

pub mod article;
pub mod checkout;
pub mod item;
pub mod password;
pub mod signing;
pub mod user;

pub use article::{ArticleService, ArticleServiceError};
pub use checkout::{
    CheckoutError, CheckoutRequest, CheckoutService, CheckoutSession, HostedCheckoutGateway,
    PaymentGateway,
};
pub use item::{ItemDraft, ItemService, ItemServiceError};
pub use password::{hash_password, verify_password};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
