pub mod document;
pub mod user;

pub use document::{Document, DocumentKind, DocumentUpdate, NewDocument};
pub use user::{NewUser, ProfileUpdate, User, UserProfile, UserSummary};
