pub mod auth;
pub mod documents;
pub mod downloads;
pub mod email;
pub mod letters;
pub mod render;

pub use auth::AuthService;
pub use documents::DocumentPayload;
pub use downloads::DownloadStore;
pub use email::{EmailService, Mailer};
pub use letters::DocumentService;
pub use render::DocumentRenderer;
