pub mod admin;
pub mod health;
pub mod letters;
pub mod login;
pub mod logout;
pub mod password_reset;
pub mod profile;
pub mod register;

pub use admin::{get_user, list_all_letters, list_user_letters, list_users, search_users};
pub use health::{health_check, welcome};
pub use letters::{
    delete_letter, download, generate_exam_paper, generate_leave_letter,
    generate_transfer_letter, get_letter, list_letters, prepare_download, update_letter,
};
pub use login::login;
pub use logout::logout;
pub use password_reset::{forgot_password, reset_password};
pub use profile::{get_profile, update_profile};
pub use register::{register, verify_email};
