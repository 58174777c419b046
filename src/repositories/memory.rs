//! テスト用のインメモリストア

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{DocumentStore, UserStore};
use crate::error::AppError;
use crate::models::{Document, DocumentUpdate, NewDocument, NewUser, ProfileUpdate, User};

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    fn modify<F>(&self, user_id: Uuid, f: F) -> Result<User, AppError>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.lock().expect("user store poisoned");
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;
        f(user);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    fn find<P>(&self, predicate: P) -> Option<User>
    where
        P: Fn(&User) -> bool,
    {
        let users = self.users.lock().expect("user store poisoned");
        users.values().find(|u| predicate(u)).cloned()
    }

    /// テストから直接レコードを書き換える
    pub fn patch<F>(&self, user_id: Uuid, f: F)
    where
        F: FnOnce(&mut User),
    {
        self.modify(user_id, f).expect("patch target exists");
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock().expect("user store poisoned");
        if users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::EmailAlreadyExists(new_user.email));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            phone_number: new_user.phone_number,
            gender: new_user.gender,
            is_verified: false,
            verification_code: Some(new_user.verification_code),
            reset_code: None,
            reset_code_expires_at: None,
            session_token_hash: None,
            last_login: None,
            is_admin: new_user.is_admin,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.find(|u| u.id == user_id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.find(|u| u.email == email))
    }

    async fn find_by_session_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self.find(|u| u.session_token_hash.as_deref() == Some(token_hash)))
    }

    async fn find_by_last_name(&self, last_name: &str) -> Result<Vec<User>, AppError> {
        let users = self.users.lock().expect("user store poisoned");
        Ok(users
            .values()
            .filter(|u| u.last_name.eq_ignore_ascii_case(last_name))
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = self.users.lock().expect("user store poisoned");
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by_key(|u| u.created_at);
        Ok(all)
    }

    async fn mark_verified(&self, user_id: Uuid) -> Result<(), AppError> {
        self.modify(user_id, |u| {
            u.is_verified = true;
            u.verification_code = None;
        })
        .map(|_| ())
    }

    async fn start_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        logged_in_at: OffsetDateTime,
    ) -> Result<(), AppError> {
        self.modify(user_id, |u| {
            u.session_token_hash = Some(token_hash.to_string());
            u.last_login = Some(logged_in_at);
        })
        .map(|_| ())
    }

    async fn clear_session(&self, user_id: Uuid) -> Result<(), AppError> {
        self.modify(user_id, |u| u.session_token_hash = None)
            .map(|_| ())
    }

    async fn set_reset_code(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError> {
        self.modify(user_id, |u| {
            u.reset_code = Some(code.to_string());
            u.reset_code_expires_at = Some(expires_at);
        })
        .map(|_| ())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        self.modify(user_id, |u| {
            u.password_hash = password_hash.to_string();
            u.reset_code = None;
            u.reset_code_expires_at = None;
            u.session_token_hash = None;
        })
        .map(|_| ())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<User, AppError> {
        self.modify(user_id, |u| {
            if let Some(first_name) = &update.first_name {
                u.first_name = first_name.clone();
            }
            if let Some(last_name) = &update.last_name {
                u.last_name = last_name.clone();
            }
            if let Some(phone_number) = &update.phone_number {
                u.phone_number = phone_number.clone();
            }
            if let Some(gender) = &update.gender {
                u.gender = gender.clone();
            }
        })
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<Uuid, Document>>,
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, document: NewDocument) -> Result<Document, AppError> {
        let now = OffsetDateTime::now_utc();
        let document = Document {
            id: Uuid::new_v4(),
            user_id: document.user_id,
            user_first_name: document.user_first_name,
            user_last_name: document.user_last_name,
            kind: document.kind,
            fields: Json(document.fields),
            filename: document.filename,
            created_at: now,
            updated_at: now,
        };
        self.documents
            .lock()
            .expect("document store poisoned")
            .insert(document.id, document.clone());
        Ok(document)
    }

    async fn find_by_id(&self, document_id: Uuid) -> Result<Option<Document>, AppError> {
        let documents = self.documents.lock().expect("document store poisoned");
        Ok(documents.get(&document_id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = self.documents.lock().expect("document store poisoned");
        let mut owned: Vec<Document> = documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|d| std::cmp::Reverse(d.created_at));
        Ok(owned)
    }

    async fn list(&self) -> Result<Vec<Document>, AppError> {
        let documents = self.documents.lock().expect("document store poisoned");
        let mut all: Vec<Document> = documents.values().cloned().collect();
        all.sort_by_key(|d| std::cmp::Reverse(d.created_at));
        Ok(all)
    }

    async fn update(
        &self,
        document_id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Document, AppError> {
        let mut documents = self.documents.lock().expect("document store poisoned");
        let document = documents
            .get_mut(&document_id)
            .ok_or_else(|| AppError::NotFound("Letter".to_string()))?;
        document.fields = Json(update.fields);
        document.updated_at = OffsetDateTime::now_utc();
        Ok(document.clone())
    }

    async fn delete(&self, document_id: Uuid) -> Result<(), AppError> {
        self.documents
            .lock()
            .expect("document store poisoned")
            .remove(&document_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Letter".to_string()))
    }
}
