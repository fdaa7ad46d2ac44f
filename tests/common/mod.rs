#![allow(dead_code)]

use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use portal::core::{AppState, encode_jwt};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

pub const JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

/// Utenti caricati da `fixtures/users.sql`
pub const ADMIN_ID: i32 = 1;
pub const ALICE_ID: i32 = 2;
pub const BOB_ID: i32 = 3;

/// Crea un AppState per i test
///
/// La directory degli upload è temporanea: va tenuta in vita per tutta la durata del test.
pub fn create_test_state(pool: &SqlitePool) -> (Arc<AppState>, TempDir) {
    let upload_dir = TempDir::new().expect("Failed to create upload dir");
    let state = AppState::new(pool.clone(), JWT_SECRET.to_string(), upload_dir.path());
    (Arc::new(state), upload_dir)
}

/// Crea un TestServer per i test
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = portal::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Genera un JWT token valido per 24 ore
pub fn create_test_jwt(user_id: i32, username: &str) -> String {
    encode_jwt(username.to_string(), user_id, JWT_SECRET).expect("Failed to create JWT token")
}

pub fn bearer(user_id: i32, username: &str) -> String {
    format!("Bearer {}", create_test_jwt(user_id, username))
}

pub fn admin_auth() -> String {
    bearer(ADMIN_ID, "admin")
}

pub fn alice_auth() -> String {
    bearer(ALICE_ID, "alice")
}

pub fn bob_auth() -> String {
    bearer(BOB_ID, "bob")
}

/// Form multipart con il solo testo
pub fn text_form(content: &str) -> MultipartForm {
    MultipartForm::new().add_text("content", content.to_string())
}

/// Form multipart con testo e allegato
pub fn attachment_form(content: &str, file_name: &str, mime_type: &str, bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_text("content", content.to_string()).add_part(
        "attachment",
        Part::bytes(bytes).file_name(file_name.to_string()).mime_type(mime_type.to_string()),
    )
}
