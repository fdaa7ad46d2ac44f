//! Auth services - Gestione autenticazione e registrazione utenti

use crate::core::auth::TOKEN_COOKIE;
use crate::core::{AppError, AppState, encode_jwt};
use crate::dtos::{CreateUserDTO, UserDTO};
use crate::entities::{User, UserRole};
use crate::repositories::Create;
use axum::{
    extract::{Json, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

/// DTO per il login (solo username e password)
#[derive(serde::Deserialize)]
pub struct LoginDTO {
    pub username: String,
    pub password: String,
}

#[instrument(skip(state, jar, body), fields(username = %body.username))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginDTO>, // JSON body
) -> Result<impl IntoResponse, AppError> {
    debug!("Login attempt");
    // 1. Rifiutare subito credenziali vuote (fail-fast prima della query DB)
    // 2. Cercare l'utente nel database tramite username
    // 3. Verificare la password contro l'hash memorizzato
    // 4. Generare il token JWT con user_id, username e il segreto
    // 5. Ritornare il token nell'header Authorization e in un cookie HttpOnly (serve al browser per il WebSocket)
    // 6. Nel body l'utente autenticato

    if body.username.is_empty() || body.password.is_empty() {
        return Err(AppError::unauthorized("Invalid username or password"));
    }

    let user = match state.user.find_by_username(&body.username).await? {
        Some(user) => user,
        None => {
            warn!("Login failed: unknown username");
            return Err(AppError::unauthorized("Invalid username or password"));
        }
    };

    if !user.verify_password(&body.password) {
        warn!("Login failed: wrong password");
        return Err(AppError::unauthorized("Invalid username or password"));
    }

    let token = encode_jwt(user.username.clone(), user.user_id, &state.jwt_secret)?;

    // il cookie serve al browser per il WebSocket; HttpOnly lo nasconde agli script
    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::hours(24))
        .build();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AppError::internal_server_error("Failed to build authorization header"))?,
    );

    info!(user_id = user.user_id, "User logged in");
    Ok((StatusCode::OK, jar.add(cookie), headers, Json(UserDTO::from(user))))
}

#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserDTO>, // JSON body
) -> Result<(StatusCode, Json<UserDTO>), AppError> {
    debug!("Registering new user");
    // 1. Validare il DTO con validator
    // 2. Controllare che lo username non sia già in uso (CONFLICT)
    // 3. Hash della password
    // 4. Salvare l'utente sempre con ruolo client
    body.validate()?;

    if state.user.find_by_username(&body.username).await?.is_some() {
        warn!("Username already exists");
        return Err(AppError::conflict("Username already exists"));
    }

    let password_hash = User::hash_password(&body.password).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        AppError::internal_server_error("Failed to hash password")
    })?;

    let new_user = CreateUserDTO {
        username: body.username,
        password: password_hash,
        full_name: body.full_name,
        role: UserRole::Client,
    };

    let created_user = state.user.create(&new_user).await?;
    info!(user_id = created_user.user_id, "User registered");

    Ok((StatusCode::CREATED, Json(UserDTO::from(created_user))))
}

/// Crea l'amministratore iniziale se non esiste ancora. Usato all'avvio.
#[instrument(skip(state, password))]
pub async fn ensure_admin(state: &AppState, username: &str, password: &str) -> Result<(), AppError> {
    if state.user.find_by_username(username).await?.is_some() {
        debug!("Admin account already present");
        return Ok(());
    }

    let password_hash = User::hash_password(password)
        .map_err(|_| AppError::internal_server_error("Failed to hash password"))?;

    let admin = state
        .user
        .create(&CreateUserDTO {
            username: username.to_string(),
            password: password_hash,
            full_name: "Administrator".to_string(),
            role: UserRole::Admin,
        })
        .await?;

    info!(user_id = admin.user_id, "Admin account created");
    Ok(())
}
