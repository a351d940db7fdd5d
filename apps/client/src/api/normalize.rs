//! Payload normalization for the remote auth collaborator.
//!
//! The backend is not consistent about response shapes: the token arrives as
//! `access_token` or `token`, the user record may be nested under `user` or
//! flattened into the top level, and ids show up as numbers or strings
//! depending on which route produced them. Everything is mapped into the
//! canonical `Session`/`User` types here so the coordinator never touches a
//! raw `serde_json::Value`.

use serde_json::Value;

use crate::errors::ApiError;
use crate::models::user::{Role, Session, User};

/// Extracts the token from either of the field names the backend uses.
pub fn token_from(payload: &Value) -> Option<String> {
    payload
        .get("access_token")
        .or_else(|| payload.get("token"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Extracts a user record, accepting both the nested and the flat shape.
pub fn user_from(payload: &Value) -> Option<User> {
    if let Some(nested) = payload.get("user") {
        if nested.is_object() {
            return user_from_object(nested);
        }
    }
    // Flat shape: the payload itself carries the user fields.
    if payload.get("email").is_some() {
        return user_from_object(payload);
    }
    None
}

fn user_from_object(obj: &Value) -> Option<User> {
    let email = obj.get("email")?.as_str()?.to_string();

    // Mongo-backed routes send `_id`; others send `id`, as number or string.
    let id = obj
        .get("id")
        .or_else(|| obj.get("_id"))
        .map(id_to_string)
        .unwrap_or_default();

    // Registration responses omit the display name; fall back to the
    // local part of the email, as the signup form itself does.
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

    let role = obj
        .get("role")
        .and_then(Value::as_str)
        .map(Role::parse)
        .unwrap_or_default();

    let avatar = obj
        .get("avatar")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(User {
        id,
        name,
        email,
        role,
        avatar,
    })
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Normalizes a login response. A token is mandatory here; a response
/// without one is the "no authentication token received" failure.
pub fn login_session(payload: &Value) -> Result<Session, ApiError> {
    let token = token_from(payload).ok_or(ApiError::MissingToken)?;
    let user = user_from(payload)
        .ok_or_else(|| ApiError::Malformed("login response is missing the user record".into()))?;
    Ok(Session { token, user })
}

/// Normalizes a registration response. The register endpoint is not trusted
/// to issue a token; `Ok(None)` means "registered, but log in to get one".
pub fn register_session(payload: &Value) -> Result<Option<Session>, ApiError> {
    match token_from(payload) {
        None => Ok(None),
        Some(token) => {
            let user = user_from(payload).ok_or_else(|| {
                ApiError::Malformed("register response carried a token but no user record".into())
            })?;
            Ok(Some(Session { token, user }))
        }
    }
}
