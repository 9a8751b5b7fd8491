//! Auth commands: login, logout, session restore.

use serde::Deserialize;

use crate::auth;
use crate::db::DbState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[serde(alias = "user", alias = "user_name")]
    username: String,
    #[serde(alias = "pin_code")]
    pin: String,
}

fn parse_login_payload(arg0: Option<serde_json::Value>) -> Result<LoginPayload, String> {
    let payload = arg0.ok_or("Missing login payload")?;
    serde_json::from_value(payload).map_err(|e| format!("Invalid login payload: {e}"))
}

/// Handle auth:login. Verifies the username/PIN pair and persists the
/// session.
pub async fn auth_login(
    arg0: Option<serde_json::Value>,
    db: &DbState,
) -> Result<serde_json::Value, String> {
    let payload = parse_login_payload(arg0)?;
    let pin = auth::sanitize_pin_input(&payload.pin);

    let user = auth::login(db, &payload.username, &pin).map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "success": true,
        "user": user,
    }))
}

/// Handle auth:logout. Clears the persisted session.
pub async fn auth_logout(db: &DbState) -> Result<serde_json::Value, String> {
    auth::logout(db).map_err(|e| e.to_string())?;
    Ok(serde_json::json!({ "success": true }))
}

/// Handle auth:get-session. Reads the persisted session at startup so the
/// shell can decide between the login screen and the main interface.
pub async fn auth_get_session(db: &DbState) -> Result<serde_json::Value, String> {
    let user = auth::load_session(db).map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "authenticated": user.is_some(),
        "user": user,
    }))
}
