//! Session gate: username/PIN login for the till.
//!
//! Credentials live in the SQLite `local_settings` table (category "auth",
//! key = username, value = PIN) and are compared as plain text; this is a
//! single till behind the counter, not a security boundary. The active session is
//! persisted in `local_settings` (category "session") so it survives a
//! restart until explicit logout. User-facing messages are Turkish, matching
//! the rest of the interface.

use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{self, DbState};
use crate::error::{PosError, PosResult};

const SESSION_CATEGORY: &str = "session";
const AUTH_CATEGORY: &str = "auth";
const AUTH_TOKEN_KEY: &str = "auth_token";
const CURRENT_USER_KEY: &str = "current_user";

/// Required PIN length (digits).
pub const PIN_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Strip non-digits and cap at [`PIN_LEN`] characters, mirroring the PIN
/// input field's sanitization.
pub fn sanitize_pin_input(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(PIN_LEN)
        .collect()
}

/// Reject empty fields and malformed PINs before touching the credential
/// table.
fn validate_login_input(username: &str, pin: &str) -> PosResult<()> {
    if username.is_empty() || pin.is_empty() {
        return Err(PosError::validation(
            "Lütfen kullanıcı adı ve PIN kodunu giriniz",
        ));
    }
    if pin.len() != PIN_LEN || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(PosError::validation("PIN kodu 6 haneli olmalıdır"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

/// Verify a username/PIN pair against the stored credential table and, on
/// success, persist the session flags. Returns the active username.
pub fn login(db: &DbState, username: &str, pin: &str) -> PosResult<String> {
    let username = username.trim();
    validate_login_input(username, pin)?;

    let conn = db.lock()?;
    let stored = db::get_setting(&conn, AUTH_CATEGORY, username);

    match stored {
        Some(expected) if expected == pin => {
            save_session(&conn, username)?;
            info!(user = %username, "login successful");
            Ok(username.to_string())
        }
        _ => {
            warn!(user = %username, "login rejected: credential mismatch");
            Err(PosError::auth("Hatalı kullanıcı adı veya PIN kodu"))
        }
    }
}

/// Clear the persisted session flags.
pub fn logout(db: &DbState) -> PosResult<()> {
    let conn = db.lock()?;
    db::delete_setting(&conn, SESSION_CATEGORY, AUTH_TOKEN_KEY)?;
    db::delete_setting(&conn, SESSION_CATEGORY, CURRENT_USER_KEY)?;
    info!("session logged out");
    Ok(())
}

/// Read the persisted session at startup. `Some(username)` means the main
/// interface is shown; `None` means the login screen.
pub fn load_session(db: &DbState) -> PosResult<Option<String>> {
    let conn = db.lock()?;
    let authenticated = db::get_setting(&conn, SESSION_CATEGORY, AUTH_TOKEN_KEY)
        .map(|v| v == "true")
        .unwrap_or(false);
    if !authenticated {
        return Ok(None);
    }
    Ok(db::get_setting(&conn, SESSION_CATEGORY, CURRENT_USER_KEY))
}

fn save_session(conn: &Connection, username: &str) -> PosResult<()> {
    db::set_setting(conn, SESSION_CATEGORY, AUTH_TOKEN_KEY, "true")?;
    db::set_setting(conn, SESSION_CATEGORY, CURRENT_USER_KEY, username)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Login form input model
// ---------------------------------------------------------------------------

/// State of the login screen's two input fields. On an auth failure the PIN
/// field is cleared for re-entry while the username is retained.
#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub pin: String,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the PIN field content with a sanitized version of `raw`.
    pub fn type_pin(&mut self, raw: &str) {
        self.pin = sanitize_pin_input(raw);
    }

    /// Submit the form. On auth failure the PIN is cleared; validation
    /// failures leave both fields untouched.
    pub fn submit(&mut self, db: &DbState) -> PosResult<String> {
        match login(db, &self.username, &self.pin) {
            Ok(user) => Ok(user),
            Err(e) => {
                if matches!(e, PosError::Auth(_)) {
                    self.pin.clear();
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db_state;

    #[test]
    fn login_with_seeded_credentials_persists_session() {
        let db = test_db_state();

        let user = login(&db, "admin", "123456").expect("valid login");
        assert_eq!(user, "admin");
        assert_eq!(load_session(&db).unwrap().as_deref(), Some("admin"));

        logout(&db).unwrap();
        assert_eq!(load_session(&db).unwrap(), None);
    }

    #[test]
    fn empty_fields_are_a_validation_error() {
        let db = test_db_state();

        let err = login(&db, "", "123456").unwrap_err();
        assert!(matches!(err, PosError::Validation(_)));

        let err = login(&db, "admin", "").unwrap_err();
        assert!(matches!(err, PosError::Validation(_)));
    }

    #[test]
    fn malformed_pin_is_a_validation_error() {
        let db = test_db_state();

        for pin in ["12345", "1234567", "12345a", "abcdef"] {
            let err = login(&db, "admin", pin).unwrap_err();
            assert!(matches!(err, PosError::Validation(_)), "pin {pin:?}");
        }
    }

    #[test]
    fn wrong_pin_is_an_auth_error_and_clears_the_form_pin() {
        let db = test_db_state();

        let mut form = LoginForm::new();
        form.username = "admin".to_string();
        form.type_pin("000000");

        let err = form.submit(&db).unwrap_err();
        assert!(matches!(err, PosError::Auth(_)));
        assert_eq!(form.pin, "", "PIN field must be cleared for re-entry");
        assert_eq!(form.username, "admin", "username must be retained");

        // session flags must not have been touched
        assert_eq!(load_session(&db).unwrap(), None);
    }

    #[test]
    fn validation_failure_does_not_clear_the_pin_field() {
        let db = test_db_state();

        let mut form = LoginForm::new();
        form.username = "admin".to_string();
        form.pin = "123".to_string();

        let err = form.submit(&db).unwrap_err();
        assert!(matches!(err, PosError::Validation(_)));
        assert_eq!(form.pin, "123");
    }

    #[test]
    fn pin_input_is_sanitized() {
        assert_eq!(sanitize_pin_input("12a3-45x678"), "123456");
        assert_eq!(sanitize_pin_input("  654321  "), "654321");
        assert_eq!(sanitize_pin_input("abc"), "");
    }

    #[test]
    fn credentials_are_configurable_data() {
        let db = test_db_state();
        {
            let conn = db.lock().unwrap();
            db::set_setting(&conn, "auth", "barista", "111222").unwrap();
        }
        assert_eq!(login(&db, "barista", "111222").unwrap(), "barista");
    }

    #[test]
    fn session_survives_state_reload() {
        let db = test_db_state();
        login(&db, "manager", "654321").unwrap();

        // Same database, fresh read path. Mimics an app restart.
        assert_eq!(load_session(&db).unwrap().as_deref(), Some("manager"));
    }
}
