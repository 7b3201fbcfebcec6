use crate::error::{AppError, AppResult};

const USERNAME_MAX_LEN: usize = 30;
const EMAIL_MAX_LEN: usize = 100;

/// Trim and check a username: 1-30 chars, ASCII letters, digits, `_` or `-`.
pub fn username(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    if name.len() > USERNAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters",
            USERNAME_MAX_LEN
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(
            "Username may only contain letters, digits, '_' and '-'".into(),
        ));
    }
    Ok(name.to_string())
}

/// Trim and check an email address. Deliberately loose: one `@`, a non-empty
/// local part, a dotted domain, no whitespace. Anything stricter belongs to
/// a confirmation mail, not a regex.
pub fn email(raw: &str) -> AppResult<String> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".into()));
    }
    if email.len() > EMAIL_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Email must be at most {} characters",
            EMAIL_MAX_LEN
        )));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(AppError::Validation("Invalid email format".into()));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains("..")
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation("Invalid email format".into()));
    }
    Ok(email.to_ascii_lowercase())
}

/// Password policy: 8-72 bytes, at least one uppercase letter, one lowercase
/// letter and one digit. Each rejection names its reason.
pub fn password_strength(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    // bcrypt truncates input beyond 72 bytes
    if password.len() > 72 {
        return Err(AppError::Validation(
            "Password must be at most 72 characters".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::Validation(
            "Password must contain an uppercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AppError::Validation(
            "Password must contain a lowercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Password must contain a digit".into(),
        ));
    }
    Ok(())
}
