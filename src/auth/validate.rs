use lazy_static::lazy_static;
use regex::Regex;

/// Canonical stored form of an email address. Signup persists this form
/// and the login email fallback looks it up, so the two always agree.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Letters, digits and @/./+/-/_ only, 150 characters or fewer.
pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9@.+_-]+$").unwrap();
    }
    !username.is_empty() && username.len() <= 150 && USERNAME_RE.is_match(username)
}
