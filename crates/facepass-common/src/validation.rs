//! Request field validation.
//!
//! Every validator collects all field problems instead of stopping at the
//! first one, so clients can show them together.

use base64::{engine::general_purpose, Engine as _};

pub const EMAIL_REQUIRED: &str = "Email address is required";
pub const EMAIL_INVALID: &str = "Email address format is invalid";
pub const EMAIL_TAKEN: &str = "Email address is already registered";
pub const USERNAME_REQUIRED: &str = "Username is required";
pub const PASSWORD_REQUIRED: &str = "Password is required";
pub const PHOTO_REQUIRED: &str = "Photo is required";
pub const PHOTO_INVALID: &str = "Photo format is invalid";
pub const QR_TOKEN_REQUIRED: &str = "QR token is required";
pub const BODY_INVALID: &str = "Request body is malformed";

/// Loose structural email check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Decode a standard-alphabet base64 photo. `None` if it is not valid base64.
pub fn decode_photo(photo: &str) -> Option<Vec<u8>> {
    general_purpose::STANDARD.decode(photo).ok()
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    if email.is_empty() {
        errors.push(EMAIL_REQUIRED.to_string());
    } else if !is_valid_email(email) {
        errors.push(EMAIL_INVALID.to_string());
    }
}

fn check_photo(photo: &str, errors: &mut Vec<String>) -> Option<Vec<u8>> {
    if photo.is_empty() {
        errors.push(PHOTO_REQUIRED.to_string());
        return None;
    }
    let bytes = decode_photo(photo);
    if bytes.is_none() {
        errors.push(PHOTO_INVALID.to_string());
    }
    bytes
}

pub fn validate_login(email: &str, password: &str) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    check_email(email, &mut errors);
    if password.is_empty() {
        errors.push(PASSWORD_REQUIRED.to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a registration request and return the decoded photo bytes.
pub fn validate_registration(
    email: &str,
    username: &str,
    password: &str,
    photo: &str,
) -> Result<Vec<u8>, Vec<String>> {
    let mut errors = Vec::new();
    check_email(email, &mut errors);
    if username.trim().is_empty() {
        errors.push(USERNAME_REQUIRED.to_string());
    }
    if password.is_empty() {
        errors.push(PASSWORD_REQUIRED.to_string());
    }
    let bytes = check_photo(photo, &mut errors);
    match bytes {
        Some(bytes) if errors.is_empty() => Ok(bytes),
        _ => Err(errors),
    }
}

/// Validate a face-recognition request and return the decoded probe photo.
pub fn validate_face_recognition(qr_token: &str, photo: &str) -> Result<Vec<u8>, Vec<String>> {
    let mut errors = Vec::new();
    if qr_token.trim().is_empty() {
        errors.push(QR_TOKEN_REQUIRED.to_string());
    }
    let bytes = check_photo(photo, &mut errors);
    match bytes {
        Some(bytes) if errors.is_empty() => Ok(bytes),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTO: &str = "iVBORw0KGgo=";

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("ax.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a@x."));
        assert!(!is_valid_email("a@@x.com"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[test]
    fn test_decode_photo() {
        assert_eq!(decode_photo(PHOTO).unwrap()[..4], [0x89, b'P', b'N', b'G']);
        assert!(decode_photo("not base64!").is_none());
    }

    #[test]
    fn test_login_requires_both_fields() {
        let errors = validate_login("", "").unwrap_err();
        assert_eq!(errors, vec![EMAIL_REQUIRED, PASSWORD_REQUIRED]);
    }

    #[test]
    fn test_login_bad_email_format() {
        let errors = validate_login("nope", "pw").unwrap_err();
        assert_eq!(errors, vec![EMAIL_INVALID]);
        assert!(validate_login("a@x.com", "pw").is_ok());
    }

    #[test]
    fn test_registration_ok_returns_photo_bytes() {
        let bytes = validate_registration("a@x.com", "alice", "pw", PHOTO).unwrap();
        assert_eq!(bytes.len(), 8);
    }

    #[test]
    fn test_registration_collects_every_error() {
        let errors = validate_registration("bad", " ", "", "%%%").unwrap_err();
        assert_eq!(
            errors,
            vec![EMAIL_INVALID, USERNAME_REQUIRED, PASSWORD_REQUIRED, PHOTO_INVALID]
        );
    }

    #[test]
    fn test_registration_missing_photo() {
        let errors = validate_registration("a@x.com", "alice", "pw", "").unwrap_err();
        assert_eq!(errors, vec![PHOTO_REQUIRED]);
    }

    #[test]
    fn test_face_recognition_validation() {
        assert!(validate_face_recognition("tok", PHOTO).is_ok());
        let errors = validate_face_recognition("", "").unwrap_err();
        assert_eq!(errors, vec![QR_TOKEN_REQUIRED, PHOTO_REQUIRED]);
        let errors = validate_face_recognition("tok", "***").unwrap_err();
        assert_eq!(errors, vec![PHOTO_INVALID]);
    }
}
