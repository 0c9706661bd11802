use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{ListUsersParams, LoginRequest, RegisterRequest};
use crate::error::{AppError, FieldError};
use crate::users::{Role, SortField, UserListQuery, UserSort};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 6;
const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Canonical form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if email.trim().is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if !is_valid_email(&normalize_email(email)) {
        errors.push(FieldError::new("email", "Email is invalid"));
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::invalid_fields(errors))
    }
}

pub fn validate_register(req: &RegisterRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();

    let username = req.username.trim();
    let len = username.chars().count();
    if username.is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        errors.push(FieldError::new(
            "username",
            format!("Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"),
        ));
    }

    check_email(&req.email, &mut errors);

    if req.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if req.password.chars().count() < PASSWORD_MIN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {PASSWORD_MIN} characters"),
        ));
    }

    finish(errors)
}

pub fn validate_login(req: &LoginRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();
    check_email(&req.email, &mut errors);
    if req.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    finish(errors)
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse::<u32>().ok()).filter(|v| *v > 0)
}

/// Accepts `{"<field>": 1 | -1}`.
fn parse_sort(raw: &str) -> Result<UserSort, AppError> {
    let invalid = || {
        AppError::invalid_fields(vec![FieldError::new(
            "sort",
            "Sort must be a JSON object like {\"createdAt\": -1}",
        )])
    };
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(raw).map_err(|_| invalid())?;
    let mut entries = map.into_iter();
    let (key, direction) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => return Err(invalid()),
    };
    let field = SortField::from_key(&key).ok_or_else(invalid)?;
    let descending = match direction.as_i64() {
        Some(1) => false,
        Some(-1) => true,
        _ => return Err(invalid()),
    };
    Ok(UserSort { field, descending })
}

pub fn parse_list_query(params: &ListUsersParams) -> Result<UserListQuery, AppError> {
    let page = parse_positive(params.page.as_deref()).unwrap_or(1);
    let limit = parse_positive(params.limit.as_deref())
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT);
    let sort = match params.sort.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_sort(raw)?,
        _ => UserSort::default(),
    };
    let role = match params.role.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<Role>().map_err(|_| {
            AppError::invalid_fields(vec![FieldError::new(
                "role",
                "Role must be one of: admin, hr, manager, user",
            )])
        })?),
        _ => None,
    };
    Ok(UserListQuery {
        page,
        limit,
        sort,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            admin_code: None,
        }
    }

    fn fields(err: AppError) -> Vec<&'static str> {
        match err {
            AppError::Validation { errors, .. } => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert!(!is_valid_email("@x.com"));
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }

    #[test]
    fn register_collects_every_field_error() {
        assert!(validate_register(&register("bob", "bob@x.com", "secret")).is_ok());
        assert_eq!(
            fields(validate_register(&register("", "nope", "123")).unwrap_err()),
            ["username", "email", "password"]
        );
        assert_eq!(
            fields(validate_register(&register("bo", "bob@x.com", "secret")).unwrap_err()),
            ["username"]
        );
        assert_eq!(
            fields(
                validate_register(&register("a".repeat(21).as_str(), "bob@x.com", "secret"))
                    .unwrap_err()
            ),
            ["username"]
        );
    }

    #[test]
    fn login_requires_email_and_password() {
        let ok = LoginRequest {
            email: " Bob@X.com ".into(),
            password: "x".into(),
        };
        assert!(validate_login(&ok).is_ok());

        let bad = LoginRequest {
            email: String::new(),
            password: String::new(),
        };
        assert_eq!(fields(validate_login(&bad).unwrap_err()), ["email", "password"]);
    }

    #[test]
    fn list_query_defaults_and_lenient_numbers() {
        let q = parse_list_query(&ListUsersParams::default()).unwrap();
        assert_eq!((q.page, q.limit), (1, 10));
        assert_eq!(q.sort, UserSort::default());
        assert_eq!(q.role, None);

        let q = parse_list_query(&ListUsersParams {
            page: Some("abc".into()),
            limit: Some("0".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!((q.page, q.limit), (1, 10));

        let q = parse_list_query(&ListUsersParams {
            page: Some("3".into()),
            limit: Some("1000".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!((q.page, q.limit), (3, 100));
    }

    #[test]
    fn list_query_sort_and_role() {
        let q = parse_list_query(&ListUsersParams {
            sort: Some(r#"{"username": 1}"#.into()),
            role: Some("hr".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(q.sort.field, SortField::Username);
        assert!(!q.sort.descending);
        assert_eq!(q.role, Some(Role::Hr));

        for bad in [r#"{"password": 1}"#, r#"{"createdAt": 2}"#, "createdAt", r#"{"email":1,"role":-1}"#] {
            let params = ListUsersParams {
                sort: Some(bad.into()),
                ..Default::default()
            };
            assert_eq!(fields(parse_list_query(&params).unwrap_err()), ["sort"], "{bad}");
        }

        let params = ListUsersParams {
            role: Some("employee".into()),
            ..Default::default()
        };
        assert_eq!(fields(parse_list_query(&params).unwrap_err()), ["role"]);
    }
}
