//! Naming rules shared by the project and resource validators.

use std::sync::OnceLock;

use regex::Regex;

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("naming pattern is a valid regex"))
}

/// GCP project ids: 6-30 characters, lowercase letters, digits and hyphens, starting with a letter.
pub fn is_project_id(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[a-z][-a-z0-9]{4,28}[a-z0-9]$").is_match(value)
}

pub fn is_email(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_match(value)
}

pub fn is_numeric_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Bucket names: 3-63 characters of lowercase letters, digits, dashes, underscores and dots,
/// starting and ending with a letter or digit.
pub fn is_bucket_name(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[a-z0-9][a-z0-9._-]{1,61}[a-z0-9]$").is_match(value)
}

/// Dataset ids: letters, digits and underscores, at most 1024 characters.
pub fn is_dataset_id(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[A-Za-z0-9_]{1,1024}$").is_match(value)
}

/// Instance names: RFC 1035 labels of at most 63 characters.
pub fn is_instance_name(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[a-z]([-a-z0-9]{0,61}[a-z0-9])?$").is_match(value)
}
