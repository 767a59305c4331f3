//! Ingest path rules

fn allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '-' | '/')
}

/// Every rule the relative ingest path breaks
pub fn validate(path: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if path.trim().is_empty() {
        errors.push("Ingest path is required".to_string());
        return errors;
    }
    if path.contains("..") {
        errors.push("Ingest path must not contain \"..\"".to_string());
    }
    if path.starts_with('/') {
        errors.push("Ingest path must be relative".to_string());
    }
    if path.contains('\0') {
        errors.push("Ingest path must not contain null bytes".to_string());
    }
    if path.contains('~') {
        errors.push("Ingest path must not contain \"~\"".to_string());
    }
    if !path.chars().all(|c| allowed(c) || c == '\0' || c == '~') {
        errors.push(
            "Ingest path may only contain letters, digits, spaces, \"_\", \".\", \"-\" and \"/\""
                .to_string(),
        );
    }

    errors
}
