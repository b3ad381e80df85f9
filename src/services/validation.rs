/// Validate username format and requirements
///
/// 3 to 50 characters of letters, digits, `_` or `-`, starting with a
/// letter or digit.
///
/// # Arguments
/// * `username` - Username to validate
///
/// # Returns
/// * `Result<(), String>` - Success or the message shown to the client
pub fn validate_username_format(username: &str) -> Result<(), String> {
    let Some(first) = username.chars().next() else {
        return Err("Username cannot be empty".to_string());
    };

    let length = username.chars().count();
    if length < 3 {
        return Err("Username must be at least 3 characters".to_string());
    }
    if length > 50 {
        return Err("Username must be at most 50 characters".to_string());
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err("Username can only contain letters, numbers, underscore, and hyphen".to_string());
    }

    if !first.is_alphanumeric() {
        return Err("Username must start with a letter or number".to_string());
    }

    Ok(())
}

/// Basic `local@domain.tld` shape check
pub fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format".to_string());
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format".to_string());
    };
    if local.is_empty() || domain.contains('@') {
        return Err("Invalid email format".to_string());
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() && !host.starts_with('.') => Ok(()),
        _ => Err("Invalid email format".to_string()),
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password cannot be empty".to_string());
    }
    Ok(())
}
