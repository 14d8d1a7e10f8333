/// Trims `value` and drops it when nothing is left.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Like [`non_blank`] but fails with "`field` is required".
pub fn required(field: &str, value: Option<String>) -> Result<String, String> {
    non_blank(value).ok_or_else(|| format!("{field} is required"))
}

/// [`required`] plus the character limit of the column it lands in.
pub fn required_max(field: &str, value: Option<String>, max: usize) -> Result<String, String> {
    let value = required(field, value)?;
    check_length(field, &value, max)?;
    Ok(value)
}

/// [`non_blank`] plus a character limit on whatever remains.
pub fn optional_max(
    field: &str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, String> {
    let value = non_blank(value);
    if let Some(value) = &value {
        check_length(field, value, max)?;
    }
    Ok(value)
}

pub fn check_length(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{field} must be at most {max} characters"));
    }
    Ok(())
}
