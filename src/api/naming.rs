/// Uppercase the first character of `key`, leaving the rest untouched.
pub fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `count` -> `useCount`
pub fn hook_name(key: &str) -> String {
    format!("use{}", capitalize(key))
}

/// `count` -> `setCount`
pub fn setter_name(key: &str) -> String {
    format!("set{}", capitalize(key))
}
