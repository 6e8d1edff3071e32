//! Windows `%VAR%` expansion for configured paths.

/// Expand Windows-style `%VARIABLE%` references against the current
/// environment. Unknown variables are left in place so the caller can
/// see what failed to resolve.
pub fn expand_windows_env_vars(path: &str) -> String {
    let mut result = path.to_string();
    if !result.contains('%') {
        return result;
    }

    let mut search_from = 0;
    while let Some(start) = result[search_from..].find('%') {
        let start = search_from + start;
        let Some(end) = result[start + 1..].find('%') else {
            break;
        };
        let end = start + 1 + end;
        let var_name = result[start + 1..end].to_string();

        match std::env::var(&var_name) {
            Ok(value) => {
                result.replace_range(start..=end, &value);
                search_from = start + value.len();
            }
            Err(_) => {
                // Leave the unresolved token and continue past it
                search_from = end + 1;
            }
        }
    }
    result
}
