use std::str::FromStr;

/// Query string values the frontend sends empty when a filter is unset.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Parses an optional query parameter. Returns the offending text when it
/// does not parse.
pub fn parse_param<T: FromStr>(value: Option<String>) -> ::std::result::Result<Option<T>, String> {
    match non_empty(value) {
        None => Ok(None),
        Some(text) => text.parse::<T>().map(Some).map_err(|_| text),
    }
}
