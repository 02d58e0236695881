/// Interprets an optional environment value as a boolean flag.
///
/// Accepts `1/true/yes/on` and `0/false/no/off` in any case. Anything else, including a missing value, yields
/// `default`.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let Some(raw) = value else { return default };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
