/// Build the JSON-RPC endpoint for an entity, e.g. `{base}/client/123`
pub fn format_request_url(base_url: &str, method_class: &str, entity_id: u64) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), method_class, entity_id)
}

/// Parse an account identifier consisting of ASCII digits only.
///
/// Unlike `str::parse::<u64>`, a leading `+` is rejected.
pub fn parse_account_id(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
