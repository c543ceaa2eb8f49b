use std::env;
use std::sync::OnceLock;

static LANELINK_UNTRACKED: OnceLock<bool> = OnceLock::new();

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

pub(crate) fn untracked() -> bool {
    *LANELINK_UNTRACKED.get_or_init(|| match env::var("LANELINK_UNTRACKED") {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value),
        _ => false,
    })
}
