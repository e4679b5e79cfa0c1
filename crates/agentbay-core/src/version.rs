//! SDK version reported to the service.

/// SDK version, overridable at build time through `AGENTBAY_SDK_VERSION`.
pub const VERSION: &str = match option_env!("AGENTBAY_SDK_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

/// `User-Agent` header value.
#[must_use]
pub fn user_agent() -> String {
    format!("agentbay-rust-sdk/{VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent() {
        assert!(user_agent().starts_with("agentbay-rust-sdk/"));
        assert!(!VERSION.is_empty());
    }
}
