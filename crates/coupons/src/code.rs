use uuid::Uuid;

/// Generate a coupon code: `SQ-` plus the last 8 hex chars of a UUIDv7,
/// uppercased. The tail is random per UUID, so codes minted back to back in
/// the same millisecond still differ; the leading chars are the timestamp and
/// would collide for every code in a ~65-second window.
pub fn generate_code() -> String {
    let hex = Uuid::now_v7().simple().to_string();
    format!("SQ-{}", hex[24..].to_uppercase())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn code_shape() {
        let code = generate_code();
        assert!(code.starts_with("SQ-"));
        assert_eq!(code.len(), 11);
        assert!(code[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn codes_minted_in_a_burst_are_distinct() {
        // All of these land within one timestamp tick; only the random tail
        // keeps them apart.
        let codes: HashSet<String> = (0..64).map(|_| generate_code()).collect();
        assert_eq!(codes.len(), 64);
    }
}
