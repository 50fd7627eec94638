use chrono::Utc;

/// `<UTC timestamp>_<6 char id>`, e.g. `2026-01-05T11-30-02Z_a1b2c3`.
pub fn generate_correlation_id() -> String {
    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
    let short = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", timestamp, &short[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_format() {
        let id = generate_correlation_id();
        let (stamp, short) = id.split_once('_').unwrap();
        assert_eq!(stamp.len(), "2026-01-05T11-30-02Z".len());
        assert!(stamp.ends_with('Z'));
        assert_eq!(short.len(), 6);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn correlation_ids_differ() {
        assert_ne!(generate_correlation_id(), generate_correlation_id());
    }
}
