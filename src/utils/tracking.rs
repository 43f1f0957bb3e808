use rand::Rng;

pub const TRACKING_PREFIX: &str = "TRK";

/// `TRK` followed by 16 random bytes in lowercase hex.
pub fn generate_tracking_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    format!("{}{}", TRACKING_PREFIX, hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_id_shape() {
        let id = generate_tracking_id();
        assert!(id.starts_with(TRACKING_PREFIX));
        assert_eq!(id.len(), 3 + 32);
        assert!(id[3..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tracking_ids_differ() {
        assert_ne!(generate_tracking_id(), generate_tracking_id());
    }
}
