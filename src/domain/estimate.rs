use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A priced quote for a proposed ride.
///
/// Deserializes from the estimate service body
/// `{ "price": 24.5, "duration_min": 18, "distance_km": 6.2 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(rename = "duration_min")]
    pub duration_minutes: u32,
    pub distance_km: f64,
}

impl Estimate {
    /// The synthetic quote substituted when the estimate service answers
    /// with a non-success status.
    pub fn fallback() -> Self {
        Self {
            price: dec!(24.50),
            duration_minutes: 18,
            distance_km: 6.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_deserialization() {
        let body = r#"{"price": 11.75, "distance_km": 5.5, "duration_min": 15}"#;
        let estimate: Estimate = serde_json::from_str(body).unwrap();

        assert_eq!(estimate.price, dec!(11.75));
        assert_eq!(estimate.duration_minutes, 15);
        assert_eq!(estimate.distance_km, 5.5);
    }

    #[test]
    fn test_estimate_rejects_missing_fields() {
        let body = r#"{"price": 11.75}"#;
        assert!(serde_json::from_str::<Estimate>(body).is_err());
    }

    #[test]
    fn test_fallback_values() {
        let fallback = Estimate::fallback();
        assert_eq!(fallback.price, dec!(24.5));
        assert_eq!(fallback.duration_minutes, 18);
        assert_eq!(fallback.distance_km, 6.2);
    }
}
