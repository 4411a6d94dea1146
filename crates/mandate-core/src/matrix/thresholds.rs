use serde::{Deserialize, Serialize};

/// Financial-impact cut-offs used by the classifier.
///
/// A value equal to a threshold belongs to the stricter tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactThresholds {
    #[serde(default = "default_notification")]
    pub notification: i64,
    #[serde(default = "default_cross_functional")]
    pub cross_functional: i64,
    #[serde(default = "default_board")]
    pub board: i64,
}

fn default_notification() -> i64 {
    500_000
}

fn default_cross_functional() -> i64 {
    2_000_000
}

fn default_board() -> i64 {
    10_000_000
}

impl Default for ImpactThresholds {
    fn default() -> Self {
        Self {
            notification: default_notification(),
            cross_functional: default_cross_functional(),
            board: default_board(),
        }
    }
}

impl ImpactThresholds {
    /// Thresholds must be positive and strictly ascending.
    pub fn is_ordered(&self) -> bool {
        0 < self.notification
            && self.notification < self.cross_functional
            && self.cross_functional < self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ordered() {
        let t = ImpactThresholds::default();
        assert!(t.is_ordered());
        assert_eq!(t.notification, 500_000);
        assert_eq!(t.board, 10_000_000);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let t: ImpactThresholds = serde_json::from_str(r#"{"board": 25000000}"#).unwrap();
        assert_eq!(t.board, 25_000_000);
        assert_eq!(t.cross_functional, 2_000_000);
    }

    #[test]
    fn inverted_is_rejected() {
        let t = ImpactThresholds {
            notification: 3_000_000,
            cross_functional: 2_000_000,
            board: 10_000_000,
        };
        assert!(!t.is_ordered());
    }
}
