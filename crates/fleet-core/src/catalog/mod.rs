//! Marketing-name catalog.
//!
//! Android exposes a device's *model number* (`SM-A725F`) far more reliably
//! than its *marketing name* (`Galaxy A72`).  The operator wants to see the
//! latter, so the display name is resolved in three steps:
//!
//! 1. A marketing-name property reported by the device itself, if present and
//!    different from the model number.
//! 2. The static lookup tables in [`tables`].
//! 3. The raw model number, unchanged.
//!
//! Google is the exception that needs no table: Pixel model numbers already are
//! marketing names, so step 3 returns the right answer.

pub mod tables;

use tables::{ONEPLUS_MODELS, SAMSUNG_MODELS, XIAOMI_MODELS};

/// Samsung appends this to the model number of dual-SIM variants.
const DUAL_SIM_SUFFIX: &str = "/DS";

/// Looks up the marketing name for `model_number` in the static tables.
///
/// Returns `None` when the model is unknown, including Pixel models, whose
/// model number is used as-is by [`resolve_product_name`].
pub fn marketing_name(model_number: &str) -> Option<&'static str> {
    let clean = model_number.trim().replace(DUAL_SIM_SUFFIX, "");
    if clean.is_empty() {
        return None;
    }

    [SAMSUNG_MODELS, XIAOMI_MODELS, ONEPLUS_MODELS]
        .iter()
        .flat_map(|table| table.iter())
        .find(|(model, _)| *model == clean)
        .map(|(_, name)| *name)
}

/// Picks the display name for a device.
///
/// `reported` is the first non-empty marketing-name property the device
/// returned (empty when it reported none).
pub fn resolve_product_name(reported: &str, model_number: &str) -> String {
    let reported = reported.trim();
    let model_number = model_number.trim();

    if !reported.is_empty() && reported != model_number {
        return reported.to_string();
    }

    marketing_name(model_number)
        .map(str::to_string)
        .unwrap_or_else(|| model_number.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marketing_name_finds_samsung_model() {
        assert_eq!(marketing_name("SM-A725F"), Some("Galaxy A72"));
    }

    #[test]
    fn test_marketing_name_strips_dual_sim_suffix() {
        assert_eq!(marketing_name("SM-A725F/DS"), Some("Galaxy A72"));
    }

    #[test]
    fn test_marketing_name_finds_xiaomi_and_oneplus_models() {
        assert_eq!(marketing_name("M2101K6G"), Some("Mi 11"));
        assert_eq!(marketing_name("CPH2449"), Some("OnePlus 11"));
    }

    #[test]
    fn test_marketing_name_returns_none_for_unknown_or_empty() {
        assert_eq!(marketing_name("XQ-BC72"), None);
        assert_eq!(marketing_name(""), None);
        assert_eq!(marketing_name("Pixel 7"), None);
    }

    #[test]
    fn test_resolve_prefers_reported_name_when_distinct_from_model() {
        // Arrange: device reports a name even though the table knows the model
        let reported = "Galaxy A72 (2021)";

        // Act
        let name = resolve_product_name(reported, "SM-A725F");

        // Assert
        assert_eq!(name, "Galaxy A72 (2021)");
    }

    #[test]
    fn test_resolve_ignores_reported_name_equal_to_model() {
        assert_eq!(resolve_product_name("SM-A725F", "SM-A725F"), "Galaxy A72");
    }

    #[test]
    fn test_resolve_falls_back_to_table_when_nothing_reported() {
        assert_eq!(resolve_product_name("", "SM-S918B"), "Galaxy S23 Ultra");
    }

    #[test]
    fn test_resolve_falls_back_to_raw_model_number() {
        assert_eq!(resolve_product_name("", "Pixel 7"), "Pixel 7");
        assert_eq!(resolve_product_name("  ", "XQ-BC72"), "XQ-BC72");
    }

    #[test]
    fn test_resolve_with_nothing_known_is_empty() {
        assert_eq!(resolve_product_name("", ""), "");
    }
}
