//! Static model-number → marketing-name tables.
//!
//! Each table is a sorted-by-family slice of `(model_number, marketing_name)`
//! pairs.  Lookups are a linear scan: the tables are small and a lookup runs
//! at most once per online device per poll cycle.
//!
//! Model numbers are stored without the Samsung dual-SIM `/DS` suffix; callers
//! strip it before looking up (see [`super::marketing_name`]).

/// Samsung Galaxy S, A, Note, Z and M series.
pub const SAMSUNG_MODELS: &[(&str, &str)] = &[
    ("SM-S918U", "Galaxy S23 Ultra"),
    ("SM-S918B", "Galaxy S23 Ultra"),
    ("SM-S918N", "Galaxy S23 Ultra"),
    ("SM-S916U", "Galaxy S23+"),
    ("SM-S916B", "Galaxy S23+"),
    ("SM-S911U", "Galaxy S23"),
    ("SM-S911B", "Galaxy S23"),
    ("SM-S908U", "Galaxy S22 Ultra"),
    ("SM-S908B", "Galaxy S22 Ultra"),
    ("SM-S906U", "Galaxy S22+"),
    ("SM-S906B", "Galaxy S22+"),
    ("SM-S901U", "Galaxy S22"),
    ("SM-S901B", "Galaxy S22"),
    ("SM-G998U", "Galaxy S21 Ultra"),
    ("SM-G998B", "Galaxy S21 Ultra"),
    ("SM-G996U", "Galaxy S21+"),
    ("SM-G996B", "Galaxy S21+"),
    ("SM-G991U", "Galaxy S21"),
    ("SM-G991B", "Galaxy S21"),
    ("SM-A725F", "Galaxy A72"),
    ("SM-A725M", "Galaxy A72"),
    ("SM-A726B", "Galaxy A72 5G"),
    ("SM-A715F", "Galaxy A71"),
    ("SM-A716B", "Galaxy A71 5G"),
    ("SM-A546B", "Galaxy A54 5G"),
    ("SM-A546E", "Galaxy A54 5G"),
    ("SM-A536B", "Galaxy A53 5G"),
    ("SM-A536E", "Galaxy A53 5G"),
    ("SM-A525F", "Galaxy A52"),
    ("SM-A526B", "Galaxy A52 5G"),
    ("SM-A515F", "Galaxy A51"),
    ("SM-A516B", "Galaxy A51 5G"),
    ("SM-A346B", "Galaxy A34 5G"),
    ("SM-A336B", "Galaxy A33 5G"),
    ("SM-A326B", "Galaxy A32 5G"),
    ("SM-A325F", "Galaxy A32"),
    ("SM-A245F", "Galaxy A24"),
    ("SM-A235F", "Galaxy A23"),
    ("SM-A225F", "Galaxy A22"),
    ("SM-A217F", "Galaxy A21s"),
    ("SM-A146B", "Galaxy A14 5G"),
    ("SM-A145F", "Galaxy A14"),
    ("SM-A135F", "Galaxy A13"),
    ("SM-A125F", "Galaxy A12"),
    ("SM-A115F", "Galaxy A11"),
    ("SM-N986U", "Galaxy Note20 Ultra"),
    ("SM-N986B", "Galaxy Note20 Ultra"),
    ("SM-N981U", "Galaxy Note20"),
    ("SM-N981B", "Galaxy Note20"),
    ("SM-F936U", "Galaxy Z Fold4"),
    ("SM-F936B", "Galaxy Z Fold4"),
    ("SM-F926U", "Galaxy Z Fold3"),
    ("SM-F926B", "Galaxy Z Fold3"),
    ("SM-F721U", "Galaxy Z Flip4"),
    ("SM-F721B", "Galaxy Z Flip4"),
    ("SM-F711U", "Galaxy Z Flip3"),
    ("SM-F711B", "Galaxy Z Flip3"),
    ("SM-M546B", "Galaxy M54 5G"),
    ("SM-M536B", "Galaxy M53 5G"),
    ("SM-M526B", "Galaxy M52 5G"),
    ("SM-M336B", "Galaxy M33 5G"),
    ("SM-M326B", "Galaxy M32 5G"),
];

/// Xiaomi, Redmi and Mi devices.
pub const XIAOMI_MODELS: &[(&str, &str)] = &[
    ("M2101K6G", "Mi 11"),
    ("M2102K1G", "Mi 11 Lite 5G"),
    ("2201123G", "Redmi Note 11 Pro 5G"),
    ("2201117TG", "Redmi Note 11"),
    ("21061119DG", "11T Pro"),
    ("21061119AG", "11T"),
];

/// OnePlus devices (CPH/LE/IN model numbers).
pub const ONEPLUS_MODELS: &[(&str, &str)] = &[
    ("CPH2449", "OnePlus 11"),
    ("CPH2413", "OnePlus 10 Pro"),
    ("LE2123", "OnePlus 9 Pro"),
    ("LE2121", "OnePlus 9"),
    ("IN2023", "OnePlus 8 Pro"),
    ("IN2013", "OnePlus 8"),
];
