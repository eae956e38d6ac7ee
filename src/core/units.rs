//! Units of measure: canonical unit keys and their UN/CEFACT Recommendation 20 codes.
//!
//! Canonical items carry short unit keys (`h`, `kg`, `item`). XML dialects
//! need the Rec 20 code (`HUR`, `KGM`, `H87`). Producers may also put a Rec 20
//! code directly in the unit field; those pass through unchanged.

/// Rec 20 code for "one", used when an item has no unit.
pub const UNIT_ONE: &str = "C62";

/// Canonical unit key → Rec 20 code.
static UNIT_CODES: &[(&str, &str)] = &[
    ("%", "P1"),
    ("bag", "XBG"),
    ("bottle", "XBO"),
    ("box", "XBX"),
    ("can", "XCX"),
    ("carton", "XCT"),
    ("cm", "CMT"),
    ("cm2", "CMK"),
    ("cm3", "CMQ"),
    ("day", "DAY"),
    ("dozen", "DZN"),
    ("g", "GRM"),
    ("h", "HUR"),
    ("item", "H87"),
    ("kg", "KGM"),
    ("km", "KMT"),
    ("kw", "KWT"),
    ("kwh", "KWH"),
    ("l", "LTR"),
    ("m", "MTR"),
    ("m2", "MTK"),
    ("m3", "MTQ"),
    ("mg", "MGM"),
    ("min", "MIN"),
    ("ml", "MLT"),
    ("mm", "MMT"),
    ("month", "MON"),
    ("one", "C62"),
    ("pack", "XPK"),
    ("pair", "PR"),
    ("pallet", "XPX"),
    ("piece", "H87"),
    ("roll", "XRO"),
    ("s", "SEC"),
    ("service", "E48"),
    ("set", "SET"),
    ("sheet", "XST"),
    ("t", "TNE"),
    ("week", "WEE"),
    ("year", "ANN"),
];

/// Resolve the Rec 20 code for an item unit.
///
/// Missing units become [`UNIT_ONE`]. Values that already look like a Rec 20
/// code (upper-case alphanumerics) are kept; unknown lower-case keys also
/// fall back to [`UNIT_ONE`].
pub fn unece_code(unit: Option<&str>) -> String {
    let Some(unit) = unit.map(str::trim).filter(|u| !u.is_empty()) else {
        return UNIT_ONE.to_string();
    };
    if let Ok(i) = UNIT_CODES.binary_search_by(|(key, _)| (*key).cmp(unit)) {
        return UNIT_CODES[i].1.to_string();
    }
    if looks_like_rec20(unit) {
        unit.to_string()
    } else {
        UNIT_ONE.to_string()
    }
}

/// Canonical key for a Rec 20 code, if one exists. `H87` maps to `item`.
pub fn unit_key(code: &str) -> Option<&'static str> {
    match code {
        "H87" => Some("item"),
        _ => UNIT_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(key, _)| *key),
    }
}

fn looks_like_rec20(value: &str) -> bool {
    (2..=3).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
