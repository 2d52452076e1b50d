//! The closed set of US states accepted as `state_of_operation`.

/// `(full name, USPS abbreviation)` for all 50 states.
const US_STATES: [(&str, &str); 50] = [
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

/// Match a full state name, ignoring case and inner whitespace runs.
/// Returns the canonical name.
pub fn from_name(name: &str) -> Option<&'static str> {
    let wanted: Vec<&str> = name.split_whitespace().collect();
    US_STATES
        .iter()
        .map(|(full, _)| *full)
        .find(|full| {
            let parts: Vec<&str> = full.split(' ').collect();
            parts.len() == wanted.len()
                && parts
                    .iter()
                    .zip(&wanted)
                    .all(|(a, b)| a.eq_ignore_ascii_case(b))
        })
}

/// Match an uppercase two-letter abbreviation exactly. Returns the canonical name.
pub fn from_abbreviation(abbr: &str) -> Option<&'static str> {
    US_STATES
        .iter()
        .find(|(_, code)| *code == abbr)
        .map(|(full, _)| *full)
}

/// Lenient lookup for values from other sources: full name or abbreviation in any case.
pub fn lookup(value: &str) -> Option<&'static str> {
    let trimmed = value.trim().trim_end_matches('.');
    from_name(trimmed).or_else(|| from_abbreviation(&trimmed.to_ascii_uppercase()))
}

/// True when `value` is exactly a canonical full state name.
pub fn is_canonical(value: &str) -> bool {
    US_STATES.iter().any(|(full, _)| *full == value)
}
