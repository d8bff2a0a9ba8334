//! US states and DC: name, postal abbreviation, FIPS state code

/// (name, abbreviation, state FIPS)
const STATES: [(&str, &str, u32); 51] = [
    ("Alabama", "AL", 1),
    ("Alaska", "AK", 2),
    ("Arizona", "AZ", 4),
    ("Arkansas", "AR", 5),
    ("California", "CA", 6),
    ("Colorado", "CO", 8),
    ("Connecticut", "CT", 9),
    ("Delaware", "DE", 10),
    ("District of Columbia", "DC", 11),
    ("Florida", "FL", 12),
    ("Georgia", "GA", 13),
    ("Hawaii", "HI", 15),
    ("Idaho", "ID", 16),
    ("Illinois", "IL", 17),
    ("Indiana", "IN", 18),
    ("Iowa", "IA", 19),
    ("Kansas", "KS", 20),
    ("Kentucky", "KY", 21),
    ("Louisiana", "LA", 22),
    ("Maine", "ME", 23),
    ("Maryland", "MD", 24),
    ("Massachusetts", "MA", 25),
    ("Michigan", "MI", 26),
    ("Minnesota", "MN", 27),
    ("Mississippi", "MS", 28),
    ("Missouri", "MO", 29),
    ("Montana", "MT", 30),
    ("Nebraska", "NE", 31),
    ("Nevada", "NV", 32),
    ("New Hampshire", "NH", 33),
    ("New Jersey", "NJ", 34),
    ("New Mexico", "NM", 35),
    ("New York", "NY", 36),
    ("North Carolina", "NC", 37),
    ("North Dakota", "ND", 38),
    ("Ohio", "OH", 39),
    ("Oklahoma", "OK", 40),
    ("Oregon", "OR", 41),
    ("Pennsylvania", "PA", 42),
    ("Rhode Island", "RI", 44),
    ("South Carolina", "SC", 45),
    ("South Dakota", "SD", 46),
    ("Tennessee", "TN", 47),
    ("Texas", "TX", 48),
    ("Utah", "UT", 49),
    ("Vermont", "VT", 50),
    ("Virginia", "VA", 51),
    ("Washington", "WA", 53),
    ("West Virginia", "WV", 54),
    ("Wisconsin", "WI", 55),
    ("Wyoming", "WY", 56),
];

/// Postal abbreviation for a full state name (case-insensitive)
#[must_use]
pub fn state_abbrev(name: &str) -> Option<&'static str> {
    let name = name.trim();
    STATES
        .iter()
        .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, a, _)| *a)
}

/// FIPS state code for a postal abbreviation
#[must_use]
pub fn state_fips(abbrev: &str) -> Option<u32> {
    let abbrev = abbrev.trim();
    STATES
        .iter()
        .find(|(_, a, _)| a.eq_ignore_ascii_case(abbrev))
        .map(|(_, _, f)| *f)
}

/// Postal abbreviation for a FIPS state code
#[must_use]
pub fn abbrev_for_fips(code: u32) -> Option<&'static str> {
    STATES.iter().find(|(_, _, f)| *f == code).map(|(_, a, _)| *a)
}

/// Whether the abbreviation names a state or DC
#[must_use]
pub fn is_known_abbrev(abbrev: &str) -> bool {
    state_fips(abbrev).is_some()
}
