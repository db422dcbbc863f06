pub const OVERPASS_URL: &str = "http://overpass-api.de/api/interpreter";

pub const USER_AGENT: &str = "cycleLanes";

/// Server-side query timeout, seconds.
pub const QUERY_TIMEOUT_SECS: u32 = 1200;

/// Directory holding one `<name>.txt` boundary per region.
pub const BOUNDARY_PATH: &str = "./shapefiles";

/// Regions measured by the current-state run. Netherlands adds a nationwide average.
pub const CURRENT_CITIES: [&str; 32] = [
    "London",
    "Cambridge",
    "Leicester",
    "Liverpool",
    "Cardiff",
    "Birmingham",
    "ParisMetropolitan",
    "Berlin",
    "Copenhagen",
    "Amsterdam",
    "Rotterdam",
    "The Hague",
    "Utrecht",
    "Eindhoven",
    "Groningen",
    "Vienna",
    "Brussels",
    "Madrid",
    "Rome",
    "Stockholm",
    "Helsinki",
    "Warsaw",
    "Newcastle",
    "Manchester",
    "Glasgow",
    "Bristol",
    "Oxford",
    "Edinburgh",
    "Leeds",
    "Dublin",
    "Zurich",
    "Netherlands",
];

/// Regions measured by the historic run.
pub const HISTORIC_CITIES: [&str; 6] = [
    "London",
    "Cambridge",
    "Leicester",
    "Liverpool",
    "Cardiff",
    "Birmingham",
];
