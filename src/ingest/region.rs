use crate::models::job::HiringRegion;

const BRAZIL_TOKENS: &[&str] = &[
    "brazil",
    "brasil",
    "brazilian",
    "brazilians",
    "brasileiro",
    "brasileira",
    "brasileiros",
    "brasileiras",
];

const BRAZIL_CODES: &[&str] = &["br", "bra"];

const LATAM_TOKENS: &[&str] = &[
    "latam",
    "latin america",
    "latin american",
    "latin americans",
    "latinoamerica",
    "latinoamérica",
    "latinoamericano",
    "latinoamericana",
    "latinoamericanos",
    "latinoamericanas",
    "america latina",
    "américa latina",
    "south america",
    "south american",
    "central america",
    "central american",
    "argentina",
    "bolivia",
    "chile",
    "colombia",
    "costa rica",
    "cuba",
    "dominican republic",
    "ecuador",
    "el salvador",
    "guatemala",
    "honduras",
    "mexico",
    "méxico",
    "nicaragua",
    "panama",
    "panamá",
    "paraguay",
    "peru",
    "perú",
    "puerto rico",
    "uruguay",
    "venezuela",
];

/// ISO alpha-2/alpha-3 codes, only trusted in a dedicated country field.
const LATAM_CODES: &[&str] = &[
    "ar", "arg", "bo", "bol", "cl", "chl", "co", "col", "cr", "cri", "cu", "cub", "do", "dom",
    "ec", "ecu", "sv", "slv", "gt", "gtm", "hn", "hnd", "mx", "mex", "ni", "nic", "pa", "pan",
    "py", "pry", "pe", "per", "pr", "pri", "uy", "ury", "ve", "ven",
];

/// Classify a posting's hiring region from its location text and country field.
///
/// Brazil wins over LATAM, and anything without a regional signal is WORLDWIDE.
pub fn classify(location: &str, country: Option<&str>) -> HiringRegion {
    let text = words(&format!("{location} {}", country.unwrap_or_default()));
    let code = country.map(|c| c.trim().to_lowercase());
    let code = code.as_deref();

    if has_token(&text, BRAZIL_TOKENS) || code.is_some_and(|c| BRAZIL_CODES.contains(&c)) {
        HiringRegion::Brazil
    } else if has_token(&text, LATAM_TOKENS) || code.is_some_and(|c| LATAM_CODES.contains(&c)) {
        HiringRegion::Latam
    } else {
        HiringRegion::Worldwide
    }
}

/// Lowercase, split on anything that is not alphanumeric, pad with spaces so
/// tokens can be matched on whole-word boundaries.
fn words(s: &str) -> String {
    let lowered = s.to_lowercase();
    let parts: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    format!(" {} ", parts.join(" "))
}

fn has_token(text: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| text.contains(&format!(" {t} ")))
}

/// Whole-word, case-insensitive check of free text against a token table.
pub fn mentions_any(text: &str, tokens: &[&str]) -> bool {
    has_token(&words(text), tokens)
}
