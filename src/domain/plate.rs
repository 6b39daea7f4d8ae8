//! License plate normalization
//!
//! The CRNN recognizer post-processing converts most letters to digits, so a
//! reading is treated as a digit string with an embedded two-digit province
//! code. Malformed input is never rejected; the pipeline always gets *some*
//! plate string back.

/// Fallback region for unknown province codes and degraded input
pub const DEFAULT_REGION: &str = "بغداد";

/// Province code -> governorate, first two digits of the plate number
const PROVINCE_MAP: &[(&str, &str)] = &[
    ("11", "بغداد"),
    ("12", "بغداد"),
    ("13", "بغداد"),
    ("14", "بغداد"),
    ("15", "بغداد"),
    ("16", "بغداد"),
    ("21", "البصرة"),
    ("22", "البصرة"),
    ("31", "نينوى"),
    ("32", "نينوى"),
    ("41", "أربيل"),
    ("42", "أربيل"),
    ("51", "النجف"),
    ("52", "النجف"),
    ("61", "كربلاء"),
    ("62", "كربلاء"),
    ("71", "ديالى"),
    ("72", "ديالى"),
    ("81", "الأنبار"),
    ("82", "الأنبار"),
    ("91", "واسط"),
    ("92", "واسط"),
];

fn region_for(province_code: &str) -> &'static str {
    PROVINCE_MAP
        .iter()
        .find(|(code, _)| *code == province_code)
        .map(|(_, region)| *region)
        .unwrap_or(DEFAULT_REGION)
}

/// A normalized plate reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPlate {
    pub code: String,
    pub region: String,
}

/// Normalize raw recognizer text into a plate code and region label.
///
/// Strips everything outside ASCII alphanumerics and the Arabic block. If the
/// digit-only view has at least 5 digits, the first two are a province code
/// and the rest the plate number, joined as `"<province>-<number>"`. Shorter
/// readings come back as the cleaned text with the default region.
pub fn normalize(raw_text: &str) -> NormalizedPlate {
    let cleaned: String = raw_text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || ('\u{0600}'..='\u{06FF}').contains(c))
        .collect();

    if cleaned.is_empty() {
        return NormalizedPlate {
            code: raw_text.to_string(),
            region: DEFAULT_REGION.to_string(),
        };
    }

    let digits_only: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits_only.len() >= 5 {
        let province_code = &digits_only[..2];
        let plate_number = &digits_only[2..];
        return NormalizedPlate {
            code: format!("{}-{}", province_code, plate_number),
            region: region_for(province_code).to_string(),
        };
    }

    NormalizedPlate { code: cleaned, region: DEFAULT_REGION.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_with_province_code() {
        let plate = normalize("2198765");
        assert_eq!(plate.code, "21-98765");
        assert_eq!(plate.region, "البصرة");
    }

    #[test]
    fn test_normalize_strips_noise() {
        let plate = normalize(" 41*123.45 ");
        assert_eq!(plate.code, "41-12345");
        assert_eq!(plate.region, "أربيل");
    }

    #[test]
    fn test_unknown_province_falls_back() {
        let plate = normalize("0512345");
        assert_eq!(plate.code, "05-12345");
        assert_eq!(plate.region, DEFAULT_REGION);
    }

    #[test]
    fn test_short_reading_returned_cleaned() {
        let plate = normalize("A12-3");
        assert_eq!(plate.code, "A123");
        assert_eq!(plate.region, DEFAULT_REGION);
    }

    #[test]
    fn test_empty_after_cleaning_keeps_raw() {
        let plate = normalize("!!??");
        assert_eq!(plate.code, "!!??");
        assert_eq!(plate.region, DEFAULT_REGION);
    }

    #[test]
    fn test_arabic_text_preserved() {
        let plate = normalize("بغداد");
        assert_eq!(plate.code, "بغداد");
        assert_eq!(plate.region, DEFAULT_REGION);
    }

    #[test]
    fn test_never_panics_on_garbage() {
        for raw in ["", "   ", "\u{0000}", "99", "абв"] {
            let _ = normalize(raw);
        }
    }
}
