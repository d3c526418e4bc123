use serde_json::Value;
use unicode_normalization::{is_nfc, UnicodeNormalization};

use crate::record::WritingType;

/// Reviewer code marking a line as Uchen script.
const UCHEN_CODE: i64 = 2;
/// Reviewer code marking a line as non-Uchen script.
const NON_UCHEN_CODE: i64 = 1;

/// Keep scheme, authority and path of an image URL; drop query and fragment.
///
/// The kept part is returned byte for byte: no case folding, port
/// normalization, dot-segment resolution or percent-encoding.
pub fn parse_image_url(raw: &str) -> String {
    match raw.find(&['?', '#'][..]) {
        Some(idx) => raw[..idx].to_string(),
        None => raw.to_string(),
    }
}

/// Integral reviewer codes from a raw `accept` list.
///
/// `2.0` counts as `2` and booleans as `0`/`1`; strings, fractions and other
/// values can never match a code and are dropped.
pub fn review_codes(accept: &[Value]) -> Vec<i64> {
    accept
        .iter()
        .filter_map(|v| match v {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            _ => None,
        })
        .collect()
}

/// `2` wins over `1`; anything else is `Others`.
pub fn get_writing_type(accept: &[i64]) -> WritingType {
    if accept.contains(&UCHEN_CODE) {
        WritingType::Uchen
    } else if accept.contains(&NON_UCHEN_CODE) {
        WritingType::NonUchen
    } else {
        WritingType::Others
    }
}

/// NFC-normalize transcribed text so combining sequences compare byte-equal.
pub fn convert_unicode_to_tibetan(text: &str) -> String {
    if is_nfc(text) {
        return text.to_string();
    }
    text.nfc().collect()
}
