//! Option maps, page formats and layered option merging.
//!
//! Options travel as free-form JSON objects. Each operation starts from its
//! component defaults, overlays the facade configuration and finally the
//! caller's options, so per-call values always win. Keys the facade does not
//! know about are carried through untouched for the provider to interpret.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form option map handed from callers to providers.
pub type OptionMap = Map<String, Value>;

/// Default margin applied to every side of rendered HTML pages.
pub const DEFAULT_RENDER_MARGIN: &str = "20px";

/// Paper sizes understood by the renderer and the text composer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageFormat {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Ledger,
}

impl PageFormat {
    /// Page size in PDF points (1/72 inch), portrait orientation.
    pub fn size_points(&self) -> (f32, f32) {
        match self {
            Self::A3 => (841.89, 1190.55),
            Self::A4 => (595.28, 841.89),
            Self::A5 => (419.53, 595.28),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            Self::Tabloid => (792.0, 1224.0),
            Self::Ledger => (1224.0, 792.0),
        }
    }

    /// Page size in inches, as expected by the DevTools print API.
    pub fn size_inches(&self) -> (f64, f64) {
        let (w, h) = self.size_points();
        (f64::from(w) / 72.0, f64::from(h) / 72.0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::Letter => "Letter",
            Self::Legal => "Legal",
            Self::Tabloid => "Tabloid",
            Self::Ledger => "Ledger",
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a3" => Ok(Self::A3),
            "a4" => Ok(Self::A4),
            "a5" => Ok(Self::A5),
            "letter" => Ok(Self::Letter),
            "legal" => Ok(Self::Legal),
            "tabloid" => Ok(Self::Tabloid),
            "ledger" => Ok(Self::Ledger),
            _ => Err(format!(
                "Invalid page format '{}'. Valid options: A3, A4, A5, Letter, Legal, Tabloid, Ledger",
                s
            )),
        }
    }
}

impl TryFrom<String> for PageFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PageFormat> for String {
    fn from(format: PageFormat) -> Self {
        format.as_str().to_string()
    }
}

/// Advisory rendering quality. Providers may ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityHint {
    Low,
    Medium,
    #[default]
    High,
}

impl QualityHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for QualityHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!(
                "Invalid quality '{}'. Valid options: low, medium, high",
                s
            )),
        }
    }
}

/// Merge option layers, later layers taking precedence.
///
/// Nested objects are merged key by key (so a caller can override a single
/// margin side), any other value replaces the earlier one. A `null` in a
/// later layer leaves the earlier value in place.
pub fn merge_options(layers: &[&OptionMap]) -> OptionMap {
    let mut merged = OptionMap::new();
    for layer in layers {
        merge_into(&mut merged, layer);
    }
    merged
}

fn merge_into(target: &mut OptionMap, overlay: &OptionMap) {
    for (key, value) in overlay {
        match (target.get_mut(key), value) {
            (_, Value::Null) => {}
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Component defaults for HTML rendering.
pub fn render_defaults(format: PageFormat, quality: QualityHint) -> OptionMap {
    let mut margin = OptionMap::new();
    for side in ["top", "bottom", "left", "right"] {
        margin.insert(side.to_string(), Value::from(DEFAULT_RENDER_MARGIN));
    }

    let mut defaults = OptionMap::new();
    defaults.insert("format".to_string(), Value::from(format.as_str()));
    defaults.insert("printBackground".to_string(), Value::Bool(true));
    defaults.insert("margin".to_string(), Value::Object(margin));
    defaults.insert("quality".to_string(), Value::from(quality.as_str()));
    defaults
}

/// Read a string option, ignoring empty strings.
pub fn option_str<'a>(options: &'a OptionMap, key: &str) -> Option<&'a str> {
    options
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Read a boolean option. Accepts JSON booleans and "true"/"false" strings,
/// since multipart and query inputs arrive as text.
pub fn option_bool(options: &OptionMap, key: &str) -> Option<bool> {
    match options.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read a numeric option. Accepts JSON numbers and numeric strings.
pub fn option_f64(options: &OptionMap, key: &str) -> Option<f64> {
    match options.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Page format named by the first of `keys` that holds a valid format.
pub fn option_page_format(options: &OptionMap, keys: &[&str]) -> Option<PageFormat> {
    keys.iter()
        .filter_map(|key| option_str(options, key))
        .find_map(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> OptionMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_page_format_parse_case_insensitive() {
        assert_eq!("a4".parse::<PageFormat>().unwrap(), PageFormat::A4);
        assert_eq!("LETTER".parse::<PageFormat>().unwrap(), PageFormat::Letter);
        assert_eq!(" Legal ".parse::<PageFormat>().unwrap(), PageFormat::Legal);
        assert!("B5".parse::<PageFormat>().is_err());
    }

    #[test]
    fn test_page_format_serde() {
        let format: PageFormat = serde_json::from_str("\"tabloid\"").unwrap();
        assert_eq!(format, PageFormat::Tabloid);
        assert_eq!(serde_json::to_string(&PageFormat::A5).unwrap(), "\"A5\"");
    }

    #[test]
    fn test_letter_inches() {
        let (w, h) = PageFormat::Letter.size_inches();
        assert!((w - 8.5).abs() < 1e-9);
        assert!((h - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_later_layers_win() {
        let defaults = map(json!({"format": "A4", "printBackground": true}));
        let caller = map(json!({"format": "Letter", "landscape": true}));

        let merged = merge_options(&[&defaults, &caller]);
        assert_eq!(merged["format"], "Letter");
        assert_eq!(merged["printBackground"], true);
        assert_eq!(merged["landscape"], true);
    }

    #[test]
    fn test_merge_nested_margin_per_side() {
        let defaults = render_defaults(PageFormat::A4, QualityHint::High);
        let caller = map(json!({"margin": {"top": "1in"}}));

        let merged = merge_options(&[&defaults, &caller]);
        assert_eq!(merged["margin"]["top"], "1in");
        assert_eq!(merged["margin"]["bottom"], DEFAULT_RENDER_MARGIN);
        assert_eq!(merged["margin"]["left"], DEFAULT_RENDER_MARGIN);
    }

    #[test]
    fn test_merge_null_keeps_previous() {
        let defaults = map(json!({"format": "A4"}));
        let caller = map(json!({"format": null}));
        let merged = merge_options(&[&defaults, &caller]);
        assert_eq!(merged["format"], "A4");
    }

    #[test]
    fn test_merge_passes_unknown_keys() {
        let caller = map(json!({"vendorFlag": {"x": 1}}));
        let merged = merge_options(&[&OptionMap::new(), &caller]);
        assert_eq!(merged["vendorFlag"]["x"], 1);
    }

    #[test]
    fn test_option_readers_accept_strings() {
        let options = map(json!({"landscape": "true", "scale": "0.5", "title": "  "}));
        assert_eq!(option_bool(&options, "landscape"), Some(true));
        assert_eq!(option_f64(&options, "scale"), Some(0.5));
        assert_eq!(option_str(&options, "title"), None);
    }

    #[test]
    fn test_option_page_format_falls_through_keys() {
        let options = map(json!({"size": "bogus", "format": "a3"}));
        assert_eq!(
            option_page_format(&options, &["size", "format"]),
            Some(PageFormat::A3)
        );
    }
}
