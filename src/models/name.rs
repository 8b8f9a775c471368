//! The micro-grammar embedded in artboard and layer names.
//!
//! Names may carry settings after a colon: `Artboard1:600,fixed`,
//! `Layer1:svg`, `Map:png,inline`. The portion after the colon is a
//! comma-separated list where a bare number sets the width, `key=value`
//! assigns a setting, and a bare word is a boolean flag. Names are parsed
//! once at adapter-read time into [`ObjectSettings`]; the rest of the
//! pipeline never re-parses strings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix of the legacy width declaration (`artboard-600:...`), kept for
/// documents authored against older releases.
const LEGACY_WIDTH_PREFIX: &str = "artboard-";

/// A typed setting value parsed from a name annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

/// Settings parsed from an object name annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSettings {
    entries: IndexMap<String, SettingValue>,
}

impl ObjectSettings {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.entries.get(key)
    }

    /// A numeric setting, if present and numeric.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(SettingValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// True when the key is present as a true flag.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(SettingValue::Flag(true)))
    }

    /// The explicit width override, if any.
    pub fn width(&self) -> Option<f64> {
        self.number("width")
    }

    fn insert(&mut self, key: &str, value: SettingValue) {
        self.entries.insert(key.to_string(), value);
    }
}

/// Rendering-mode tags recognized as layer name suffixes. A layer named
/// `terrain:svg` exports as a vector image; unrecognized suffixes leave the
/// layer untagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerTag {
    Svg,
    Png,
    Div,
    Symbol,
    Snippet,
}

impl LayerTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerTag::Svg => "svg",
            LayerTag::Png => "png",
            LayerTag::Div => "div",
            LayerTag::Symbol => "symbol",
            LayerTag::Snippet => "snippet",
        }
    }
}

/// Replaces characters that are unsafe in HTML ids and class names.
pub fn make_keyword(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_sub = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            out.push(ch);
            last_was_sub = false;
        } else if !last_was_sub {
            out.push('_');
            last_was_sub = true;
        }
    }
    out
}

/// Removes the annotation (colon and everything after it) from a name and
/// keyword-sanitizes the remainder. A name with no annotation is sanitized
/// as-is.
pub fn clean_object_name(name: &str) -> String {
    match name.split_once(':') {
        Some((base, _)) if !base.is_empty() => make_keyword(base),
        _ => make_keyword(name),
    }
}

/// Parses the data encoded in an object name.
///
/// Examples: `Artboard1:600,fixed`, `Layer1:svg`, `Map:png,inline`,
/// `artboard-300:dynamic` (legacy width prefix).
pub fn parse_object_name(name: &str) -> ObjectSettings {
    let mut settings = ObjectSettings::default();

    // legacy width declaration at the start of the name
    if let Some(rest) = name.strip_prefix(LEGACY_WIDTH_PREFIX) {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(w) = digits.parse::<f64>() {
            if !digits.is_empty() {
                settings.insert("width", SettingValue::Number(w));
            }
        }
    }

    let mut settings_str = match name.split_once(':') {
        Some((_, after)) => after.to_string(),
        None => return settings,
    };

    // strip suffixes added when the host duplicates an object ("... copy 2")
    let lower = settings_str.to_ascii_lowercase();
    if let Some(pos) = lower.find(" copy") {
        settings_str.truncate(pos);
    }

    for part in settings_str.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, raw) = if part.chars().all(|c| c.is_ascii_digit()) {
            ("width", part)
        } else if let Some((k, v)) = part.split_once('=') {
            if k.is_empty() {
                continue;
            }
            (k, v)
        } else {
            (part, "true")
        };
        let value = if raw.chars().all(|c| c.is_ascii_digit()) && !raw.is_empty() {
            SettingValue::Number(raw.parse().unwrap_or(0.0))
        } else if raw == "true" || raw == "yes" {
            SettingValue::Flag(true)
        } else {
            SettingValue::Text(raw.to_string())
        };
        settings.insert(key, value);
    }
    settings
}

/// Returns the rendering tag of a layer name, if the name ends in a
/// recognized `:tag` suffix.
pub fn layer_tag(name: &str) -> Option<LayerTag> {
    let settings = parse_object_name(name);
    for tag in [
        LayerTag::Svg,
        LayerTag::Png,
        LayerTag::Div,
        LayerTag::Symbol,
        LayerTag::Snippet,
    ] {
        if settings.flag(tag.as_str()) {
            return Some(tag);
        }
    }
    None
}

/// The logical group identifier before a layer tag: `map:svg` yields
/// `map`, as does `map:svg,inline`. Returns `None` when the name does not
/// carry the given tag.
pub fn tag_base_name(name: &str, tag: LayerTag) -> Option<String> {
    let marker = format!(":{}", tag.as_str());
    name.rfind(&marker).map(|pos| name[..pos].to_string())
}

/// Extracts `key: value` pairs from a note attribute. Entries are separated
/// by newlines, semicolons, or commas; double-quoted values are unquoted.
pub fn parse_data_attributes(note: &str) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for part in note.split(['\r', '\n', ';', ',']) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((k, v)) = part.split_once(':') {
            let k = k.trim();
            let mut v = v.trim().to_string();
            if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
                v = v[1..v.len() - 1].to_string();
            }
            if !k.is_empty() {
                out.insert(k.to_string(), v);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_width_and_flags() {
        let s = parse_object_name("Artboard1:600,fixed");
        assert_eq!(s.width(), Some(600.0));
        assert!(s.flag("fixed"));
        assert!(!s.flag("dynamic"));
    }

    #[test]
    fn parses_key_value_pairs() {
        let s = parse_object_name("Map:png,quality=80,inline");
        assert!(s.flag("png"));
        assert_eq!(s.number("quality"), Some(80.0));
        assert!(s.flag("inline"));
    }

    #[test]
    fn strips_copy_suffix_before_parsing() {
        let s = parse_object_name("Artboard1:600,fixed copy 3");
        assert_eq!(s.width(), Some(600.0));
        assert!(s.flag("fixed"));
    }

    #[test]
    fn legacy_width_prefix_is_recognized() {
        let s = parse_object_name("artboard-300:dynamic");
        assert_eq!(s.width(), Some(300.0));
        assert!(s.flag("dynamic"));
    }

    #[test]
    fn recognizes_layer_tags() {
        assert_eq!(layer_tag("terrain:svg"), Some(LayerTag::Svg));
        assert_eq!(layer_tag("labels:png"), Some(LayerTag::Png));
        assert_eq!(layer_tag("callouts:snippet"), Some(LayerTag::Snippet));
        assert_eq!(layer_tag("plain layer"), None);
        assert_eq!(layer_tag("layer:unknowntag"), None);
    }

    #[test]
    fn tag_base_name_requires_suffix() {
        assert_eq!(tag_base_name("map:svg", LayerTag::Svg).as_deref(), Some("map"));
        assert_eq!(tag_base_name("map:png", LayerTag::Svg), None);
    }

    #[test]
    fn cleans_annotations_from_names() {
        assert_eq!(clean_object_name("My Artboard:600,fixed"), "My_Artboard");
        assert_eq!(clean_object_name("plain"), "plain");
    }

    #[test]
    fn data_attributes_split_on_separators_and_unquote() {
        let attrs = parse_data_attributes("valign: bottom; title: \"A B\"\nrole:img");
        assert_eq!(attrs.get("valign").map(String::as_str), Some("bottom"));
        assert_eq!(attrs.get("title").map(String::as_str), Some("A B"));
        assert_eq!(attrs.get("role").map(String::as_str), Some("img"));
    }
}
