use serde::{Deserialize, Serialize};

/// Closed set of languages the platform serves. Anything outside this set is
/// ignored at ingress and consumers fall back to the configured default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en_US", alias = "en-US", alias = "en")]
    EnUs,
    #[serde(rename = "ph_PH", alias = "ph-PH", alias = "ph", alias = "fil")]
    PhPh,
    #[serde(rename = "es_ES", alias = "es-ES", alias = "es")]
    EsEs,
    #[serde(rename = "ja_JP", alias = "ja-JP", alias = "ja")]
    JaJp,
}

impl Language {
    pub const ALL: [Language; 4] =
        [Language::EnUs, Language::PhPh, Language::EsEs, Language::JaJp];

    /// Canonical two-part code used in headers, bundle filenames and logs.
    pub fn code(self) -> &'static str {
        match self {
            Language::EnUs => "en_US",
            Language::PhPh => "ph_PH",
            Language::EsEs => "es_ES",
            Language::JaJp => "ja_JP",
        }
    }

    /// Lenient parse of a client-supplied language tag. Accepts `en_US`,
    /// `en-US`, a bare primary tag (`en`), any casing, and ignores encoding
    /// suffixes such as `.UTF-8`. Returns `None` for anything outside the
    /// supported set.
    pub fn parse(raw: &str) -> Option<Language> {
        let mut normalized = raw.trim().replace('_', "-").to_ascii_lowercase();
        if let Some(idx) = normalized.find('@') {
            normalized.truncate(idx);
        }
        if let Some(idx) = normalized.find('.') {
            normalized.truncate(idx);
        }
        if normalized.is_empty() {
            return None;
        }

        let primary = normalized.split('-').next().unwrap_or(&normalized);
        match primary {
            "en" => Some(Language::EnUs),
            "ph" | "fil" => Some(Language::PhPh),
            "es" => Some(Language::EsEs),
            "ja" => Some(Language::JaJp),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_codes() {
        assert_eq!(Language::parse("en_US"), Some(Language::EnUs));
        assert_eq!(Language::parse("ph_PH"), Some(Language::PhPh));
        assert_eq!(Language::parse("ja-JP"), Some(Language::JaJp));
    }

    #[test]
    fn parses_loose_tags() {
        assert_eq!(Language::parse(" EN-us "), Some(Language::EnUs));
        assert_eq!(Language::parse("fil"), Some(Language::PhPh));
        assert_eq!(Language::parse("es_ES.UTF-8"), Some(Language::EsEs));
    }

    #[test]
    fn rejects_unsupported_tags() {
        assert_eq!(Language::parse("de_DE"), None);
        assert_eq!(Language::parse(""), None);
        assert_eq!(Language::parse("   "), None);
    }

    #[test]
    fn serde_round_trips_wire_codes() {
        let json = serde_json::to_string(&Language::PhPh).unwrap();
        assert_eq!(json, "\"ph_PH\"");
        let parsed: Language = serde_json::from_str("\"en-US\"").unwrap();
        assert_eq!(parsed, Language::EnUs);
    }
}
