// ── Localised user-facing strings ─────────────────────────────────────────────
//
// English is built in and is the fallback for every key.  Other languages are
// JSON catalogs embedded at compile time; a key missing from a catalog falls
// back to its English text through `#[serde(default)]`.

use serde::Deserialize;

const RU_CATALOG: &str = include_str!("../resources/ru.json");

// ── Locale ────────────────────────────────────────────────────────────────────

/// The languages Scrawl ships messages for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    Ru,
}

impl Locale {
    /// Map a BCP 47 / POSIX locale tag (`ru-RU`, `ru_RU.UTF-8`, `en`) to a
    /// supported locale.  Anything unrecognised is English.
    pub fn from_tag(tag: &str) -> Self {
        let lang = tag
            .split(['-', '_', '.', '@'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "ru" => Self::Ru,
            _ => Self::En,
        }
    }

    /// The locale of the current user session.
    pub fn detect() -> Self {
        crate::platform::system_locale_tag()
            .map(|tag| Self::from_tag(&tag))
            .unwrap_or(Self::En)
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Every string the editor shows to the user.
///
/// Menu labels use Win32 mnemonic syntax (`&` marks the access key); the
/// console front end strips it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub app_title: String,
    pub menu_file: String,
    pub menu_open: String,
    pub menu_save: String,
    pub menu_dictate: String,
    /// Replaces the whole document when a file is over the size limit.
    pub file_too_large: String,
    /// Shown when no document picker is available.
    pub need_external_fm: String,
    /// Shown when no speech-recognition engine is available.
    pub need_speech_engine: String,
    pub open_failed: String,
    pub save_failed: String,
    pub saved: String,
    pub prompt_open: String,
    /// `{name}` is replaced with the suggested file name.
    pub prompt_save: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            app_title: "Scrawl".to_owned(),
            menu_file: "&File".to_owned(),
            menu_open: "&Open…".to_owned(),
            menu_save: "Save &As…".to_owned(),
            menu_dictate: "&Dictate".to_owned(),
            file_too_large: "Error: the file is too large".to_owned(),
            need_external_fm: "A file manager is required to pick a file".to_owned(),
            need_speech_engine: "A speech recognition service is required for dictation"
                .to_owned(),
            open_failed: "Could not open the file".to_owned(),
            save_failed: "Could not save the file".to_owned(),
            saved: "File saved".to_owned(),
            prompt_open: "Open file (empty line cancels): ".to_owned(),
            prompt_save: "Save as [{name}]: ".to_owned(),
        }
    }
}

impl Messages {
    /// Load the catalog for `locale`.
    ///
    /// A malformed embedded catalog is logged and replaced by English rather
    /// than failing startup.
    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::En => Self::default(),
            Locale::Ru => Self::parse(RU_CATALOG).unwrap_or_else(|e| {
                log::error!("ru message catalog is malformed: {e}");
                Self::default()
            }),
        }
    }

    /// Parse a JSON catalog; missing keys keep their English text.
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// The save prompt with the suggested file name filled in.
    pub fn save_prompt(&self, suggested: &str) -> String {
        self.prompt_save.replace("{name}", suggested)
    }
}

/// Strip the `&` access-key markers from a menu label.
pub fn plain_label(label: &str) -> String {
    label.replace('&', "")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_tags() {
        assert_eq!(Locale::from_tag("ru_RU.UTF-8"), Locale::Ru);
        assert_eq!(Locale::from_tag("ru-RU"), Locale::Ru);
        assert_eq!(Locale::from_tag("RU"), Locale::Ru);
        assert_eq!(Locale::from_tag("en_US.UTF-8"), Locale::En);
        assert_eq!(Locale::from_tag("C"), Locale::En);
        assert_eq!(Locale::from_tag(""), Locale::En);
    }

    #[test]
    fn ru_catalog_parses_and_translates() {
        let ru = Messages::parse(RU_CATALOG).expect("ru catalog");
        let en = Messages::default();
        assert_ne!(ru.file_too_large, en.file_too_large);
        assert_ne!(ru.need_speech_engine, en.need_speech_engine);
        assert_ne!(ru.need_external_fm, en.need_external_fm);
        assert!(ru.prompt_save.contains("{name}"));
    }

    #[test]
    fn missing_keys_fall_back_to_english() {
        let m = Messages::parse(r#"{"file_too_large":"too big"}"#).expect("partial catalog");
        assert_eq!(m.file_too_large, "too big");
        assert_eq!(m.app_title, Messages::default().app_title);
    }

    #[test]
    fn save_prompt_fills_name() {
        let m = Messages::default();
        assert_eq!(m.save_prompt("a.txt"), "Save as [a.txt]: ");
    }

    #[test]
    fn plain_label_strips_menu_syntax() {
        assert_eq!(plain_label("Save &As…"), "Save As…");
        assert_eq!(plain_label("&File"), "File");
    }
}
