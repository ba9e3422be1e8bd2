// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use license_common::*;
use license_compiler::text_encoding::{
    MAC_CHINESE_SIMP, MAC_CHINESE_TRAD, MAC_CYRILLIC, MAC_JAPANESE, MAC_KOREAN, MAC_ROMAN
};
use phf::phf_map;

/// A language token turned into what the disk image format needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocale {
    /// Canonical identifier, eg. `en` or `pt-BR`. Also the dictionary key.
    pub iso: String,
    /// Legacy language number
    pub language_code: u16,
    /// Legacy region number, the key of the language index
    pub region_code: u16
}

/// Turns user-supplied language tokens into canonical identifiers and legacy
/// codes.
pub trait LocaleResolver {
    fn resolve_locale(&self, token: &str) -> Result<ResolvedLocale>;

    /// The legacy text encoding normally used for the language's script.
    fn text_encoding_for(&self, iso: &str) -> u32;
}

// Long names accepted on the command line, lowercased
static LANGUAGE_NAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "danish" => "da",
    "dansk" => "da",
    "dutch" => "nl",
    "nederlands" => "nl",
    "english" => "en",
    "finnish" => "fi",
    "suomi" => "fi",
    "french" => "fr",
    "français" => "fr",
    "german" => "de",
    "deutsch" => "de",
    "italian" => "it",
    "italiano" => "it",
    "japanese" => "ja",
    "korean" => "ko",
    "norwegian" => "nb",
    "portuguese" => "pt",
    "russian" => "ru",
    "spanish" => "es",
    "español" => "es",
    "swedish" => "sv",
    "svenska" => "sv",
};

// (language code, region code) from the classic Script Manager tables
static LEGACY_CODES: phf::Map<&'static str, (u16, u16)> = phf_map! {
    "en" => (0, 0),
    "en-US" => (0, 0),
    "en-GB" => (0, 2),
    "en-AU" => (0, 15),
    "fr" => (1, 1),
    "fr-CA" => (1, 11),
    "fr-CH" => (1, 18),
    "de" => (2, 3),
    "de-CH" => (2, 19),
    "it" => (3, 4),
    "nl" => (4, 5),
    "sv" => (5, 7),
    "es" => (6, 8),
    "da" => (7, 9),
    "pt" => (8, 10),
    "pt-BR" => (8, 71),
    "nb" => (9, 12),
    "no" => (9, 12),
    "ja" => (11, 14),
    "fi" => (13, 17),
    "zh-Hant" => (19, 53),
    "ko" => (23, 51),
    "ru" => (32, 49),
    "zh-Hans" => (33, 52),
};

static SCRIPT_ENCODINGS: phf::Map<&'static str, u32> = phf_map! {
    "ja" => MAC_JAPANESE,
    "zh-Hant" => MAC_CHINESE_TRAD,
    "ko" => MAC_KOREAN,
    "ru" => MAC_CYRILLIC,
    "zh-Hans" => MAC_CHINESE_SIMP,
};

fn title_case(subtag: &str) -> String {
    let lower = subtag.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => lower
    }
}

/// Canonicalizes a language token: long names become their code, the
/// language subtag is lowercased, scripts are title-cased, regions uppercased
/// and `_` separators become `-`. Returns `None` for anything that isn't
/// shaped like a language tag.
pub fn canonical_language_identifier(token: &str) -> Option<String> {
    let token = token.trim();
    if let Some(iso) = LANGUAGE_NAMES.get(token.to_lowercase().as_str()) {
        return Some(iso.to_string());
    }

    let mut subtags = token.split(|c| c == '-' || c == '_');
    let language = subtags.next()?;
    if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut canonical = language.to_ascii_lowercase();
    for subtag in subtags {
        if subtag.is_empty() || !subtag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        let alphabetic = subtag.chars().all(|c| c.is_ascii_alphabetic());
        canonical.push('-');
        match subtag.len() {
            4 if alphabetic => canonical.push_str(&title_case(subtag)),
            2 if alphabetic => canonical.push_str(&subtag.to_ascii_uppercase()),
            _ => canonical.push_str(&subtag.to_ascii_lowercase())
        }
    }
    Some(canonical)
}

// Looks `iso` up, then falls back to its bare language subtag
fn lookup_with_fallback<V: Copy>(map: &phf::Map<&'static str, V>, iso: &str) -> Option<V> {
    map.get(iso).copied().or_else(|| {
        let language = iso.split('-').next()?;
        map.get(language).copied()
    })
}

/// [LocaleResolver] backed by static tables covering the languages of the
/// embedded dictionary and their common regional variants.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableLocaleResolver;

impl LocaleResolver for TableLocaleResolver {
    fn resolve_locale(&self, token: &str) -> Result<ResolvedLocale> {
        let unresolvable = |reason: String| LicenseError::LocaleUnresolvable {
            token: token.into(),
            reason
        };
        let iso = canonical_language_identifier(token)
            .ok_or_else(|| unresolvable("is not a language".into()))?;
        let (language_code, region_code) = lookup_with_fallback(&LEGACY_CODES, &iso)
            .ok_or_else(|| unresolvable(format!("has no language/region number ({iso})")))?;
        Ok(ResolvedLocale {
            iso,
            language_code,
            region_code
        })
    }

    fn text_encoding_for(&self, iso: &str) -> u32 {
        lookup_with_fallback(&SCRIPT_ENCODINGS, iso).unwrap_or(MAC_ROMAN)
    }
}
