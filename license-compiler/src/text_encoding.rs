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

use encoding_rs::{Encoding, BIG5, EUC_KR, GBK, MACINTOSH, SHIFT_JIS, X_MAC_CYRILLIC};
use license_common::*;

// Legacy text encoding numbers, as used in the language dictionary
pub const MAC_ROMAN: u32 = 0;
pub const MAC_JAPANESE: u32 = 1;
pub const MAC_CHINESE_TRAD: u32 = 2;
pub const MAC_KOREAN: u32 = 3;
pub const MAC_CYRILLIC: u32 = 7;
pub const MAC_CHINESE_SIMP: u32 = 25;

/// A legacy text encoding together with the codec that implements it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextEncoding {
    id: u32,
    codec: &'static Encoding
}

impl TextEncoding {
    pub fn from_legacy_id(id: u32) -> Result<Self> {
        let codec = match id {
            MAC_ROMAN => MACINTOSH,
            MAC_JAPANESE => SHIFT_JIS,
            MAC_CHINESE_TRAD => BIG5,
            MAC_KOREAN => EUC_KR,
            MAC_CYRILLIC => X_MAC_CYRILLIC,
            MAC_CHINESE_SIMP => GBK,
            _ => return Err(LicenseError::UnsupportedTextEncoding(id))
        };
        Ok(TextEncoding { id, codec })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.codec.name()
    }

    /// Anything other than MacRoman gets flagged in the language index.
    pub fn is_wide(&self) -> bool {
        self.id != MAC_ROMAN
    }

    /// Returns `None` if any character has no mapping in this encoding.
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        let (bytes, _, had_errors) = self.codec.encode(text);
        if had_errors {
            None
        } else {
            Some(bytes.into_owned())
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _) = self.codec.decode_without_bom_handling(bytes);
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_roman_is_single_byte() {
        let mac_roman = TextEncoding::from_legacy_id(MAC_ROMAN).unwrap();
        assert_eq!(mac_roman.encode("Français").unwrap().len(), 8);
        assert!(!mac_roman.is_wide());
    }

    #[test]
    fn unmappable_characters_fail() {
        let mac_roman = TextEncoding::from_legacy_id(MAC_ROMAN).unwrap();
        assert_eq!(mac_roman.encode("日本語"), None);
    }

    #[test]
    fn japanese_is_wide() {
        let japanese = TextEncoding::from_legacy_id(MAC_JAPANESE).unwrap();
        assert!(japanese.is_wide());
        let bytes = japanese.encode("日本語").unwrap();
        assert_eq!(bytes.len(), 6);
        assert_eq!(japanese.decode(&bytes), "日本語");
    }

    #[test]
    fn unknown_encodings_are_rejected() {
        assert!(matches!(
            TextEncoding::from_legacy_id(4),
            Err(LicenseError::UnsupportedTextEncoding(4))
        ));
    }
}
