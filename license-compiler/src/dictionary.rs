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

// The language dictionary is an XML property list compiled into the binary.
// Each key is a canonical language identifier, each value an array holding the
// text encoding number followed by the nine dialog strings.
use std::{collections::BTreeMap, io::Read};

use license_common::*;
use tracing::debug;
use xml::{reader::XmlEvent, EventReader};

use crate::string_table::STRING_TABLE_COUNT;

const EMBEDDED_DICTIONARY: &str = include_str!("../resources/license.plist");

/// A value from the property list. Only the types the dictionary uses are
/// told apart.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    Dict(BTreeMap<String, PlistValue>),
    Array(Vec<PlistValue>),
    String(String),
    Integer(i64),
    /// `<real>`, `<true/>`, `<data>` and friends, by element name
    Other(String)
}

/// The text encoding and dialog strings for one language.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageStrings {
    pub encoding: u32,
    pub strings: [String; STRING_TABLE_COUNT]
}

#[derive(Debug, Clone)]
pub struct LicenseDictionary {
    languages: BTreeMap<String, PlistValue>
}

enum Frame {
    Dict {
        entries: BTreeMap<String, PlistValue>,
        pending_key: Option<String>
    },
    Array(Vec<PlistValue>),
    Text { element: String, text: String }
}

fn missing(reason: impl Into<String>) -> LicenseError {
    LicenseError::DictionaryMissing(reason.into())
}

// Hangs a finished value off whatever container is currently open
fn attach(
    stack: &mut [Frame],
    root: &mut Option<PlistValue>,
    value: PlistValue
) -> Result<()> {
    match stack.last_mut() {
        Some(Frame::Dict {
            entries,
            pending_key
        }) => {
            let key = pending_key
                .take()
                .ok_or_else(|| missing("dictionary value without a <key>"))?;
            entries.insert(key, value);
        }
        Some(Frame::Array(items)) => items.push(value),
        Some(Frame::Text { element, .. }) => {
            return Err(missing(format!("<{element}> can't contain other elements")))
        }
        None => *root = Some(value)
    }
    Ok(())
}

/// Reads a property list into a [PlistValue] tree.
pub fn parse_plist<T: Read>(byte_source: T) -> Result<PlistValue> {
    let xml_source = EventReader::new(byte_source);
    let mut stack: Vec<Frame> = vec![];
    let mut root = None;

    for event in xml_source {
        match event.map_err(|e| missing(e.to_string()))? {
            XmlEvent::StartElement { name, .. } => match &name.local_name[..] {
                // The outer <plist> element carries no value of its own
                "plist" => {}
                "dict" => stack.push(Frame::Dict {
                    entries: BTreeMap::new(),
                    pending_key: None
                }),
                "array" => stack.push(Frame::Array(vec![])),
                element => stack.push(Frame::Text {
                    element: element.to_string(),
                    text: String::new()
                })
            },
            XmlEvent::Characters(chars)
            | XmlEvent::CData(chars)
            | XmlEvent::Whitespace(chars) => {
                if let Some(Frame::Text { text, .. }) = stack.last_mut() {
                    text.push_str(&chars);
                }
                // Else this is indentation between elements
            }
            XmlEvent::EndElement { name } => {
                if name.local_name == "plist" {
                    continue;
                }
                let value = match stack.pop() {
                    Some(Frame::Dict { entries, .. }) => PlistValue::Dict(entries),
                    Some(Frame::Array(items)) => PlistValue::Array(items),
                    Some(Frame::Text { element, text }) => match &element[..] {
                        "key" => {
                            match stack.last_mut() {
                                Some(Frame::Dict { pending_key, .. }) => {
                                    *pending_key = Some(text)
                                }
                                _ => return Err(missing("<key> outside of a <dict>"))
                            }
                            continue;
                        }
                        "string" => PlistValue::String(text),
                        "integer" => PlistValue::Integer(
                            text.trim()
                                .parse()
                                .map_err(|_e| missing(format!("bad <integer> '{text}'")))?
                        ),
                        _ => PlistValue::Other(element)
                    },
                    None => return Err(missing("unbalanced elements"))
                };
                attach(&mut stack, &mut root, value)?;
            }
            // Don't care about the declaration, doctype or comments
            _ => {}
        }
    }

    root.ok_or_else(|| missing("empty property list"))
}

impl LicenseDictionary {
    /// Loads the dictionary compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_plist(EMBEDDED_DICTIONARY.as_bytes())
    }

    pub fn from_plist<T: Read>(byte_source: T) -> Result<Self> {
        match parse_plist(byte_source)? {
            PlistValue::Dict(languages) => {
                debug!("Loaded license dictionary with {} languages", languages.len());
                Ok(LicenseDictionary { languages })
            }
            _ => Err(missing("top level is not a <dict>"))
        }
    }

    /// Every language key, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(|key| &key[..])
    }

    /// Returns the encoding and strings for a canonical language identifier,
    /// checking that the entry has the expected shape.
    pub fn lookup(&self, language: &str) -> Result<LanguageStrings> {
        self.lookup_token(language, language)
    }

    /// Same as [LicenseDictionary::lookup], with errors also naming `token`,
    /// the language as the user typed it.
    pub fn lookup_token(&self, token: &str, language: &str) -> Result<LanguageStrings> {
        let not_supported = |reason: String| LicenseError::LanguageNotSupported {
            token: token.into(),
            language: language.into(),
            reason
        };

        let Some(PlistValue::Array(items)) = self.languages.get(language) else {
            return Err(not_supported("is not in the dictionary".into()));
        };
        if items.len() != STRING_TABLE_COUNT + 1 {
            return Err(not_supported(format!(
                "dictionary strings error (should be {} items, found {})",
                STRING_TABLE_COUNT + 1,
                items.len()
            )));
        }

        let PlistValue::Integer(encoding) = &items[0] else {
            return Err(not_supported(
                "dictionary strings error (first item must be a number)".into()
            ));
        };
        let encoding = u32::try_from(*encoding).map_err(|_e| {
            not_supported(format!("dictionary error (encoding {encoding} is out of range)"))
        })?;

        let mut strings = vec![];
        for (i, item) in items.iter().enumerate().skip(1) {
            match item {
                PlistValue::String(string) => strings.push(string.clone()),
                _ => {
                    return Err(not_supported(format!(
                        "dictionary error (#{i} is not a string)"
                    )))
                }
            }
        }
        let strings: [String; STRING_TABLE_COUNT] = strings
            .try_into()
            .map_err(|_e| not_supported("dictionary strings error".into()))?;

        Ok(LanguageStrings { encoding, strings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{string_table::encode_string_table, text_encoding::TextEncoding};

    fn dictionary(body: &str) -> Result<LicenseDictionary> {
        let plist = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
{body}
</plist>"#
        );
        LicenseDictionary::from_plist(plist.as_bytes())
    }

    const NINE_STRINGS: &str = "<string>English</string><string>Agree</string>\
        <string>Disagree</string><string>Print</string><string>Save...</string>\
        <string>If you agree press &quot;Agree&quot;.</string><string>Title</string>\
        <string>Can't save.</string><string>Can't print.</string>";

    #[test]
    fn looks_up_encoding_and_strings() {
        let dict = dictionary(&format!(
            "<dict><key>en</key><array><integer>0</integer>{NINE_STRINGS}</array></dict>"
        ))
        .unwrap();
        let en = dict.lookup("en").unwrap();
        assert_eq!(en.encoding, 0);
        assert_eq!(en.strings[0], "English");
        assert_eq!(en.strings[5], "If you agree press \"Agree\".");
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["en"]);
    }

    #[test]
    fn missing_language_is_not_supported() {
        let dict = dictionary("<dict></dict>").unwrap();
        assert!(matches!(
            dict.lookup("fr"),
            Err(LicenseError::LanguageNotSupported { .. })
        ));
    }

    #[test]
    fn missing_language_names_token_and_identifier() {
        let dict = dictionary("<dict></dict>").unwrap();
        assert_eq!(
            dict.lookup_token("en_GB", "en-GB").unwrap_err().to_string(),
            "'en_GB (en-GB)' is not in the dictionary"
        );
    }

    #[test]
    fn wrong_item_count_is_not_supported() {
        let dict = dictionary(
            "<dict><key>en</key><array><integer>0</integer><string>a</string></array></dict>"
        )
        .unwrap();
        let err = dict.lookup("en").unwrap_err();
        assert!(err.to_string().contains("should be 10 items"));
    }

    #[test]
    fn first_item_must_be_a_number() {
        let dict = dictionary(&format!(
            "<dict><key>en</key><array><string>0</string>{NINE_STRINGS}</array></dict>"
        ))
        .unwrap();
        let err = dict.lookup("en").unwrap_err();
        assert!(err.to_string().contains("first item must be a number"));
    }

    #[test]
    fn other_items_must_be_strings() {
        let strings = NINE_STRINGS.replacen("<string>Print</string>", "<integer>4</integer>", 1);
        let dict = dictionary(&format!(
            "<dict><key>en</key><array><integer>0</integer>{strings}</array></dict>"
        ))
        .unwrap();
        let err = dict.lookup("en").unwrap_err();
        assert!(err.to_string().contains("#4 is not a string"));
    }

    #[test]
    fn top_level_must_be_a_dict() {
        assert!(matches!(
            dictionary("<array></array>"),
            Err(LicenseError::DictionaryMissing(_))
        ));
        assert!(matches!(
            LicenseDictionary::from_plist("not xml at all".as_bytes()),
            Err(LicenseError::DictionaryMissing(_))
        ));
    }

    #[test]
    fn embedded_dictionary_is_complete() {
        let dict = LicenseDictionary::embedded().unwrap();
        assert!(dict.keys().count() >= 10);
        for key in dict.keys() {
            let language = dict.lookup(key).unwrap();
            let encoding = TextEncoding::from_legacy_id(language.encoding).unwrap();
            // Every entry has to survive conversion to a STR# record
            encode_string_table(&language.strings, encoding).unwrap();
        }
    }
}
