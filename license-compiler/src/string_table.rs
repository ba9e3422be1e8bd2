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

// The 'STR#' record: a counted list of Pascal strings shown by the license dialog
use deku::prelude::*;
use license_common::*;

use crate::text_encoding::TextEncoding;

/// Every license dialog needs exactly this many strings: the language name,
/// the four button titles and the four messages.
pub const STRING_TABLE_COUNT: usize = 9;
pub const MAX_PASCAL_STRING_LEN: usize = 255;

#[derive(Debug, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct StringTableRecord {
    pub count: u16,
    #[deku(count = "count")]
    pub strings: Vec<PascalString>
}

#[derive(Debug, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "endian", ctx = "endian: deku::ctx::Endian")]
pub struct PascalString {
    pub len: u8,
    #[deku(count = "len")]
    pub bytes: Vec<u8>
}

/// Encodes the dialog strings into a `STR#` record.
///
/// Each string is converted on its own. Errors name the 1-based position of
/// the first string that can't be represented in `encoding` or that is longer
/// than 255 bytes once encoded.
pub fn encode_string_table(
    strings: &[String; STRING_TABLE_COUNT],
    encoding: TextEncoding
) -> Result<Vec<u8>> {
    let mut pascal_strings = Vec::with_capacity(STRING_TABLE_COUNT);
    for (i, string) in strings.iter().enumerate() {
        let position = i + 1;
        let bytes = encoding
            .encode(string)
            .ok_or_else(|| LicenseError::EncodingError {
                position,
                reason: format!("not representable in {}", encoding.name())
            })?;
        if bytes.len() > MAX_PASCAL_STRING_LEN {
            return Err(LicenseError::EncodingError {
                position,
                reason: format!("{} bytes long, at most 255 fit", bytes.len())
            });
        }
        pascal_strings.push(PascalString {
            len: bytes.len() as u8,
            bytes
        });
    }

    let record = StringTableRecord {
        count: STRING_TABLE_COUNT as u16,
        strings: pascal_strings
    };
    Ok(record.to_bytes()?)
}

/// Reads the `STR#` record with the given id back into text.
pub fn decode_string_table(
    record: &[u8],
    id: i16,
    encoding: TextEncoding
) -> Result<Vec<String>> {
    let ((rest, _), table) = StringTableRecord::from_bytes((record, 0))?;
    if !rest.is_empty() {
        return Err(LicenseError::RecordCorrupt {
            res_type: crate::STRING_TABLE_TYPE,
            id,
            reason: format!("{} bytes after the last string", rest.len())
        });
    }
    Ok(table
        .strings
        .iter()
        .map(|string| encoding.decode(&string.bytes))
        .collect())
}
