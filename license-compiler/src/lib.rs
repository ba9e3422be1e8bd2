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

use license_common::ResType;

pub mod dictionary;
pub mod language_index;
pub mod license_slot;
pub mod string_table;
pub mod text_encoding;

/// Language index, always at [LANGUAGE_INDEX_ID]
pub const LANGUAGE_INDEX_TYPE: ResType = ResType::new(b"LPic");
/// Dialog strings, one per language slot
pub const STRING_TABLE_TYPE: ResType = ResType::new(b"STR#");
/// License text, one per language slot
pub const DOCUMENT_TYPE: ResType = ResType::new(b"RTF ");

pub const LANGUAGE_INDEX_ID: i16 = 5000;
// Slot records live at LICENSE_BASE_ID + slot offset
pub const LICENSE_BASE_ID: i16 = 5000;
