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
use tracing::{debug, info};

use crate::{
    language_index::LanguageIndex, DOCUMENT_TYPE, LANGUAGE_INDEX_ID, LANGUAGE_INDEX_TYPE,
    STRING_TABLE_TYPE
};

/// Everything needed to install one language's license into a record store.
#[derive(Debug, Clone)]
pub struct LicenseRecords {
    /// Legacy region code, the key of the language index
    pub region_code: u16,
    pub is_wide_encoding: bool,
    /// Name given to both slot records, eg. `en`
    pub label: String,
    /// Encoded `STR#` record
    pub string_table: Vec<u8>,
    /// Contents of the `RTF ` record
    pub document: Vec<u8>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
    /// Number of languages in the index after the install
    pub language_count: usize,
    /// Record id of the slot's `STR#` and `RTF ` records
    pub slot_id: i16,
    /// `false` when an existing language's records were replaced
    pub new_slot: bool
}

/// Adds or replaces one language's license in `store`.
///
/// The index is written first, then the document, then the string table.
/// Nothing is flushed; the caller decides when the store hits the disk.
pub fn install_license<S: RecordStore + ?Sized>(
    store: &mut S,
    records: LicenseRecords
) -> Result<InstallReport> {
    let mut index = match store.read_record(LANGUAGE_INDEX_TYPE, LANGUAGE_INDEX_ID) {
        Some(record) => LanguageIndex::from_record(record)?,
        None => {
            debug!("No language index yet, starting an empty one");
            LanguageIndex::new()
        }
    };

    let slot = index.resolve_slot(records.region_code, records.is_wide_encoding)?;
    let slot_id = slot.record_id();
    if slot.is_new {
        info!(
            "Region {} gets new slot {}",
            records.region_code, slot_id
        );
    } else {
        info!(
            "Region {} already has slot {}, replacing its records",
            records.region_code, slot_id
        );
    }

    store.write_record(
        LANGUAGE_INDEX_TYPE,
        LANGUAGE_INDEX_ID,
        index.to_record()?,
        ""
    )?;

    for (res_type, data) in [
        (DOCUMENT_TYPE, records.document),
        (STRING_TABLE_TYPE, records.string_table)
    ] {
        if store.remove_record(res_type, slot_id) {
            debug!("Removed old {}#{}", res_type, slot_id);
        }
        store.write_record(res_type, slot_id, data, &records.label)?;
    }

    Ok(InstallReport {
        language_count: index.count(),
        slot_id,
        new_slot: slot.is_new
    })
}
