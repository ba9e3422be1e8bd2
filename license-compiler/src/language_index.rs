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

// The 'LPic' record maps each installed language (by legacy region code) to the
// slot holding its 'STR#' and 'RTF ' records.
use deku::prelude::*;
use license_common::*;

use crate::{LANGUAGE_INDEX_ID, LANGUAGE_INDEX_TYPE, LICENSE_BASE_ID};

const LPIC_HEADER_SIZE: usize = 4;
const LPIC_ENTRY_SIZE: usize = 6;
// Record ids are signed 16-bit
const MAX_SLOT_OFFSET: u16 = (i16::MAX - LICENSE_BASE_ID) as u16;

#[derive(Debug, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct LPicRecord {
    pub default_slot_id: u16,
    pub count: u16,
    #[deku(count = "count")]
    pub entries: Vec<LPicEntry>
}

#[derive(Debug, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "endian", ctx = "endian: deku::ctx::Endian")]
pub struct LPicEntry {
    pub region_code: u16,
    pub slot_offset: u16,
    // Non-zero for languages whose script needs a two-byte text encoding
    pub two_byte: u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageIndexEntry {
    pub region_code: u16,
    pub slot_offset: u16,
    pub is_wide_encoding: bool
}

/// Where a language's records go, and whether the slot was just allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSlot {
    pub slot_offset: u16,
    pub is_new: bool
}

impl ResolvedSlot {
    /// Record id of the slot's `STR#` and `RTF ` records.
    pub fn record_id(&self) -> i16 {
        // resolve_slot never hands out offsets that overflow
        LICENSE_BASE_ID + self.slot_offset as i16
    }
}

/// Typed view of the `LPic` record. It is always read completely, changed in
/// memory and written back completely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguageIndex {
    pub default_slot_id: u16,
    pub entries: Vec<LanguageIndexEntry>
}

fn corrupt(reason: String) -> LicenseError {
    LicenseError::RecordCorrupt {
        res_type: LANGUAGE_INDEX_TYPE,
        id: LANGUAGE_INDEX_ID,
        reason
    }
}

impl LanguageIndex {
    /// An index with no languages. The first language added gets slot 0 and
    /// becomes the default.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: &[u8]) -> Result<Self> {
        if record.len() < LPIC_HEADER_SIZE {
            return Err(corrupt(format!("{} bytes is too short", record.len())));
        }
        let count = u16::from_be_bytes([record[2], record[3]]) as usize;
        let expected_len = LPIC_HEADER_SIZE + count * LPIC_ENTRY_SIZE;
        if record.len() != expected_len {
            return Err(corrupt(format!(
                "{count} entries need {expected_len} bytes, found {}",
                record.len()
            )));
        }

        let (_, lpic) = LPicRecord::from_bytes((record, 0))?;
        let mut entries: Vec<LanguageIndexEntry> = Vec::with_capacity(count);
        for entry in lpic.entries {
            if entries
                .iter()
                .any(|existing| existing.region_code == entry.region_code)
            {
                return Err(corrupt(format!(
                    "region {} is listed twice",
                    entry.region_code
                )));
            }
            if entries
                .iter()
                .any(|existing| existing.slot_offset == entry.slot_offset)
            {
                return Err(corrupt(format!(
                    "slot offset {} is used twice",
                    entry.slot_offset
                )));
            }
            if entry.slot_offset > MAX_SLOT_OFFSET {
                return Err(corrupt(format!(
                    "slot offset {} is past the last record id",
                    entry.slot_offset
                )));
            }
            entries.push(LanguageIndexEntry {
                region_code: entry.region_code,
                slot_offset: entry.slot_offset,
                is_wide_encoding: entry.two_byte != 0
            });
        }

        Ok(LanguageIndex {
            default_slot_id: lpic.default_slot_id,
            entries
        })
    }

    pub fn to_record(&self) -> Result<Vec<u8>> {
        let lpic = LPicRecord {
            default_slot_id: self.default_slot_id,
            count: self.entries.len() as u16,
            entries: self
                .entries
                .iter()
                .map(|entry| LPicEntry {
                    region_code: entry.region_code,
                    slot_offset: entry.slot_offset,
                    two_byte: entry.is_wide_encoding as u16
                })
                .collect()
        };
        Ok(lpic.to_bytes()?)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn find(&self, region_code: u16) -> Option<&LanguageIndexEntry> {
        self.entries
            .iter()
            .find(|entry| entry.region_code == region_code)
    }

    /// The smallest offset strictly greater than every offset in use.
    pub fn next_free_offset(&self) -> u32 {
        self.entries
            .iter()
            .map(|entry| entry.slot_offset as u32 + 1)
            .max()
            .unwrap_or(0)
    }

    /// Finds the slot already used by `region_code`, or appends a new entry
    /// with the next free slot.
    ///
    /// An existing entry keeps its slot; only its encoding flag is refreshed.
    pub fn resolve_slot(
        &mut self,
        region_code: u16,
        is_wide_encoding: bool
    ) -> Result<ResolvedSlot> {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.region_code == region_code)
        {
            entry.is_wide_encoding = is_wide_encoding;
            return Ok(ResolvedSlot {
                slot_offset: entry.slot_offset,
                is_new: false
            });
        }

        let offset = self.next_free_offset();
        if offset > MAX_SLOT_OFFSET as u32 {
            return Err(LicenseError::SlotRangeExhausted(offset));
        }
        let slot_offset = offset as u16;
        self.entries.push(LanguageIndexEntry {
            region_code,
            slot_offset,
            is_wide_encoding
        });
        Ok(ResolvedSlot {
            slot_offset,
            is_new: true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_serialises_to_header_only() {
        assert_eq!(LanguageIndex::new().to_record().unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn record_layout_is_big_endian() {
        let mut index = LanguageIndex::new();
        index.resolve_slot(0, false).unwrap();
        index.resolve_slot(14, true).unwrap();
        assert_eq!(
            index.to_record().unwrap(),
            vec![0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 14, 0, 1, 0, 1]
        );
    }

    #[test]
    fn parses_what_it_writes() {
        let index = LanguageIndex {
            default_slot_id: 0,
            entries: vec![
                LanguageIndexEntry {
                    region_code: 0,
                    slot_offset: 0,
                    is_wide_encoding: false
                },
                LanguageIndexEntry {
                    region_code: 1,
                    slot_offset: 1,
                    is_wide_encoding: false
                },
            ]
        };
        let record = index.to_record().unwrap();
        assert_eq!(LanguageIndex::from_record(&record).unwrap(), index);
    }

    #[test]
    fn non_zero_flag_reads_as_wide() {
        let record = [0, 0, 0, 1, 0, 14, 0, 0, 0, 2];
        let index = LanguageIndex::from_record(&record).unwrap();
        assert!(index.entries[0].is_wide_encoding);
    }

    #[test]
    fn rejects_short_records() {
        assert!(matches!(
            LanguageIndex::from_record(&[0, 0]),
            Err(LicenseError::RecordCorrupt { .. })
        ));
        // Claims two entries but only carries one
        let record = [0, 0, 0, 2, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            LanguageIndex::from_record(&record),
            Err(LicenseError::RecordCorrupt { .. })
        ));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let record = [0, 0, 0, 0, 0xFF];
        assert!(matches!(
            LanguageIndex::from_record(&record),
            Err(LicenseError::RecordCorrupt { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_regions() {
        let record = [0, 0, 0, 2, 0, 1, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0];
        assert!(matches!(
            LanguageIndex::from_record(&record),
            Err(LicenseError::RecordCorrupt { .. })
        ));
    }

    #[test]
    fn rejects_shared_slot_offsets() {
        // Regions 0 and 1 both claim slot 5000
        let record = [0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0];
        assert!(matches!(
            LanguageIndex::from_record(&record),
            Err(LicenseError::RecordCorrupt { reason, .. }) if reason.contains("used twice")
        ));
    }

    #[test]
    fn rejects_offsets_past_the_record_id_limit() {
        let record = [0, 0, 0, 1, 0, 0, 0x7F, 0xFF, 0, 0];
        assert!(matches!(
            LanguageIndex::from_record(&record),
            Err(LicenseError::RecordCorrupt { .. })
        ));
    }

    #[test]
    fn new_regions_get_consecutive_slots() {
        let mut index = LanguageIndex::new();
        for (i, region) in [0u16, 1, 3, 14].iter().enumerate() {
            let slot = index.resolve_slot(*region, false).unwrap();
            assert!(slot.is_new);
            assert_eq!(slot.slot_offset, i as u16);
            assert_eq!(slot.record_id(), 5000 + i as i16);
        }
        assert_eq!(index.count(), 4);
    }

    #[test]
    fn known_region_reuses_its_slot() {
        let mut index = LanguageIndex::new();
        index.resolve_slot(0, false).unwrap();
        index.resolve_slot(1, false).unwrap();
        let slot = index.resolve_slot(0, false).unwrap();
        assert_eq!(
            slot,
            ResolvedSlot {
                slot_offset: 0,
                is_new: false
            }
        );
        assert_eq!(index.count(), 2);
    }

    #[test]
    fn allocation_skips_past_the_highest_offset() {
        let mut index = LanguageIndex {
            default_slot_id: 0,
            entries: vec![
                LanguageIndexEntry {
                    region_code: 0,
                    slot_offset: 4,
                    is_wide_encoding: false
                },
                LanguageIndexEntry {
                    region_code: 1,
                    slot_offset: 2,
                    is_wide_encoding: false
                },
            ]
        };
        assert_eq!(index.resolve_slot(3, false).unwrap().slot_offset, 5);
    }

    #[test]
    fn allocation_stops_at_the_record_id_limit() {
        let mut index = LanguageIndex {
            default_slot_id: 0,
            entries: vec![LanguageIndexEntry {
                region_code: 0,
                slot_offset: MAX_SLOT_OFFSET,
                is_wide_encoding: false
            }]
        };
        assert!(matches!(
            index.resolve_slot(1, false),
            Err(LicenseError::SlotRangeExhausted(_))
        ));
    }
}
