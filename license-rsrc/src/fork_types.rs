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

// Fixed-layout pieces of a classic resource fork. Everything is big-endian.
use deku::prelude::*;

pub const FORK_HEADER_SIZE: usize = 16;
// The rest of the first 256 bytes belongs to the system and the application
pub const FORK_RESERVED_SIZE: usize = 240;
pub const FORK_DATA_START: usize = FORK_HEADER_SIZE + FORK_RESERVED_SIZE;
pub const MAP_HEADER_SIZE: usize = 28;
pub const TYPE_LIST_ENTRY_SIZE: usize = 8;
pub const REF_LIST_ENTRY_SIZE: usize = 12;
// Used in RefListEntry.name_offset for unnamed resources
pub const NO_NAME: u16 = 0xFFFF;
// Resource data offsets are 24-bit
pub const MAX_DATA_OFFSET: usize = 0x00FF_FFFF;

#[derive(Debug, Default, Clone, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct ForkHeader {
    pub data_offset: u32,
    pub map_offset: u32,
    pub data_length: u32,
    pub map_length: u32
}

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct MapHeader {
    // Copy of the fork header, only meaningful to the Resource Manager in memory
    pub header_copy: [u8; 16],
    pub next_map: u32,
    pub file_ref: u16,
    pub attributes: u16,
    // Both offsets are from the start of the map
    pub type_list_offset: u16,
    pub name_list_offset: u16
}

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct TypeListEntry {
    pub tag: [u8; 4],
    pub count_minus_one: u16,
    // From the start of the type list (i.e. the type count field)
    pub ref_list_offset: u16
}

#[derive(Debug, Clone, PartialEq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct RefListEntry {
    pub id: i16,
    pub name_offset: u16,
    // Top byte is the resource attributes, low 24 bits the offset into the data area
    pub attributes_and_data_offset: u32,
    pub handle: u32
}

impl RefListEntry {
    pub fn attributes(&self) -> u8 {
        (self.attributes_and_data_offset >> 24) as u8
    }

    pub fn data_offset(&self) -> usize {
        (self.attributes_and_data_offset & MAX_DATA_OFFSET as u32) as usize
    }
}
