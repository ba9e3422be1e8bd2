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

use deku::DekuContainerWrite;
use license_common::*;

use crate::{fork_types::*, ResourceFork};

fn offset_u16(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_e| LicenseError::ContainerCorrupt(format!("{what} doesn't fit in the map")))
}

/// Lays out the whole fork: header, reserved area, data area, then the map.
///
/// Empty resource groups are skipped, since a type list entry can't describe
/// zero resources.
pub fn write_fork(fork: &ResourceFork) -> Result<Vec<u8>> {
    let groups: Vec<_> = fork
        .groups
        .iter()
        .filter(|group| !group.resources.is_empty())
        .collect();

    let mut data: Vec<u8> = vec![];
    let mut names: Vec<u8> = vec![];
    let mut type_entries: Vec<u8> = vec![];
    let mut ref_entries: Vec<u8> = vec![];

    // Reference lists follow the type list directly
    let type_list_size = 2 + groups.len() * TYPE_LIST_ENTRY_SIZE;
    for group in &groups {
        let type_entry = TypeListEntry {
            tag: group.res_type.0,
            count_minus_one: offset_u16(group.resources.len() - 1, "resource count")?,
            ref_list_offset: offset_u16(type_list_size + ref_entries.len(), "reference list")?
        };
        type_entries.extend(type_entry.to_bytes()?);

        for resource in &group.resources {
            let data_offset = data.len();
            if data_offset > MAX_DATA_OFFSET {
                return Err(LicenseError::ContainerCorrupt(
                    "data area is larger than 16MB".into()
                ));
            }
            data.extend((resource.data.len() as u32).to_be_bytes());
            data.extend(&resource.data);

            let name_offset = match &resource.name {
                Some(name) => {
                    let offset = offset_u16(names.len(), "name list")?;
                    names.push(name.len() as u8);
                    names.extend(name);
                    offset
                }
                None => NO_NAME
            };

            let ref_entry = RefListEntry {
                id: resource.id,
                name_offset,
                attributes_and_data_offset: ((resource.attributes as u32) << 24)
                    | data_offset as u32,
                handle: 0
            };
            ref_entries.extend(ref_entry.to_bytes()?);
        }
    }

    let name_list_offset = MAP_HEADER_SIZE + type_list_size + ref_entries.len();
    let map_length = name_list_offset + names.len();
    let header = ForkHeader {
        data_offset: FORK_DATA_START as u32,
        map_offset: (FORK_DATA_START + data.len()) as u32,
        data_length: data.len() as u32,
        map_length: map_length as u32
    };
    let header_bytes = header.to_bytes()?;

    let mut header_copy = [0; FORK_HEADER_SIZE];
    header_copy.copy_from_slice(&header_bytes);
    let map_header = MapHeader {
        header_copy,
        next_map: 0,
        file_ref: 0,
        attributes: fork.map_attributes,
        type_list_offset: MAP_HEADER_SIZE as u16,
        name_list_offset: offset_u16(name_list_offset, "name list")?
    };

    let mut out = Vec::with_capacity(FORK_DATA_START + data.len() + map_length);
    out.extend(header_bytes);
    out.extend(&fork.reserved);
    // A fork read from disk might have carried a short reserved area
    out.resize(FORK_DATA_START, 0);
    out.extend(data);
    out.extend(map_header.to_bytes()?);
    // Type count is stored minus one, wrapping to 0xFFFF when there are no types
    out.extend((groups.len() as u16).wrapping_sub(1).to_be_bytes());
    out.extend(type_entries);
    out.extend(ref_entries);
    out.extend(names);
    Ok(out)
}
