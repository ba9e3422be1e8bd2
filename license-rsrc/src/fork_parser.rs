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

use byteorder::{BigEndian, ReadBytesExt};
use deku::DekuContainerRead;
use license_common::*;
use std::io::Cursor;
use tracing::debug;

use crate::{
    fork_types::*,
    Resource, ResourceFork, ResourceGroup
};

fn corrupt(reason: String) -> LicenseError {
    LicenseError::ContainerCorrupt(reason)
}

// Reads one fixed-layout struct starting at `offset`, treating a short buffer as damage
fn read_at<T>(buf: &[u8], offset: usize, what: &str) -> Result<T>
where
    T: for<'a> DekuContainerRead<'a>
{
    let slice = buf
        .get(offset..)
        .ok_or_else(|| corrupt(format!("{what} starts past the end of the fork")))?;
    let (_, value) =
        T::from_bytes((slice, 0)).map_err(|_e| corrupt(format!("{what} at {offset} is truncated")))?;
    Ok(value)
}

fn read_u16_at(buf: &[u8], offset: usize, what: &str) -> Result<u16> {
    let bytes = buf
        .get(offset..offset + 2)
        .ok_or_else(|| corrupt(format!("{what} at {offset} is truncated")))?;
    Ok(Cursor::new(bytes).read_u16::<BigEndian>()?)
}

fn read_pascal_string(buf: &[u8], offset: usize) -> Result<Vec<u8>> {
    let len = *buf
        .get(offset)
        .ok_or_else(|| corrupt(format!("resource name at {offset} is outside the name list")))?
        as usize;
    buf.get(offset + 1..offset + 1 + len)
        .map(|name| name.to_vec())
        .ok_or_else(|| corrupt(format!("resource name at {offset} is truncated")))
}

/// Parses a whole resource fork. An empty buffer is an empty fork, which is
/// what a freshly-created fork looks like before anything is written to it.
pub fn parse_fork(buf: &[u8]) -> Result<ResourceFork> {
    if buf.is_empty() {
        return Ok(ResourceFork::new());
    }

    let header: ForkHeader = read_at(buf, 0, "fork header")?;
    let data_start = header.data_offset as usize;
    let data_end = data_start + header.data_length as usize;
    let map_start = header.map_offset as usize;
    let map_end = map_start + header.map_length as usize;
    if data_end > buf.len() || map_end > buf.len() {
        return Err(corrupt(format!(
            "header claims {} bytes but the fork is {} bytes long",
            data_end.max(map_end),
            buf.len()
        )));
    }
    if (header.map_length as usize) < MAP_HEADER_SIZE + 2 {
        return Err(corrupt(format!("map is only {} bytes", header.map_length)));
    }
    // Only the bytes declared by the header are part of the data area and map
    let data = &buf[data_start..data_end];
    let map = &buf[map_start..map_end];

    let reserved = buf
        .get(FORK_HEADER_SIZE..FORK_DATA_START)
        .map(|bytes| bytes.to_vec())
        .unwrap_or_else(|| vec![0; FORK_RESERVED_SIZE]);

    let map_header: MapHeader = read_at(map, 0, "map header")?;
    let type_list = map_header.type_list_offset as usize;
    let name_list = map_header.name_list_offset as usize;

    // The count is stored minus one, so an empty fork has 0xFFFF here
    let type_count = read_u16_at(map, type_list, "type count")?.wrapping_add(1) as usize;

    let mut groups = vec![];
    for i in 0..type_count {
        let type_entry: TypeListEntry =
            read_at(map, type_list + 2 + i * TYPE_LIST_ENTRY_SIZE, "type list entry")?;
        let ref_list = type_list + type_entry.ref_list_offset as usize;
        let mut resources = vec![];
        for j in 0..=(type_entry.count_minus_one as usize) {
            let ref_entry: RefListEntry =
                read_at(map, ref_list + j * REF_LIST_ENTRY_SIZE, "reference list entry")?;
            let name = match ref_entry.name_offset {
                NO_NAME => None,
                name_offset => Some(read_pascal_string(
                    map,
                    name_list + name_offset as usize
                )?)
            };
            let offset = ref_entry.data_offset();
            let len_bytes = data.get(offset..offset + 4).ok_or_else(|| {
                corrupt(format!("resource #{} data is outside the data area", ref_entry.id))
            })?;
            let len = Cursor::new(len_bytes).read_u32::<BigEndian>()? as usize;
            let contents = data.get(offset + 4..offset + 4 + len).ok_or_else(|| {
                corrupt(format!("resource #{} data is truncated", ref_entry.id))
            })?;
            resources.push(Resource {
                id: ref_entry.id,
                name,
                attributes: ref_entry.attributes(),
                data: contents.to_vec()
            });
        }
        groups.push(ResourceGroup {
            res_type: ResType(type_entry.tag),
            resources
        });
    }

    debug!(
        "Parsed resource fork: {} bytes, {} resource types",
        buf.len(),
        groups.len()
    );

    Ok(ResourceFork {
        path: None,
        reserved,
        map_attributes: map_header.attributes,
        groups
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_is_empty_fork() {
        let fork = parse_fork(&[]).unwrap();
        assert_eq!(fork.resource_types().count(), 0);
    }

    #[test]
    fn rejects_header_pointing_past_the_end() {
        let mut buf = vec![0; FORK_DATA_START];
        // data offset 256, map offset 256, data length 0, map length 0x1000
        buf[0..4].copy_from_slice(&256u32.to_be_bytes());
        buf[4..8].copy_from_slice(&256u32.to_be_bytes());
        buf[12..16].copy_from_slice(&0x1000u32.to_be_bytes());
        assert!(matches!(
            parse_fork(&buf),
            Err(LicenseError::ContainerCorrupt(_))
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(matches!(
            parse_fork(&[0, 0, 1]),
            Err(LicenseError::ContainerCorrupt(_))
        ));
    }

    #[test]
    fn rejects_resource_data_outside_data_area() {
        let mut fork = ResourceFork::new();
        fork.write_record(ResType::new(b"TEXT"), 128, b"hello".to_vec(), "greeting")
            .unwrap();
        let mut buf = fork.to_bytes().unwrap();
        // Shrink the declared data area so the resource no longer fits
        buf[8..12].copy_from_slice(&4u32.to_be_bytes());
        assert!(matches!(
            parse_fork(&buf),
            Err(LicenseError::ContainerCorrupt(_))
        ));
    }
}
