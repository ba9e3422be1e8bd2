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

//! # Resource forks
//!
//! Reads and writes the classic resource fork layout that unflattened disk
//! images use to carry their license agreements. The whole fork is parsed
//! into memory, edited through [RecordStore], and written back in one go by
//! [RecordStore::flush].

use std::{
    fs::{self, OpenOptions},
    io::Read,
    path::{Path, PathBuf}
};

use license_common::*;
use tracing::{debug, info};

pub mod fork_parser;
pub mod fork_types;
pub mod fork_writer;

use fork_types::FORK_RESERVED_SIZE;

/// One resource inside the fork.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: i16,
    /// Raw Pascal string bytes, `None` for unnamed resources
    pub name: Option<Vec<u8>>,
    pub attributes: u8,
    pub data: Vec<u8>
}

/// All resources of one type, in the order they appear in the fork's map.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGroup {
    pub res_type: ResType,
    pub resources: Vec<Resource>
}

/// An in-memory resource fork, optionally tied to a file on disk.
#[derive(Debug, Clone)]
pub struct ResourceFork {
    path: Option<PathBuf>,
    /// Bytes 16..256 of the fork, kept verbatim
    pub reserved: Vec<u8>,
    pub map_attributes: u16,
    pub groups: Vec<ResourceGroup>
}

impl Default for ResourceFork {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceFork {
    /// Returns an empty fork that isn't backed by a file. [RecordStore::flush]
    /// is a no-op for these.
    pub fn new() -> Self {
        ResourceFork {
            path: None,
            reserved: vec![0; FORK_RESERVED_SIZE],
            map_attributes: 0,
            groups: vec![]
        }
    }

    /// Opens the fork at `fork_path`, creating an empty one if there isn't a
    /// fork there yet.
    pub fn open(fork_path: &Path) -> Result<Self> {
        let open_error = |cause: std::io::Error| LicenseError::ContainerOpenError {
            path: fork_path.display().to_string(),
            cause: cause.into()
        };
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(fork_path)
            .map_err(open_error)?;
        let mut buf = vec![];
        file.read_to_end(&mut buf).map_err(open_error)?;

        let mut fork = fork_parser::parse_fork(&buf)?;
        fork.path = Some(fork_path.to_path_buf());
        info!("Opened resource fork {:?} ({} bytes)", fork_path, buf.len());
        Ok(fork)
    }

    /// Serialises the fork to its on-disk layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        fork_writer::write_fork(self)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = ResType> + '_ {
        self.groups
            .iter()
            .filter(|group| !group.resources.is_empty())
            .map(|group| group.res_type)
    }

    /// Number of resources of the given type.
    pub fn count(&self, res_type: ResType) -> usize {
        self.group(res_type)
            .map(|group| group.resources.len())
            .unwrap_or(0)
    }

    pub fn record_name(&self, res_type: ResType, id: i16) -> Option<&[u8]> {
        self.find(res_type, id)
            .and_then(|resource| resource.name.as_deref())
    }

    fn group(&self, res_type: ResType) -> Option<&ResourceGroup> {
        self.groups.iter().find(|group| group.res_type == res_type)
    }

    fn find(&self, res_type: ResType, id: i16) -> Option<&Resource> {
        self.group(res_type)?
            .resources
            .iter()
            .find(|resource| resource.id == id)
    }
}

impl RecordStore for ResourceFork {
    fn read_record(&self, res_type: ResType, id: i16) -> Option<&[u8]> {
        self.find(res_type, id).map(|resource| &resource.data[..])
    }

    fn write_record(
        &mut self,
        res_type: ResType,
        id: i16,
        data: Vec<u8>,
        name: &str
    ) -> Result<()> {
        if name.len() > 255 {
            return Err(LicenseError::RecordNameTooLong(name.into()));
        }
        let name = match name {
            "" => None,
            name => Some(name.as_bytes().to_vec())
        };

        let group_index = match self
            .groups
            .iter()
            .position(|group| group.res_type == res_type)
        {
            Some(index) => index,
            None => {
                self.groups.push(ResourceGroup {
                    res_type,
                    resources: vec![]
                });
                self.groups.len() - 1
            }
        };
        let resources = &mut self.groups[group_index].resources;
        match resources.iter_mut().find(|resource| resource.id == id) {
            Some(existing) => {
                existing.data = data;
                if name.is_some() {
                    existing.name = name;
                }
            }
            None => resources.push(Resource {
                id,
                name,
                attributes: 0,
                data
            })
        }
        debug!("Staged {}#{}", res_type, id);
        Ok(())
    }

    fn remove_record(&mut self, res_type: ResType, id: i16) -> bool {
        let Some(group) = self
            .groups
            .iter_mut()
            .find(|group| group.res_type == res_type)
        else {
            return false;
        };
        let before = group.resources.len();
        group.resources.retain(|resource| resource.id != id);
        let removed = group.resources.len() != before;
        if removed {
            debug!("Removed {}#{}", res_type, id);
        }
        removed
    }

    fn flush(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = self.to_bytes()?;
        fs::write(path, &bytes)?;
        info!("Wrote resource fork {:?} ({} bytes)", path, bytes.len());
        Ok(())
    }
}

/// Where the resource fork of `image` lives.
///
/// macOS exposes it as a named fork of the file itself. Other platforms have
/// no forks, so the fork is kept in a `.rsrc` file next to the image.
pub fn resource_fork_path(image: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        image.join("..namedfork").join("rsrc")
    } else {
        let mut sidecar = image.as_os_str().to_owned();
        sidecar.push(".rsrc");
        PathBuf::from(sidecar)
    }
}
