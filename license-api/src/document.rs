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
use std::{fs::File, io::Read, path::Path};
use tracing::debug;

/// 1MB ought to be enough for everybody!
pub const MAX_DOCUMENT_SIZE: u64 = 1024 * 1024;

/// Reads the license document verbatim. Its contents are never inspected.
pub fn load_document(path: &Path) -> Result<Vec<u8>> {
    let read_error = |cause: std::io::Error| LicenseError::DocumentReadError {
        path: path.display().to_string(),
        cause: cause.into()
    };
    let too_large = |size: u64| LicenseError::DocumentTooLarge {
        path: path.display().to_string(),
        size
    };

    let file = File::open(path).map_err(read_error)?;
    let size = file.metadata().map_err(read_error)?.len();
    if size > MAX_DOCUMENT_SIZE {
        return Err(too_large(size));
    }

    // The file could still grow between the size check and the read
    let mut contents = Vec::with_capacity(size as usize);
    file.take(MAX_DOCUMENT_SIZE + 1)
        .read_to_end(&mut contents)
        .map_err(read_error)?;
    if contents.len() as u64 > MAX_DOCUMENT_SIZE {
        return Err(too_large(contents.len() as u64));
    }

    debug!("Read {} byte license document {:?}", contents.len(), path);
    Ok(contents)
}
