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

use std::{fmt, io, rc::Rc};

use deku::prelude::*;
use thiserror::Error;

/// Common error type making it easier to share `Result`s between add-license crates.
///
/// In general designed to avoid needing utilities like `map_err`. Every variant
/// renders as a single diagnostic line, which is what the CLI prints before
/// exiting.
#[derive(Debug, Clone, Error)]
pub enum LicenseError {
    /// add-license was called with the wrong number of arguments. The CLI
    /// answers this with its help text rather than a diagnostic.
    #[error("Usage: add-license /path/to/TheUnflattened.dmg Language /path/to/TheLicense.rtf")]
    Usage,
    /// The language dictionary compiled into the binary is missing, or is not a
    /// property list with a top-level `<dict>`.
    #[error("Unreadable license dictionary ({0})")]
    DictionaryMissing(String),
    /// The language token passed on the command line could not be turned into
    /// a canonical language identifier with legacy language/region codes.
    /// `reason` says which of the two failed.
    #[error("'{token}' {reason}")]
    LocaleUnresolvable { token: String, reason: String },
    /// The language was resolved to `language`, but the dictionary has no
    /// usable entry for it. `reason` says what was wrong with the entry.
    #[error("'{token} ({language})' {reason}")]
    LanguageNotSupported {
        token: String,
        language: String,
        reason: String
    },
    /// One of the nine dialog strings can't be represented in the language's
    /// text encoding, or takes more than 255 bytes once encoded. `position`
    /// is 1-based.
    #[error("Dictionary string #{position} can't be converted to a Pascal string ({reason})")]
    EncodingError { position: usize, reason: String },
    /// The dictionary asked for a legacy text encoding that has no codec.
    #[error("Text encoding {0} is not supported")]
    UnsupportedTextEncoding(u32),
    /// License documents are capped at 1 MiB.
    #[error("'{path}' is over 1MB long ({size} bytes)")]
    DocumentTooLarge { path: String, size: u64 },
    /// The license document exists but couldn't be read in full.
    #[error("Error reading '{path}' ({cause})")]
    DocumentReadError { path: String, cause: Rc<io::Error> },
    /// The disk image didn't exist and couldn't be created either.
    #[error("Couldn't create output file '{path}' ({cause})")]
    ContainerCreateError { path: String, cause: Rc<io::Error> },
    /// The resource fork of the disk image couldn't be opened or created.
    #[error("Failed to open resource fork of '{path}' ({cause})")]
    ContainerOpenError { path: String, cause: Rc<io::Error> },
    /// The resource fork exists, but its header, map or data area point
    /// outside the fork or are otherwise malformed.
    #[error("Resource fork is damaged: {0}")]
    ContainerCorrupt(String),
    /// A record we need to update exists but has an implausible layout.
    #[error("Existing {res_type}#{id} is damaged: {reason}")]
    RecordCorrupt {
        res_type: ResType,
        id: i16,
        reason: String
    },
    /// Record names are Pascal strings and can't exceed 255 bytes.
    #[error("Record name '{0}' is longer than 255 bytes")]
    RecordNameTooLong(String),
    /// The next free slot would need a record id above `i16::MAX`.
    #[error("No free license slot left (next offset would be {0})")]
    SlotRangeExhausted(u32),
    /// An error occurred while writing the resource fork back to disk.
    #[error("I/O error: {0}")]
    FileIoError(Rc<io::Error>),
    /// Something went wrong while serialising or parsing a fixed-layout
    /// record. See [DekuError].
    #[error("Binary record error: {0}")]
    ByteSerialisationFailed(DekuError)
}

/// Result type where the error is always [LicenseError].
pub type Result<T> = std::result::Result<T, LicenseError>;

// Automatic conversion from other types of error to LicenseError makes the rest of the code cleaner
impl From<io::Error> for LicenseError {
    fn from(value: io::Error) -> Self {
        LicenseError::FileIoError(value.into())
    }
}

impl From<DekuError> for LicenseError {
    fn from(value: DekuError) -> Self {
        LicenseError::ByteSerialisationFailed(value)
    }
}

/// Four-character record type, eg. `LPic` or `RTF ` (note the trailing space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResType(pub [u8; 4]);

impl ResType {
    pub const fn new(tag: &[u8; 4]) -> Self {
        ResType(*tag)
    }
}

impl fmt::Display for ResType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", String::from_utf8_lossy(&self.0))
    }
}

/// Storage for tagged, numbered binary records inside a disk image.
///
/// The license code only ever talks to the container through this trait, so
/// the on-disk resource fork can be swapped for an in-memory one in tests.
/// Changes are only guaranteed to be on disk after [RecordStore::flush].
pub trait RecordStore {
    /// Returns the bytes of the record, or `None` if there is no such record.
    fn read_record(&self, res_type: ResType, id: i16) -> Option<&[u8]>;

    /// Creates the record, or replaces the contents of an existing one with
    /// the same type and id. An empty `name` leaves an existing record's name
    /// as it was.
    fn write_record(&mut self, res_type: ResType, id: i16, data: Vec<u8>, name: &str)
        -> Result<()>;

    /// Removes the record. Returns whether anything was removed.
    fn remove_record(&mut self, res_type: ResType, id: i16) -> bool;

    /// Persists every change made so far.
    fn flush(&mut self) -> Result<()>;
}
