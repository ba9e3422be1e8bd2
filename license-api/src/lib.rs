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

//! # add-license API
//!
//! Adds one localized license agreement at a time to an unflattened disk
//! image. Each call installs or replaces a single language and leaves every
//! other language in the image alone.
//!
//! ## Adding a license
//!
//! ```no_run
//! # use license_api::*;
//! # fn main() -> Result<()> {
//! let dictionary = LicenseDictionary::embedded()?;
//! let request = LicenseRequest {
//!     image_path: "My.dmg".into(),
//!     language: "English".into(),
//!     document_path: "EnglishLicense.rtf".into()
//! };
//! let outcome = add_license(&request, &dictionary, &TableLocaleResolver)?;
//! println!("{} languages", outcome.report.language_count);
//! # Ok(())
//! # }
//! ```
//!
//! The steps can also be run one by one with [prepare_license],
//! [open_container] and [write_license], which is what the CLI does so it can
//! report progress as it goes.

use std::{
    env,
    fs::OpenOptions,
    path::{Path, PathBuf}
};

use license_compiler::{
    license_slot::{install_license, LicenseRecords},
    string_table::encode_string_table,
    text_encoding::TextEncoding
};
use license_rsrc::{resource_fork_path, ResourceFork};
use tracing::{info, warn};

pub mod document;
pub mod locale;

pub use license_common::{LicenseError, RecordStore, Result};
pub use license_compiler::{
    dictionary::LicenseDictionary, license_slot::InstallReport, DOCUMENT_TYPE, LANGUAGE_INDEX_TYPE,
    STRING_TABLE_TYPE
};
pub use locale::{LocaleResolver, ResolvedLocale, TableLocaleResolver};

/// Overrides where the resource fork is read from and written to.
pub const FORK_PATH_ENV: &str = "ADD_LICENSE_FORK_PATH";

/// One run of the tool: which image, which language, which document.
#[derive(Debug, Clone)]
pub struct LicenseRequest {
    pub image_path: PathBuf,
    /// Short (`en`) or long (`English`) language name
    pub language: String,
    pub document_path: PathBuf
}

/// Everything about a license that can be worked out without touching the
/// disk image.
#[derive(Debug, Clone)]
pub struct PreparedLicense {
    pub locale: ResolvedLocale,
    pub records: LicenseRecords
}

/// A disk image's resource fork, opened for editing.
pub struct OpenedContainer {
    pub fork: ResourceFork,
    /// The image didn't exist and was created empty
    pub created_image: bool
}

#[derive(Debug, Clone)]
pub struct AddLicenseOutcome {
    pub locale: ResolvedLocale,
    pub created_image: bool,
    pub report: InstallReport
}

/// Resolves the language, encodes its dialog strings and reads the document.
pub fn prepare_license(
    request: &LicenseRequest,
    dictionary: &LicenseDictionary,
    resolver: &dyn LocaleResolver
) -> Result<PreparedLicense> {
    let locale = resolver.resolve_locale(&request.language)?;
    let language = dictionary.lookup_token(&request.language, &locale.iso)?;

    let encoding = TextEncoding::from_legacy_id(language.encoding)?;
    let script_encoding = resolver.text_encoding_for(&locale.iso);
    if script_encoding != encoding.id() {
        warn!(
            "Dictionary uses text encoding {} for '{}', its script usually uses {}",
            encoding.id(),
            locale.iso,
            script_encoding
        );
    }
    let string_table = encode_string_table(&language.strings, encoding)?;
    let document = document::load_document(&request.document_path)?;

    Ok(PreparedLicense {
        records: LicenseRecords {
            region_code: locale.region_code,
            is_wide_encoding: encoding.is_wide(),
            label: locale.iso.clone(),
            string_table,
            document
        },
        locale
    })
}

/// Where the resource fork of `image_path` is, honouring [FORK_PATH_ENV].
pub fn fork_path_for(image_path: &Path) -> PathBuf {
    match env::var_os(FORK_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => resource_fork_path(image_path)
    }
}

fn create_empty_image(image_path: &Path) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o700);
    }
    options
        .open(image_path)
        .map_err(|cause| LicenseError::ContainerCreateError {
            path: image_path.display().to_string(),
            cause: cause.into()
        })?;
    Ok(())
}

/// Opens the image's resource fork. A missing image is created empty first,
/// which is only really useful for debugging.
pub fn open_container(image_path: &Path) -> Result<OpenedContainer> {
    let created_image = !image_path.exists();
    if created_image {
        create_empty_image(image_path)?;
        info!("Created empty image {:?}", image_path);
    }
    let fork = ResourceFork::open(&fork_path_for(image_path))?;
    Ok(OpenedContainer {
        fork,
        created_image
    })
}

/// Installs the prepared records and persists the store.
pub fn write_license<S: RecordStore + ?Sized>(
    store: &mut S,
    records: LicenseRecords
) -> Result<InstallReport> {
    let report = install_license(store, records)?;
    store.flush()?;
    Ok(report)
}

/// Performs all the steps of adding one license to a disk image.
pub fn add_license(
    request: &LicenseRequest,
    dictionary: &LicenseDictionary,
    resolver: &dyn LocaleResolver
) -> Result<AddLicenseOutcome> {
    let prepared = prepare_license(request, dictionary, resolver)?;
    let mut container = open_container(&request.image_path)?;
    let report = write_license(&mut container.fork, prepared.records)?;
    Ok(AddLicenseOutcome {
        locale: prepared.locale,
        created_image: container.created_image,
        report
    })
}
