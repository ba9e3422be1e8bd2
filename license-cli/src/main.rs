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

use license_api::{
    open_container, prepare_license, write_license, InstallReport, LicenseDictionary,
    LicenseError, LicenseRequest, ResolvedLocale, Result, TableLocaleResolver, DOCUMENT_TYPE,
    LANGUAGE_INDEX_TYPE, STRING_TABLE_TYPE
};
use std::{env, io, process::ExitCode};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn parse_args(args: &[String]) -> Result<LicenseRequest> {
    match args {
        [_, image, language, document] => Ok(LicenseRequest {
            image_path: image.into(),
            language: language.clone(),
            document_path: document.into()
        }),
        _ => Err(LicenseError::Usage)
    }
}

fn print_help(dictionary: &LicenseDictionary) {
    println!("Add one license at a time to a (unflattened) disk image.\n");
    println!("{}", LicenseError::Usage);
    print!("\n\tLanguages supported:");
    for key in dictionary.keys() {
        print!(" {key}");
    }
    println!();
    println!("\t\tYou can also use long equivalents like English, French etc.");
    println!("\t\tThe first language added will be the default language (usually English).\n");
    println!("Here's an actual usage example from a build script:");
    println!("\thdiutil unflatten \"$SOURCE_ROOT/My.dmg\"");
    println!(
        "\t\"$BUILT_PRODUCTS_DIR/add-license\" \"$SOURCE_ROOT/My.dmg\" English \"$SOURCE_ROOT/EnglishLicense.rtf\""
    );
    println!(
        "\t\"$BUILT_PRODUCTS_DIR/add-license\" \"$SOURCE_ROOT/My.dmg\" French \"$SOURCE_ROOT/FrenchLicense.rtf\""
    );
    println!("\thdiutil flatten \"$SOURCE_ROOT/My.dmg\"\n");
}

/// The progress lines printed once a license has been written.
fn progress_lines(
    request: &LicenseRequest,
    locale: &ResolvedLocale,
    report: &InstallReport
) -> Vec<String> {
    vec![
        format!(
            "Wrote {LANGUAGE_INDEX_TYPE} with {} licenses",
            report.language_count
        ),
        format!(
            "Wrote {DOCUMENT_TYPE}#{} for '{}({})'",
            report.slot_id, request.language, locale.iso
        ),
        format!(
            "Wrote {STRING_TABLE_TYPE}#{} for '{}({})', LangCode = {}, RegionCode = {}",
            report.slot_id, request.language, locale.iso, locale.language_code, locale.region_code
        ),
    ]
}

// Lines are collected in `out` even when a later step fails
fn run(
    request: &LicenseRequest,
    dictionary: &LicenseDictionary,
    out: &mut Vec<String>
) -> Result<()> {
    let prepared = prepare_license(request, dictionary, &TableLocaleResolver)?;

    let mut container = open_container(&request.image_path)?;
    if container.created_image {
        out.push(format!(
            "Created empty output file '{}'",
            request.image_path.display()
        ));
    }

    let report = write_license(&mut container.fork, prepared.records)?;
    debug!("Slot {} new: {}", report.slot_id, report.new_slot);
    out.extend(progress_lines(request, &prepared.locale, &report));
    Ok(())
}

fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1
    }
}

/// Adds one localized license agreement to an unflattened disk image.
///
/// ```
/// $ hdiutil unflatten My.dmg
/// $ add-license My.dmg English EnglishLicense.rtf
/// Wrote 'LPic' with 1 licenses
/// Wrote 'RTF '#5000 for 'English(en)'
/// Wrote 'STR#'#5000 for 'English(en)', LangCode = 0, RegionCode = 0
/// $ hdiutil flatten My.dmg
/// ```
///
/// Run without arguments to list the supported languages. Set `RUST_LOG` for
/// diagnostics on stderr and `ADD_LICENSE_FORK_PATH` to write the resource
/// fork somewhere other than its default location.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        )
        .with_writer(io::stderr)
        .init();

    let dictionary = match LicenseDictionary::embedded() {
        Ok(dictionary) => dictionary,
        Err(e) => {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = env::args().collect();
    let request = match parse_args(&args) {
        Ok(request) => request,
        Err(_) => {
            print_help(&dictionary);
            return ExitCode::SUCCESS;
        }
    };

    let mut lines = vec![];
    let result = run(&request, &dictionary, &mut lines);
    for line in &lines {
        println!("{line}");
    }
    if let Err(e) = &result {
        println!("{e}");
    }
    ExitCode::from(exit_status(&result))
}
