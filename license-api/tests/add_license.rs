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

use std::{
    fs,
    path::{Path, PathBuf}
};

use license_api::*;
use license_common::ResType;
use license_compiler::{
    language_index::LanguageIndex,
    string_table::decode_string_table,
    text_encoding::{TextEncoding, MAC_ROMAN},
    DOCUMENT_TYPE, LANGUAGE_INDEX_ID, LANGUAGE_INDEX_TYPE, STRING_TABLE_TYPE
};
use license_rsrc::ResourceFork;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    image: PathBuf
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("My.dmg");
        Workspace { dir, image }
    }

    fn document(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn add(&self, language: &str, document: &Path) -> Result<AddLicenseOutcome> {
        let request = LicenseRequest {
            image_path: self.image.clone(),
            language: language.into(),
            document_path: document.to_path_buf()
        };
        let dictionary = LicenseDictionary::embedded().unwrap();
        add_license(&request, &dictionary, &TableLocaleResolver)
    }

    fn fork(&self) -> ResourceFork {
        ResourceFork::open(&fork_path_for(&self.image)).unwrap()
    }
}

fn index_of(fork: &ResourceFork) -> LanguageIndex {
    LanguageIndex::from_record(
        fork.read_record(LANGUAGE_INDEX_TYPE, LANGUAGE_INDEX_ID)
            .unwrap()
    )
    .unwrap()
}

#[test]
fn english_then_french_fill_consecutive_slots() {
    let ws = Workspace::new();
    let english = ws.document("en.rtf", b"{\\rtf1 English terms}");
    let french = ws.document("fr.rtf", b"{\\rtf1 Conditions}");

    let outcome = ws.add("English", &english).unwrap();
    assert!(outcome.created_image);
    assert_eq!(outcome.locale.iso, "en");
    assert_eq!(outcome.report.language_count, 1);
    assert_eq!(outcome.report.slot_id, 5000);

    let outcome = ws.add("fr", &french).unwrap();
    assert!(!outcome.created_image);
    assert_eq!(outcome.report.language_count, 2);
    assert_eq!(outcome.report.slot_id, 5001);

    let fork = ws.fork();
    assert_eq!(
        fork.read_record(LANGUAGE_INDEX_TYPE, LANGUAGE_INDEX_ID),
        Some(&[0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 0, 0][..])
    );
    assert_eq!(
        fork.read_record(DOCUMENT_TYPE, 5000),
        Some(&b"{\\rtf1 English terms}"[..])
    );
    assert_eq!(
        fork.read_record(DOCUMENT_TYPE, 5001),
        Some(&b"{\\rtf1 Conditions}"[..])
    );
    assert_eq!(fork.record_name(DOCUMENT_TYPE, 5000), Some(&b"en"[..]));
    assert_eq!(fork.record_name(STRING_TABLE_TYPE, 5001), Some(&b"fr"[..]));

    let mac_roman = TextEncoding::from_legacy_id(MAC_ROMAN).unwrap();
    let dictionary = LicenseDictionary::embedded().unwrap();
    let strings = decode_string_table(
        fork.read_record(STRING_TABLE_TYPE, 5001).unwrap(),
        5001,
        mac_roman
    )
    .unwrap();
    assert_eq!(strings, dictionary.lookup("fr").unwrap().strings.to_vec());
}

#[test]
fn re_adding_english_only_replaces_its_records() {
    let ws = Workspace::new();
    ws.add("en", &ws.document("en1.rtf", b"first")).unwrap();
    ws.add("fr", &ws.document("fr.rtf", b"french")).unwrap();
    let index_before = index_of(&ws.fork());
    let french_strings = ws
        .fork()
        .read_record(STRING_TABLE_TYPE, 5001)
        .unwrap()
        .to_vec();

    let outcome = ws.add("EN", &ws.document("en2.rtf", b"second")).unwrap();
    assert_eq!(outcome.report.slot_id, 5000);
    assert_eq!(outcome.report.language_count, 2);
    assert!(!outcome.report.new_slot);

    let fork = ws.fork();
    assert_eq!(index_of(&fork), index_before);
    assert_eq!(fork.read_record(DOCUMENT_TYPE, 5000), Some(&b"second"[..]));
    assert_eq!(fork.read_record(DOCUMENT_TYPE, 5001), Some(&b"french"[..]));
    assert_eq!(
        fork.read_record(STRING_TABLE_TYPE, 5001),
        Some(&french_strings[..])
    );
    assert_eq!(fork.count(DOCUMENT_TYPE), 2);
    assert_eq!(fork.count(STRING_TABLE_TYPE), 2);
}

#[test]
fn wide_encodings_are_flagged_in_the_index() {
    let ws = Workspace::new();
    ws.add("Japanese", &ws.document("ja.rtf", b"ja")).unwrap();
    let index = index_of(&ws.fork());
    assert_eq!(index.entries[0].region_code, 14);
    assert!(index.entries[0].is_wide_encoding);
}

#[test]
fn other_resources_survive() {
    let ws = Workspace::new();
    fs::write(&ws.image, b"").unwrap();
    let vers = ResType::new(b"vers");
    let mut fork = ws.fork();
    fork.write_record(vers, 1, vec![1, 0, 0x80, 0], "").unwrap();
    fork.flush().unwrap();

    ws.add("de", &ws.document("de.rtf", b"deutsch")).unwrap();
    let fork = ws.fork();
    assert_eq!(fork.read_record(vers, 1), Some(&[1, 0, 0x80, 0][..]));
    assert_eq!(fork.read_record(DOCUMENT_TYPE, 5000), Some(&b"deutsch"[..]));
}

#[test]
fn index_keeps_a_name_given_by_another_tool() {
    let ws = Workspace::new();
    ws.add("en", &ws.document("en.rtf", b"english")).unwrap();
    let mut fork = ws.fork();
    let index = fork
        .read_record(LANGUAGE_INDEX_TYPE, LANGUAGE_INDEX_ID)
        .unwrap()
        .to_vec();
    fork.write_record(LANGUAGE_INDEX_TYPE, LANGUAGE_INDEX_ID, index, "Licenses")
        .unwrap();
    fork.flush().unwrap();

    ws.add("fr", &ws.document("fr.rtf", b"french")).unwrap();
    let fork = ws.fork();
    assert_eq!(
        fork.record_name(LANGUAGE_INDEX_TYPE, LANGUAGE_INDEX_ID),
        Some(&b"Licenses"[..])
    );
    assert_eq!(index_of(&fork).count(), 2);
}

#[test]
fn failures_before_the_image_is_touched() {
    let ws = Workspace::new();
    let document = ws.document("en.rtf", b"doc");

    assert!(matches!(
        ws.add("Klingonese", &document),
        Err(LicenseError::LocaleUnresolvable { .. })
    ));
    // Resolvable, but the dictionary only has plain English
    let err = ws.add("en_GB", &document).unwrap_err();
    assert!(matches!(err, LicenseError::LanguageNotSupported { .. }));
    assert_eq!(err.to_string(), "'en_GB (en-GB)' is not in the dictionary");
    let huge = ws.document("huge.rtf", &vec![b' '; 1024 * 1024 + 1]);
    assert!(matches!(
        ws.add("en", &huge),
        Err(LicenseError::DocumentTooLarge { .. })
    ));
    assert!(!ws.image.exists());
}

#[test]
fn corrupt_index_is_reported_and_left_alone() {
    let ws = Workspace::new();
    fs::write(&ws.image, b"").unwrap();
    let mut fork = ws.fork();
    // Claims three entries, carries none
    fork.write_record(LANGUAGE_INDEX_TYPE, LANGUAGE_INDEX_ID, vec![0, 0, 0, 3], "")
        .unwrap();
    fork.flush().unwrap();
    let fork_path = fork_path_for(&ws.image);
    let before = fs::read(&fork_path).unwrap();

    assert!(matches!(
        ws.add("en", &ws.document("en.rtf", b"doc")),
        Err(LicenseError::RecordCorrupt { .. })
    ));
    assert_eq!(fs::read(&fork_path).unwrap(), before);
}
