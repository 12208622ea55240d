use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};

use bpc_map::{
    OncotreeEntry, OncotreeReference, canonicalize_cohort_labels, invalid_codes_message, validate,
};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let buffer = self.buffer.lock().expect("log buffer");
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

struct CapturedWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, logs.contents())
}

fn entry(cancer_type: &str) -> OncotreeEntry {
    let mut entry = OncotreeEntry::new();
    entry.insert("CANCER_TYPE".to_string(), cancer_type.to_string());
    entry
}

fn reference(keys: &[&str]) -> OncotreeReference {
    let entries: BTreeMap<String, OncotreeEntry> = keys
        .iter()
        .map(|key| ((*key).to_string(), entry(&format!("{key} type"))))
        .collect();
    OncotreeReference::new(entries)
}

#[test]
fn invalid_codes_are_warned_once_in_first_appearance_order() {
    let reference = reference(&["RCC", "OVARY"]);
    let codes = [
        "Renal Cell Carcinoma",
        "Renal Clear Cell Carcinoma",
        "Renal Cell Carcinoma",
    ];
    let (invalid, logs) = with_captured_logs(|| validate(codes, &reference));
    assert_eq!(
        invalid,
        vec!["Renal Cell Carcinoma", "Renal Clear Cell Carcinoma"]
    );
    assert!(logs.contains(
        "There are invalid values in ONCOTREE_CODE column in the clinical df: \
         ['Renal Cell Carcinoma', 'Renal Clear Cell Carcinoma']"
    ));
    assert_eq!(logs.matches("There are invalid values").count(), 1);
    assert!(logs.contains("WARN"));
}

#[test]
fn partially_invalid_codes_list_only_the_invalid_ones() {
    let reference = reference(&["RCC", "OVARY"]);
    let (invalid, logs) = with_captured_logs(|| {
        validate(["RCC", "Renal Cell Carcinoma", "ovary"], &reference)
    });
    assert_eq!(invalid, vec!["Renal Cell Carcinoma"]);
    assert!(logs.contains("df: ['Renal Cell Carcinoma']"));
}

#[test]
fn valid_codes_emit_no_warning() {
    let reference = reference(&["RCC", "OVARY"]);
    let (invalid, logs) = with_captured_logs(|| validate(["RCC", "OVARY", ""], &reference));
    assert!(invalid.is_empty());
    assert!(!logs.contains("invalid values"));
    assert_eq!(invalid_codes_message(&invalid), None);
}

#[test]
fn canonicalize_rekeys_renal_and_ovarian_codes() {
    let original = reference(&["RCC", "OVARY"]);
    let canonical = canonicalize_cohort_labels(&original);
    let keys: Vec<&String> = canonical.entries().keys().collect();
    assert_eq!(keys, vec!["OVARIAN", "RENAL"]);
    assert_eq!(canonical.entries()["RENAL"], entry("RCC type"));
    assert_eq!(canonical.entries()["OVARIAN"], entry("OVARY type"));
    assert!(original.entries().contains_key("RCC"), "input is untouched");
}

#[test]
fn canonicalize_matches_without_case() {
    let original = reference(&["rCC", "OvArY"]);
    let canonical = canonicalize_cohort_labels(&original);
    let keys: Vec<&String> = canonical.entries().keys().collect();
    assert_eq!(keys, vec!["OVARIAN", "RENAL"]);
    assert_eq!(canonical.entries()["RENAL"], entry("rCC type"));
}

#[test]
fn canonicalize_passes_other_keys_through() {
    let original = reference(&["BONE", "BRAIN", "Luad"]);
    let canonical = canonicalize_cohort_labels(&original);
    assert_eq!(canonical, original);
}

#[test]
fn canonicalize_warns_when_case_variants_collide() {
    let original = reference(&["RCC", "rcc", "OVARY"]);
    let (canonical, logs) = with_captured_logs(|| canonicalize_cohort_labels(&original));
    assert_eq!(canonical.entries().len(), 2);
    assert_eq!(canonical.entries()["RENAL"], entry("rcc type"));
    assert_eq!(logs.matches("replaces an earlier entry").count(), 1);
    assert!(logs.contains("code=rcc"));
}
