use std::fs;
use std::path::Path;

use bpc_ingest::{AssetError, AssetStore, LocalAssetStore, sha256_hex};
use bpc_model::AssetId;

const MAPPING_CSV: &str = "variable,target_field,choices\ndrugs_drug_1,AGENT,\"1, Aspirin | 2, Ibuprofen\"\n";
const RETRACTION_TSV: &str = "record_id\tcohort\nP-0001\tNSCLC\n\nP-0002\tCRC\n";

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dir");
    }
    fs::write(path, contents).expect("write file");
}

fn manifest(entries: &str) -> String {
    format!(
        "[manifest]\nschema = \"bpc-export.asset-manifest\"\nschema_version = 1\n\n{entries}"
    )
}

fn id(value: &str) -> AssetId {
    AssetId::new(value).expect("asset id")
}

#[test]
fn reads_csv_and_tsv_assets() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "mapping/reference.csv", MAPPING_CSV);
    write(dir.path(), "lists/retraction.tsv", RETRACTION_TSV);
    let sha = sha256_hex(MAPPING_CSV.as_bytes());
    write(
        dir.path(),
        "manifest.toml",
        &manifest(&format!(
            "[[assets]]\nid = \"syn_map\"\npath = \"mapping/reference.csv\"\nkind = \"csv\"\nsha256 = \"{sha}\"\n\n\
             [[assets]]\nid = \"syn_retract\"\npath = \"lists/retraction.tsv\"\nkind = \"tsv\"\n"
        )),
    );

    let store = LocalAssetStore::open(dir.path()).expect("open store");
    let mapping = store.read_table(&id("syn_map")).expect("mapping");
    assert_eq!(mapping.headers, vec!["variable", "target_field", "choices"]);
    assert_eq!(mapping.rows[0][2], "1, Aspirin | 2, Ibuprofen");
    assert_eq!(store.checksum(&id("syn_map")), Some(sha));

    let retraction = store.read_table(&id("syn_retract")).expect("retraction");
    assert_eq!(retraction.len(), 2, "blank lines are skipped");
    assert_eq!(retraction.rows[1], vec!["P-0002", "CRC"]);
    assert_eq!(store.checksum(&id("syn_retract")), None);
}

#[test]
fn checksum_mismatch_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "mapping.csv", MAPPING_CSV);
    let wrong = sha256_hex(b"something else");
    write(
        dir.path(),
        "manifest.toml",
        &manifest(&format!(
            "[[assets]]\nid = \"syn_map\"\npath = \"mapping.csv\"\nkind = \"csv\"\nsha256 = \"{wrong}\"\n"
        )),
    );
    let store = LocalAssetStore::open(dir.path()).expect("open store");
    let err = store.read_table(&id("syn_map")).expect_err("mismatch");
    assert!(matches!(err, AssetError::Sha256Mismatch { .. }), "{err}");
}

#[test]
fn missing_and_unknown_assets_are_errors() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "manifest.toml",
        &manifest("[[assets]]\nid = \"syn_gone\"\npath = \"gone.csv\"\nkind = \"csv\"\n"),
    );
    let store = LocalAssetStore::open(dir.path()).expect("open store");
    let missing = store.read_table(&id("syn_gone")).expect_err("missing file");
    assert!(matches!(missing, AssetError::MissingFile { .. }));
    let unknown = store.read_table(&id("syn_other")).expect_err("unknown");
    assert_eq!(
        unknown.to_string(),
        "asset syn_other is not listed in the asset manifest"
    );
}

#[test]
fn manifest_schema_is_checked() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "manifest.toml",
        "[manifest]\nschema = \"something-else\"\nschema_version = 1\n",
    );
    let err = LocalAssetStore::open(dir.path()).expect_err("bad schema");
    assert!(matches!(err, AssetError::InvalidManifest { .. }));

    write(
        dir.path(),
        "manifest.toml",
        &manifest(
            "[[assets]]\nid = \"a\"\npath = \"x.csv\"\nkind = \"csv\"\n\n\
             [[assets]]\nid = \"a\"\npath = \"y.csv\"\nkind = \"csv\"\n",
        ),
    );
    let err = LocalAssetStore::open(dir.path()).expect_err("duplicate id");
    assert!(err.to_string().contains("duplicate asset id: a"));
}

#[test]
fn missing_manifest_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = LocalAssetStore::open(dir.path()).expect_err("no manifest");
    assert!(matches!(err, AssetError::Io { .. }));
}
