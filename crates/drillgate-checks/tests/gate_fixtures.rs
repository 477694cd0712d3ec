//! Integration tests: run the gate over the on-disk fixture tree.
//!
//! `tests/fixtures/golden` is a two-workspace content root whose stored
//! analytics blocks match what the gate recomputes. Each adversarial case
//! copies it into a temp dir, breaks one thing, and checks that exactly
//! that thing is reported.

use drillgate_checks::{
    AnalyticsMode, GateConfig, GateOptions, ReviewSnapshot, validate, validate_store,
};
use drillgate_kernel::{FindingCode, Report, Verdict};
use drillgate_store::{FsBlobStore, content_version_id};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn golden_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/golden")
}

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "drillgate-checks-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).expect("target dir should be created");
    for entry in fs::read_dir(from).expect("fixture dir should be readable") {
        let entry = entry.expect("dir entry");
        let target = to.join(entry.file_name());
        if entry.file_type().expect("file type").is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("fixture file should copy");
        }
    }
}

fn golden_copy(prefix: &str) -> TempDirGuard {
    let tmp = TempDirGuard::new(prefix);
    copy_tree(&golden_dir(), tmp.path());
    tmp
}

fn read_doc(root: &Path, key: &str) -> Value {
    let path = root.join(key);
    let text = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()))
}

fn write_doc(root: &Path, key: &str, doc: &Value) {
    let path = root.join(key);
    fs::create_dir_all(path.parent().expect("key has a parent")).expect("parent dir");
    fs::write(&path, serde_json::to_vec_pretty(doc).expect("doc serializes"))
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}

fn edit(root: &Path, key: &str, change: impl FnOnce(&mut Value)) {
    let mut doc = read_doc(root, key);
    change(&mut doc);
    write_doc(root, key, &doc);
}

fn hard_codes(report: &Report) -> Vec<FindingCode> {
    report.hard_findings().map(|f| f.code).collect()
}

fn run_with(root: &Path, config: GateConfig) -> Report {
    let options = GateOptions {
        config,
        ..GateOptions::default()
    };
    validate_store(&FsBlobStore::new(root), &options).expect("gate should run")
}

#[test]
fn golden_tree_passes_clean() {
    let report = validate(&golden_dir()).expect("gate should run");
    assert!(
        report.findings.is_empty(),
        "unexpected findings: {:#?}",
        report.findings
    );
    assert!(report.passed());
    insta::assert_json_snapshot!(report.workspaces, @r###"
    [
      {
        "workspace": "es",
        "verdict": "pass",
        "documentCount": 12,
        "hardCount": 0,
        "warningCount": 0
      },
      {
        "workspace": "fr",
        "verdict": "pass",
        "documentCount": 3,
        "hardCount": 0,
        "warningCount": 0
      }
    ]
    "###);
}

#[test]
fn single_workspace_directory_validates_as_that_workspace() {
    let report = validate(&golden_dir().join("es")).expect("gate should run");
    assert!(report.passed(), "{:#?}", report.findings);
    assert_eq!(report.workspaces.len(), 1);
    assert_eq!(report.workspaces[0].workspace, "es");
    assert_eq!(report.workspaces[0].document_count, 12);
}

#[test]
fn workspace_id_comes_from_the_catalog_not_the_directory() {
    let tmp = TempDirGuard::new("mounted");
    let dir = tmp.path().join("spanish-build");
    copy_tree(&golden_dir().join("es"), &dir);
    edit(&dir, "packs/cafe/pack.json", |doc| {
        doc["analytics"]["intendedOutcome"] = json!("TODO: fill in");
    });

    let report = validate(&dir).expect("gate should run");
    assert_eq!(report.workspaces[0].workspace, "es");
    assert_eq!(hard_codes(&report), vec![FindingCode::PlaceholderMarker]);
    assert_eq!(report.findings[0].path, "es/packs/cafe/pack.json");
}

#[test]
fn unparseable_workspace_catalog_falls_back_to_directory_name() {
    let tmp = TempDirGuard::new("mounted-bad-catalog");
    let dir = tmp.path().join("es");
    copy_tree(&golden_dir().join("es"), &dir);
    fs::write(dir.join("catalog.json"), "{").expect("catalog should be written");

    let report = validate(&dir).expect("gate should run");
    assert_eq!(report.workspaces[0].workspace, "es");
    let parse_errors: Vec<_> = report
        .findings
        .iter()
        .filter(|f| f.code == FindingCode::ParseError)
        .map(|f| f.path.as_str())
        .collect();
    assert_eq!(parse_errors, vec!["es/catalog.json"]);
}

#[test]
fn repeated_runs_render_identical_bytes() {
    let tmp = golden_copy("determinism");
    edit(tmp.path(), "es/packs/index.json", |doc| {
        doc["items"][1]["entryUrl"] = json!("/es/packs/churros/pack.json");
    });
    let first = run_with(tmp.path(), GateConfig::default());
    let second = run_with(
        tmp.path(),
        GateConfig {
            workers: 1,
            ..GateConfig::default()
        },
    );
    assert_eq!(
        first.to_json_pretty().expect("report renders"),
        second.to_json_pretty().expect("report renders")
    );
    assert!(second.report_digest.starts_with("gr1_"));
}

#[test]
fn validation_leaves_the_tree_untouched() {
    let tmp = golden_copy("idempotent");
    let store = FsBlobStore::new(tmp.path());
    let before = content_version_id(&store, "es").expect("version id");
    let first = run_with(tmp.path(), GateConfig::default());
    let second = run_with(tmp.path(), GateConfig::default());
    assert_eq!(first, second);
    assert_eq!(content_version_id(&store, "es").expect("version id"), before);
}

#[test]
fn duplicate_pack_id_fails_the_workspace() {
    let tmp = golden_copy("dup-id");
    let saludos = read_doc(tmp.path(), "es/packs/saludos/pack.json");
    for (dir, title) in [("dup_pack", "Copia uno"), ("dup_pack_2", "Copia dos")] {
        let mut doc = saludos.clone();
        doc["id"] = json!("dup_pack");
        doc["title"] = json!(title);
        write_doc(tmp.path(), &format!("es/packs/{dir}/pack.json"), &doc);
    }

    let report = run_with(tmp.path(), GateConfig::default());
    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(hard_codes(&report), vec![FindingCode::DuplicateId]);
    let dup = report.hard_findings().next().expect("one hard finding");
    assert_eq!(dup.path, "es/packs/dup_pack_2/pack.json");
    assert!(dup.message.contains("Copia uno"), "{}", dup.message);
    assert!(dup.message.contains("Copia dos"), "{}", dup.message);

    // Neither copy is listed by an index.
    let orphans = report
        .warnings()
        .filter(|f| f.code == FindingCode::OrphanDocument)
        .count();
    assert_eq!(orphans, 2);
    let fr = report.workspace("fr").expect("fr summary");
    assert_eq!(fr.verdict, Verdict::Pass);
}

#[test]
fn placeholder_outcome_fails() {
    let tmp = golden_copy("placeholder");
    edit(tmp.path(), "es/packs/mercado/pack.json", |doc| {
        doc["analytics"]["intendedOutcome"] = json!("TODO: fill in");
    });
    let report = run_with(tmp.path(), GateConfig::default());
    assert_eq!(hard_codes(&report), vec![FindingCode::PlaceholderMarker]);
    let finding = report.hard_findings().next().expect("one hard finding");
    assert_eq!(finding.path, "es/packs/mercado/pack.json");
    assert_eq!(finding.workspace, "es");
}

#[test]
fn dangling_entry_url_names_the_index() {
    let tmp = golden_copy("dangling");
    edit(tmp.path(), "es/packs/index.json", |doc| {
        doc["items"][1]["entryUrl"] = json!("/es/packs/churros/pack.json");
    });
    let report = run_with(tmp.path(), GateConfig::default());
    assert_eq!(hard_codes(&report), vec![FindingCode::DanglingReference]);
    let finding = report.hard_findings().next().expect("one hard finding");
    assert_eq!(finding.path, "es/packs/index.json");
    assert!(finding.message.contains("items[1].entryUrl"), "{}", finding.message);
    assert!(
        finding.message.contains("es/packs/churros/pack.json"),
        "{}",
        finding.message
    );
    // The track still reaches `cafe` by id.
    assert_eq!(report.warnings().count(), 0);
}

#[test]
fn wrong_total_on_a_continuation_page() {
    let tmp = golden_copy("total");
    edit(tmp.path(), "es/packs/pages/2.json", |doc| {
        doc["total"] = json!(4);
    });
    let report = run_with(tmp.path(), GateConfig::default());
    assert_eq!(hard_codes(&report), vec![FindingCode::TotalMismatch]);
    assert_eq!(
        report.hard_findings().next().map(|f| f.path.as_str()),
        Some("es/packs/pages/2.json")
    );
}

#[test]
fn stale_score_is_hard_only_when_authoritative() {
    let tmp = golden_copy("stale-score");
    edit(tmp.path(), "es/drills/ser_estar/drill.json", |doc| {
        doc["analytics"]["slotSwitchDensity"] = json!(0.5);
    });

    let report = run_with(tmp.path(), GateConfig::default());
    assert_eq!(hard_codes(&report), vec![FindingCode::AnalyticsScoreMismatch]);

    let legacy = run_with(
        tmp.path(),
        GateConfig {
            analytics_mode: AnalyticsMode::Legacy,
            ..GateConfig::default()
        },
    );
    assert!(legacy.passed());
    let codes: Vec<_> = legacy.warnings().map(|f| f.code).collect();
    assert_eq!(codes, vec![FindingCode::AnalyticsScoreMismatch]);
}

#[test]
fn baseline_catches_retyped_fields() {
    let golden = FsBlobStore::new(golden_dir());
    let same = validate_store(
        &golden,
        &GateOptions {
            baseline: Some(&golden),
            ..GateOptions::default()
        },
    )
    .expect("gate should run");
    assert!(same.findings.is_empty(), "{:#?}", same.findings);

    let tmp = golden_copy("retype");
    edit(tmp.path(), "es/packs/cafe/pack.json", |doc| {
        doc["estimatedMinutes"] = json!("20");
    });
    let report = validate_store(
        &FsBlobStore::new(tmp.path()),
        &GateOptions {
            baseline: Some(&golden),
            ..GateOptions::default()
        },
    )
    .expect("gate should run");
    let codes = hard_codes(&report);
    assert!(codes.contains(&FindingCode::FieldRetyped), "{codes:?}");
    assert!(codes.contains(&FindingCode::FieldTypeMismatch), "{codes:?}");
    assert!(report.hard_findings().all(|f| f.path == "es/packs/cafe/pack.json"));
}

#[test]
fn review_snapshot_only_warns() {
    let review: ReviewSnapshot = serde_json::from_value(json!({
        "approved": ["es/saludos", "es/retired_pack"],
        "pending": ["es/cafe", "fr/boulangerie"]
    }))
    .expect("snapshot parses");
    let report = validate_store(
        &FsBlobStore::new(golden_dir()),
        &GateOptions {
            review: Some(review),
            ..GateOptions::default()
        },
    )
    .expect("gate should run");
    assert!(report.passed());
    let got: Vec<_> = report
        .warnings()
        .map(|f| (f.code, f.path.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            (FindingCode::StaleApproval, "es/"),
            (FindingCode::UnapprovedEntry, "es/packs/cafe/pack.json"),
            (FindingCode::UnapprovedEntry, "fr/packs/boulangerie/pack.json"),
        ]
    );
}
