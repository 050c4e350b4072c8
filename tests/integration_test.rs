use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use blackbox::api::ConfigApi;
use blackbox::archive::Archive;
use blackbox::config::Config;
use blackbox::diff::LineKind;
use blackbox::error::ErrorClass;
use blackbox::ledger::{Ledger, SqliteLedger};
use blackbox::scan::{FileOutcome, Scanner};
use tempfile::TempDir;

struct Env {
    _dir: TempDir,
    source: PathBuf,
    config: Config,
}

fn env() -> Env {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("configs");
    fs::create_dir_all(&source).unwrap();

    let config = Config {
        source_dir: source.clone(),
        archive_dir: dir.path().join("archived_configs"),
        database: dir.path().join("blackbox.db"),
        ..Config::default()
    };

    Env {
        _dir: dir,
        source,
        config,
    }
}

fn open(env: &Env) -> Arc<SqliteLedger> {
    Arc::new(SqliteLedger::open(&env.config.database, env.config.pool_size).unwrap())
}

#[test]
fn repeated_scans_record_one_version() {
    let env = env();
    fs::write(env.source.join("edge-01.config"), "hostname edge-01\n").unwrap();
    let ledger = open(&env);
    let scanner = Scanner::new(&env.config, ledger.clone());

    for _ in 0..5 {
        scanner.run_cycle().unwrap();
    }

    assert_eq!(ledger.list_devices().unwrap().len(), 1);
    assert_eq!(ledger.list_versions().unwrap().len(), 1);
}

#[test]
fn single_byte_change_records_exactly_one_new_version() {
    let env = env();
    let file = env.source.join("edge-01.config");
    fs::write(&file, "vlan 10\n").unwrap();
    let ledger = open(&env);
    let scanner = Scanner::new(&env.config, ledger.clone());

    scanner.run_cycle().unwrap();
    fs::write(&file, "vlan 11\n").unwrap();
    let report = scanner.run_cycle().unwrap();
    scanner.run_cycle().unwrap();

    assert_eq!(report.created(), 1);
    let versions = ledger.list_versions().unwrap();
    assert_eq!(versions.len(), 2);
    assert_ne!(versions[0].file_hash, versions[1].file_hash);
}

#[test]
fn files_without_the_suffix_are_ignored() {
    let env = env();
    fs::write(env.source.join("edge-01.config"), "a").unwrap();
    fs::write(env.source.join("notes.txt"), "b").unwrap();
    fs::create_dir_all(env.source.join("nested")).unwrap();
    fs::write(env.source.join("nested").join("deep.config"), "c").unwrap();

    let scanner = Scanner::new(&env.config, open(&env));
    let report = scanner.run_cycle().unwrap();

    assert_eq!(report.discovered, 1);
}

#[test]
fn archived_file_is_content_addressed() {
    let env = env();
    let body = "hostname edge-01\ninterface Gi0/1\n";
    fs::write(env.source.join("edge-01.config"), body).unwrap();
    let scanner = Scanner::new(&env.config, open(&env));

    let report = scanner.run_cycle().unwrap();

    let FileOutcome::Created { file_path, hash, .. } = &report.files[0].outcome else {
        panic!("expected a new version, got {:?}", report.files[0].outcome);
    };
    assert!(file_path.ends_with(&format!("{hash}.txt")));
    assert_eq!(hash, &blackbox::hash::digest(body.as_bytes()));

    let on_disk = env.config.archive_dir.join(file_path);
    assert_eq!(fs::read_to_string(on_disk).unwrap(), body);
}

#[test]
fn ledger_survives_reopen() {
    let env = env();
    fs::write(env.source.join("edge-01.config"), "a").unwrap();
    Scanner::new(&env.config, open(&env)).run_cycle().unwrap();

    let reopened = open(&env);
    let report = Scanner::new(&env.config, reopened.clone()).run_cycle().unwrap();

    assert_eq!(report.unchanged(), 1);
    assert_eq!(reopened.list_versions().unwrap().len(), 1);
}

#[test]
fn api_diff_end_to_end() {
    let env = env();
    let file = env.source.join("edge-01.config");
    fs::write(&file, "hostname edge-01\nvlan 10\nend").unwrap();
    let ledger = open(&env);
    let scanner = Scanner::new(&env.config, ledger.clone());
    scanner.run_cycle().unwrap();

    fs::write(&file, "hostname edge-01\nvlan 20\nend").unwrap();
    scanner.run_cycle().unwrap();

    let versions = ledger.list_versions().unwrap();
    let (newer, older) = (versions[0].id, versions[1].id);

    let api = ConfigApi::new(ledger, Archive::new(&env.config.archive_dir));
    let report = api.version_diff(&older.to_string(), &newer.to_string()).unwrap();

    let kinds: Vec<_> = report.lines.iter().map(|l| (l.kind, l.content.as_str())).collect();
    assert_eq!(
        kinds,
        vec![
            (LineKind::Unchanged, "hostname edge-01"),
            (LineKind::Removed, "vlan 10"),
            (LineKind::Added, "vlan 20"),
            (LineKind::Unchanged, "end"),
        ]
    );
    assert_eq!(api.version_content(&newer.to_string()).unwrap(), "hostname edge-01\nvlan 20\nend");
}

#[test]
fn bad_ids_fail_before_the_store_is_queried() {
    struct Untouchable;

    impl Ledger for Untouchable {
        fn get_or_create_device(&self, _: &str) -> blackbox::Result<blackbox::ledger::Device> {
            panic!("ledger queried")
        }
        fn latest_version(&self, _: i64) -> blackbox::Result<Option<blackbox::ledger::ConfigVersion>> {
            panic!("ledger queried")
        }
        fn last_recorded_version(&self, _: i64) -> blackbox::Result<Option<blackbox::ledger::ConfigVersion>> {
            panic!("ledger queried")
        }
        fn insert_version(
            &self,
            _: i64,
            _: chrono::DateTime<chrono::Utc>,
            _: &str,
            _: &str,
        ) -> blackbox::Result<blackbox::ledger::ConfigVersion> {
            panic!("ledger queried")
        }
        fn list_devices(&self) -> blackbox::Result<Vec<blackbox::ledger::Device>> {
            panic!("ledger queried")
        }
        fn device(&self, _: i64) -> blackbox::Result<Option<blackbox::ledger::Device>> {
            panic!("ledger queried")
        }
        fn list_versions(&self) -> blackbox::Result<Vec<blackbox::ledger::VersionSummary>> {
            panic!("ledger queried")
        }
        fn device_versions(&self, _: i64) -> blackbox::Result<Vec<blackbox::ledger::VersionSummary>> {
            panic!("ledger queried")
        }
        fn version(&self, _: i64) -> blackbox::Result<Option<blackbox::ledger::ConfigVersion>> {
            panic!("ledger queried")
        }
        fn ping(&self) -> blackbox::Result<()> {
            panic!("ledger queried")
        }
    }

    let dir = TempDir::new().unwrap();
    let api = ConfigApi::new(Arc::new(Untouchable), Archive::new(dir.path()));

    assert_eq!(api.device("r1").unwrap_err().class(), ErrorClass::Validation);
    assert_eq!(api.device_versions("").unwrap_err().class(), ErrorClass::Validation);
    assert_eq!(api.version_content("1e3").unwrap_err().class(), ErrorClass::Validation);
    assert_eq!(api.version_diff("abc", "1").unwrap_err().class(), ErrorClass::Validation);
    assert_eq!(api.version_diff("1", "abc").unwrap_err().class(), ErrorClass::Validation);
}
