use predicates::prelude::*;

fn import_images(temp: &tempfile::TempDir, title: &str) -> uuid::Uuid {
    let a = temp.path().join("cover.png");
    let b = temp.path().join("body.jpg");
    std::fs::write(&a, b"png-bytes").unwrap();
    std::fs::write(&b, b"jpg-bytes").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    let assert = cmd
        .current_dir(temp.path())
        .args([
            "import",
            "images",
            "--title",
            title,
            "--library",
            "lib",
            "cover.png",
            "body.jpg",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    stdout.trim().parse().expect("import prints the document id")
}

#[test]
fn import_list_export_delete_round_trip() {
    let temp = tempfile::TempDir::new().unwrap();
    let id = import_images(&temp, "summer album.pdf");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["library", "list", "--library", "lib"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.to_string()))
        .stdout(predicate::str::contains("summer album.pdf"))
        .stdout(predicate::str::contains("2 pages"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["export", "--id", &id.to_string(), "--library", "lib"])
        .assert()
        .success()
        .stdout("summer album.html\n");

    let html = std::fs::read_to_string(temp.path().join("summer album.html")).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    // Both pages, in import order, as data URLs.
    let first = html.find("data:image/png;base64,").unwrap();
    let second = html.find("data:image/jpeg;base64,").unwrap();
    assert!(first < second);
    assert!(html.contains("var TOTAL = 2;"));
    assert!(html.contains(&format!(
        "var noteKey = \"{}\";",
        flipfolio::export::note_namespace("summer album.pdf")
    )));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["library", "delete", "--id", &id.to_string(), "--library", "lib"])
        .assert()
        .success();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["library", "list", "--library", "lib"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn export_refuses_to_overwrite_without_force() {
    let temp = tempfile::TempDir::new().unwrap();
    let id = import_images(&temp, "report");
    std::fs::write(temp.path().join("report.html"), "keep me").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["export", "--id", &id.to_string(), "--library", "lib"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(
        std::fs::read_to_string(temp.path().join("report.html")).unwrap(),
        "keep me"
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["export", "--id", &id.to_string(), "--library", "lib", "--force"])
        .assert()
        .success();
}

#[test]
fn analyze_with_noop_engine_writes_the_fallback_summary() {
    let temp = tempfile::TempDir::new().unwrap();
    let id = import_images(&temp, "quarterly.pdf");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["analyze", "--id", &id.to_string(), "--library", "lib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source\": \"fallback\""))
        .stdout(predicate::str::contains("quarterly.pdf"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["library", "list", "--library", "lib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("quarterly.pdf"));
}

#[test]
fn import_images_requires_at_least_one_file() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["import", "images", "--title", "t", "--library", "lib"])
        .assert()
        .failure();
}

#[test]
fn unknown_document_ids_fail_cleanly() {
    let temp = tempfile::TempDir::new().unwrap();
    let ghost = uuid::Uuid::new_v4().to_string();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["export", "--id", &ghost, "--library", "lib"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no such document"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .args(["library", "delete", "--id", &ghost, "--library", "lib"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no such document"));
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flipfolio");
    cmd.current_dir(temp.path())
        .env("RUST_LOG", "debug")
        .args(["library", "list", "--library", "lib"])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
