mod common;

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

use common::write_image;

fn boxmark(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("boxmark").unwrap();
    cmd.arg("--project").arg(project).env("RUST_LOG", "off");
    cmd
}

/// An initialised project with one imported 100x80 image and a `cat` class.
fn project_with_image() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("proj");
    write_image(&dir.path().join("shots/a.png"), 100, 80);

    boxmark(&project).arg("init").assert().success();
    boxmark(&project)
        .arg("import")
        .arg(dir.path().join("shots"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 image(s)"));
    boxmark(&project)
        .args(["class", "add", "cat", "--color", "255,0,0"])
        .assert()
        .success();
    dir
}

fn add_box(project: &Path) -> String {
    let output = boxmark(project)
        .args([
            "annotate", "add", "images/shots/a.png", "--from", "10,10", "--to", "40,30",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[test]
fn runs() {
    let mut cmd = Command::cargo_bin("boxmark").unwrap();
    cmd.assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("boxmark").unwrap();
    cmd.arg("-V");
    cmd.assert()
        .success()
        .stdout(format!("boxmark {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn init_creates_layout() {
    let dir = tempfile::tempdir().unwrap();
    boxmark(dir.path()).arg("init").assert().success();
    assert!(dir.path().join("images").is_dir());
    assert!(dir.path().join("projectSettings.json").is_file());
}

#[test]
fn images_lists_annotation_counts() {
    let dir = project_with_image();
    let project = dir.path().join("proj");
    add_box(&project);

    boxmark(&project)
        .arg("images")
        .assert()
        .success()
        .stdout(predicate::str::contains("   1  images/shots/a.png"));
}

#[test]
fn annotate_add_clamps_and_persists() {
    let dir = project_with_image();
    let project = dir.path().join("proj");

    boxmark(&project)
        .args([
            "annotate", "add", "images/shots/a.png", "--from", "90,70", "--to", "20,30",
            "--scale", "2",
        ])
        .assert()
        .success();

    // (20,30)-(90,70) at scale 2 is (40,60) 140x80, clamped to 100x80.
    boxmark(&project)
        .args(["annotate", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cat  40,60 60x20"));

    let json = fs::read_to_string(project.join("annotations.json")).unwrap();
    assert!(json.contains("\"imagePath\": \"images/shots/a.png\""));
}

#[test]
fn annotate_add_rejects_unknown_class() {
    let dir = project_with_image();
    boxmark(&dir.path().join("proj"))
        .args([
            "annotate", "add", "images/shots/a.png", "--label", "dog", "--from", "0,0", "--to",
            "5,5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Class not found: dog"));
}

#[test]
fn annotate_resize_and_delete() {
    let dir = project_with_image();
    let project = dir.path().join("proj");
    let id = add_box(&project);

    boxmark(&project)
        .args([
            "annotate", "resize", "images/shots/a.png", &id, "--handle", "bottom-right", "--to",
            "60,50",
        ])
        .assert()
        .success();
    boxmark(&project)
        .args(["annotate", "list", "images/shots/a.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10,10 50x40"));

    boxmark(&project)
        .args(["annotate", "delete", "images/shots/a.png", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 'cat' annotation"));
    boxmark(&project)
        .args(["annotate", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn class_rename_relabels_annotations() {
    let dir = project_with_image();
    let project = dir.path().join("proj");
    add_box(&project);

    boxmark(&project)
        .args(["class", "rename", "cat", "kitten"])
        .assert()
        .success();
    boxmark(&project)
        .args(["annotate", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kitten"));
    boxmark(&project)
        .args(["class", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* kitten  (1.000, 0.000, 0.000)"));
}

#[test]
fn class_add_rejects_duplicates() {
    let dir = project_with_image();
    boxmark(&dir.path().join("proj"))
        .args(["class", "add", " cat "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn validate_clean_project_succeeds() {
    let dir = project_with_image();
    let project = dir.path().join("proj");
    add_box(&project);

    boxmark(&project)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation passed"));
}

#[test]
fn validate_orphaned_label_is_a_warning() {
    let dir = project_with_image();
    let project = dir.path().join("proj");
    add_box(&project);
    boxmark(&project)
        .args(["class", "remove", "cat"])
        .assert()
        .success();

    boxmark(&project)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("OrphanedLabel"));
    boxmark(&project)
        .args(["validate", "--strict"])
        .assert()
        .failure();
}

#[test]
fn validate_json_output_format() {
    let dir = project_with_image();
    let project = dir.path().join("proj");
    add_box(&project);
    fs::remove_file(project.join("images/shots/a.png")).unwrap();

    boxmark(&project)
        .args(["validate", "--output", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"error_count\": 1"))
        .stdout(predicate::str::contains("MissingImageFile"));
}

#[test]
fn export_writes_training_data() {
    let dir = project_with_image();
    let project = dir.path().join("proj");
    add_box(&project);

    boxmark(&project)
        .args(["export", "--rotate", "--seed", "3", "--workers", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Export done"))
        .stdout(predicate::str::contains("train: 4 written, 0 skipped"));

    let train = project.join("Training data/train");
    assert!(train.join("createml.json").is_file());
    let jpgs = fs::read_dir(&train)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "jpg"))
        .count();
    assert_eq!(jpgs, 4);
}

#[test]
fn export_rejects_bad_ratios() {
    let dir = project_with_image();
    boxmark(&dir.path().join("proj"))
        .args(["export", "--train", "50", "--test", "10", "--valid", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must sum to 100"));
}

#[test]
fn export_ratio_flags_go_together() {
    let dir = project_with_image();
    boxmark(&dir.path().join("proj"))
        .args(["export", "--train", "100"])
        .assert()
        .failure();
}
