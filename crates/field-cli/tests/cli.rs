use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::{Value, json};

fn formfield() -> Command {
    Command::cargo_bin("formfield").unwrap()
}

fn household() -> Value {
    json!({
        "id": "doc-1",
        "questions": [
            {
                "slug": "has-pets",
                "type": "Choice",
                "isRequired": true,
                "choiceOptions": [{ "slug": "yes" }, { "slug": "no" }]
            },
            {
                "slug": "pet-count",
                "type": "Integer",
                "integerMinValue": 1,
                "integerMaxValue": 10,
                "isHidden": { "op": "not", "expression": { "op": "eq", "path": "/answers/has-pets", "value": "yes" } },
                "isRequired": { "op": "eq", "path": "/answers/has-pets", "value": "yes" }
            },
            { "slug": "nickname", "label": "Nickname", "type": "Text", "textMaxLength": 5 }
        ],
        "answers": [{ "question": "has-pets", "value": "no" }]
    })
}

fn write_document(dir: &assert_fs::TempDir) -> assert_fs::fixture::ChildPath {
    let document = dir.child("household.json");
    document.write_str(&household().to_string()).unwrap();
    document
}

#[test]
fn inspect_lists_fields_and_state() {
    let dir = assert_fs::TempDir::new().unwrap();
    let document = write_document(&dir);

    formfield()
        .current_dir(dir.path())
        .arg("inspect")
        .arg("--document")
        .arg(document.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Document doc-1"))
        .stdout(predicate::str::contains("pet-count"))
        .stdout(predicate::str::contains("hidden"))
        .stdout(predicate::str::contains("2 of 3 questions visible"));
}

#[test]
fn inspect_json_reports_derived_state() {
    let dir = assert_fs::TempDir::new().unwrap();
    let document = write_document(&dir);

    let output = formfield()
        .current_dir(dir.path())
        .args(["inspect", "--json", "--document"])
        .arg(document.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    let pet_count = rows
        .iter()
        .find(|row| row["slug"] == "pet-count")
        .unwrap();
    assert_eq!(pet_count["hidden"], json!(true));
    assert_eq!(pet_count["optional"], json!(true));
    assert_eq!(pet_count["id"], json!("Document:doc-1:Question:pet-count"));
    let nickname = rows
        .iter()
        .find(|row| row["slug"] == "nickname")
        .unwrap();
    assert_eq!(nickname["label"], json!("Nickname"));
}

#[test]
fn validate_reports_messages_and_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    let document = write_document(&dir);

    formfield()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--document")
        .arg(document.path())
        .args(["--set", "has-pets=yes", "--set", "nickname=Fluffy"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Validation result: invalid"))
        .stdout(predicate::str::contains(
            "pet-count - This field can't be blank",
        ))
        .stdout(predicate::str::contains(
            "nickname - Must be at most 5 characters",
        ));
}

#[test]
fn validate_passes_with_complete_answers() {
    let dir = assert_fs::TempDir::new().unwrap();
    let document = write_document(&dir);

    formfield()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--document")
        .arg(document.path())
        .args(["--set", "has-pets=yes", "--set", "pet-count=3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation result: valid"));
}

#[test]
fn config_selects_locale_and_overrides() {
    let dir = assert_fs::TempDir::new().unwrap();
    let document = write_document(&dir);
    dir.child("formfield.toml")
        .write_str(
            r#"
locale = "de"

[messages]
"form.validation.lessThanOrEqualTo" = "höchstens {{this.lte}}"
"#,
        )
        .unwrap();

    formfield()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--document")
        .arg(document.path())
        .args(["--set", "has-pets=yes", "--set", "pet-count=15"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("pet-count - höchstens 10"));
}

#[test]
fn fill_saves_answers_and_writes_snapshot() {
    let dir = assert_fs::TempDir::new().unwrap();
    let document = write_document(&dir);
    let out = dir.child("answers.json");

    formfield()
        .current_dir(dir.path())
        .arg("fill")
        .arg("--document")
        .arg(document.path())
        .args(["--set", "has-pets=yes", "--set", "pet-count=4", "--set", "nickname=12"])
        .arg("--out")
        .arg(out.path())
        .assert()
        .success();

    out.assert(predicate::path::exists());
    let snapshot: Value = serde_json::from_str(&std::fs::read_to_string(out.path()).unwrap()).unwrap();
    assert_eq!(snapshot["document"], json!("doc-1"));
    assert_eq!(snapshot["answers"]["has-pets"]["value"], json!("yes"));
    assert_eq!(snapshot["answers"]["pet-count"]["value"], json!(4));
    assert_eq!(snapshot["answers"]["pet-count"]["hidden"], json!(false));
    assert_eq!(snapshot["answers"]["nickname"]["value"], json!("12"));
    assert!(snapshot["answers"]["has-pets"]["id"].is_string());
}

#[test]
fn fill_rejects_invalid_answers() {
    let dir = assert_fs::TempDir::new().unwrap();
    let document = write_document(&dir);

    formfield()
        .current_dir(dir.path())
        .arg("fill")
        .arg("--document")
        .arg(document.path())
        .args(["--set", "nickname=far too long"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nickname"));
}

#[test]
fn unknown_questions_are_reported() {
    let dir = assert_fs::TempDir::new().unwrap();
    let document = write_document(&dir);

    formfield()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--document")
        .arg(document.path())
        .args(["--set", "colour=red"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown question 'colour'"));
}

#[test]
fn cbor_output_requires_a_file() {
    let dir = assert_fs::TempDir::new().unwrap();
    let document = write_document(&dir);

    formfield()
        .current_dir(dir.path())
        .arg("fill")
        .arg("--document")
        .arg(document.path())
        .arg("--cbor")
        .assert()
        .failure();
}
