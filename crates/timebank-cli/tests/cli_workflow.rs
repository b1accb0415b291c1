// SPDX-License-Identifier: Apache-2.0

use assert_cmd::Command;
use chrono::Utc;
use std::path::Path;
use timebank_core::password::hash_password;
use timebank_model::{ClientId, EmailAddress, PersonName, ProjectName, Role};
use timebank_store::{NewUser, Store};

fn timebank(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("timebank").expect("binary builds");
    cmd.arg("--db").arg(db);
    cmd
}

fn stdout_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stdout is json")
}

#[test]
fn init_is_idempotent_and_doctor_sees_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("timebank.db");

    timebank(&db).arg("init").assert().success();
    timebank(&db).arg("init").assert().success();

    let assert = timebank(&db).args(["doctor", "--json"]).assert().success();
    let report = stdout_json(&assert.get_output().stdout);
    assert_eq!(report["db_exists"], serde_json::json!(true));
    assert!(report["schema_version"].as_i64().unwrap_or(0) >= 1);
}

#[test]
fn commands_refuse_to_run_without_a_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("missing.db");

    timebank(&db)
        .args(["client", "list"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn bootstrapping_a_second_admin_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("timebank.db");
    timebank(&db).arg("init").assert().success();

    timebank(&db)
        .args([
            "admin",
            "create",
            "--email",
            "root@ops.example",
            "--name",
            "Root Operator",
            "--password",
            "hunter22",
            "--iterations",
            "1000",
        ])
        .assert()
        .success();

    let assert = timebank(&db)
        .args([
            "admin",
            "create",
            "--email",
            "second@ops.example",
            "--name",
            "Second Operator",
            "--password",
            "hunter22",
            "--iterations",
            "1000",
            "--json",
        ])
        .assert()
        .failure()
        .code(3);
    let envelope: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stderr).expect("stderr is a json envelope");
    assert_eq!(envelope["code"], serde_json::json!("validation_error"));
}

#[test]
fn log_and_statement_round_out_the_billing_flow() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("timebank.db");
    timebank(&db).arg("init").assert().success();
    timebank(&db)
        .args([
            "admin",
            "create",
            "--email",
            "root@ops.example",
            "--name",
            "Root Operator",
            "--password",
            "hunter22",
            "--iterations",
            "1000",
        ])
        .assert()
        .success();

    let assert = timebank(&db)
        .args([
            "client",
            "add",
            "--name",
            "Acme",
            "--contact",
            "ops@acme.example",
            "--json",
        ])
        .assert()
        .success();
    let created = stdout_json(&assert.get_output().stdout);
    let client_id = created["client"]["id"].as_str().expect("client id").to_string();

    timebank(&db)
        .args([
            "bank", "add", "--client", &client_id, "--name", "Retainer Q3", "--hours", "2.00",
        ])
        .assert()
        .success();

    // The CLI manages billing objects; projects and members arrive via the
    // API, so seed them straight through the store.
    let (project_id, member_email) = {
        let store = Store::open(&db).expect("open seeded db");
        let now = Utc::now();
        let client = ClientId::parse(&client_id).expect("client id parses");
        let project = store
            .create_project(&client, &ProjectName::parse("Website").expect("name"), now)
            .expect("create project");
        let member = store
            .create_user(
                &NewUser {
                    email: EmailAddress::parse("dev@acme.example").expect("email"),
                    name: PersonName::parse("Dev Person").expect("name"),
                    role: Role::Member,
                    client_id: Some(client),
                    password_hash: hash_password("hunter22", 1_000).expect("hash"),
                },
                now,
            )
            .expect("create member");
        (project.id.to_string(), member.email.to_string())
    };

    timebank(&db)
        .args([
            "log",
            "--project",
            &project_id,
            "--user",
            &member_email,
            "--hours",
            "3.5",
            "--date",
            "2026-08-12",
            "--note",
            "sprint work",
        ])
        .assert()
        .success();

    let assert = timebank(&db)
        .args(["statement", "--client", &client_id])
        .assert()
        .success();
    let csv = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 csv");
    let last = csv.lines().last().expect("csv has rows");
    assert_eq!(last, "total,,,,3.50,");
    assert!(csv.contains("2026-08-12,Website,Dev Person,Retainer Q3,3.50,sprint work"));

    // 3.5 against a 2.00 pool overdraws the terminal bank. The overdraw
    // notice was already queued when the entry was logged, so the sweep's
    // re-scan dedupes to a no-op.
    let assert = timebank(&db).args(["sweep", "--json"]).assert().success();
    let report = stdout_json(&assert.get_output().stdout);
    assert_eq!(report["depletion_warnings_queued"], serde_json::json!(0));
}

#[test]
fn invite_prints_the_token_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("timebank.db");
    timebank(&db).arg("init").assert().success();
    timebank(&db)
        .args([
            "admin",
            "create",
            "--email",
            "root@ops.example",
            "--name",
            "Root Operator",
            "--password",
            "hunter22",
            "--iterations",
            "1000",
        ])
        .assert()
        .success();

    let assert = timebank(&db)
        .args([
            "invite",
            "--email",
            "new-admin@ops.example",
            "--role",
            "admin",
            "--json",
        ])
        .assert()
        .success();
    let payload = stdout_json(&assert.get_output().stdout);
    assert!(payload["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(payload["invitation"]["status"], serde_json::json!("pending"));
    assert!(payload["invitation"]["token_hash"].is_null());
}
