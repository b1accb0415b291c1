// SPDX-License-Identifier: Apache-2.0

use chrono::{NaiveDate, TimeZone, Utc};
use timebank_model::{
    Client, ClientId, ClientName, EmailAddress, Hours, Timebank, TimebankId, TimebankName,
    TimebankStatus,
};

#[test]
fn client_rejects_unknown_fields() {
    let raw = r#"{
      "id":"0191e8a0-0000-7000-8000-000000000001",
      "name":"Acme",
      "contact_email":"ops@acme.example",
      "warn_threshold_pct":20,
      "notify_on_entry":false,
      "active":true,
      "created_at":"2026-01-01T00:00:00Z",
      "extra":"nope"
    }"#;
    assert!(serde_json::from_str::<Client>(raw).is_err());
}

#[test]
fn timebank_round_trips_with_string_hours() {
    let bank = Timebank {
        id: TimebankId::new(),
        client_id: ClientId::new(),
        name: TimebankName::parse("Retainer Q1").expect("name"),
        purchased_hours: Hours::parse("40").expect("purchased"),
        used_hours: Hours::parse("12.25").expect("used"),
        remaining_hours: Hours::parse("27.75").expect("remaining"),
        status: TimebankStatus::Active,
        purchased_at: NaiveDate::from_ymd_opt(2026, 1, 1).expect("date"),
        created_at: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).single().expect("ts"),
    };
    assert!(bank.balanced());

    let json = serde_json::to_string(&bank).expect("serialize");
    assert!(json.contains("\"purchased_hours\":\"40.00\""));
    assert!(json.contains("\"status\":\"active\""));

    let back: Timebank = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, bank);
}

#[test]
fn email_serializes_transparently() {
    let email = EmailAddress::parse("pat@example.com").expect("email");
    assert_eq!(
        serde_json::to_string(&email).expect("serialize"),
        "\"pat@example.com\""
    );
}

#[test]
fn client_name_is_transparent_string() {
    let name: ClientName = serde_json::from_str("\"Acme Industries\"").expect("deserialize");
    assert_eq!(name.as_str(), "Acme Industries");
}
