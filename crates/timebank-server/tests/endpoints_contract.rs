// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EndpointsContract {
    endpoints: Vec<EndpointEntry>,
}

#[derive(Debug, Deserialize)]
struct EndpointEntry {
    method: String,
    path: String,
    auth: String,
}

const KNOWN_METHODS: &[&str] = &["GET", "POST", "PATCH", "DELETE"];
const AUTH_CLASSES: &[&str] = &["public", "session", "admin"];

#[test]
fn server_routes_match_endpoints_contract() {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf();

    let contract_path = root.join("docs/contracts/ENDPOINTS.json");
    let contract: EndpointsContract =
        serde_json::from_slice(&std::fs::read(contract_path).expect("read endpoints contract"))
            .expect("parse endpoints contract");

    let server_src =
        std::fs::read_to_string(root.join("crates/timebank-server/src/lib.rs"))
            .expect("read server routing source");

    let mut route_set = std::collections::BTreeSet::new();
    let param_re = regex::Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("param regex");
    for cap in regex::Regex::new(r#"\.route\(\s*"([^"]+)""#)
        .expect("regex")
        .captures_iter(&server_src)
    {
        let mut path = cap[1].to_string();
        path = param_re.replace_all(&path, "{$1}").to_string();
        route_set.insert(path);
    }

    let mut contract_set = std::collections::BTreeSet::new();
    for ep in &contract.endpoints {
        assert!(
            KNOWN_METHODS.contains(&ep.method.as_str()),
            "unknown method {} for {}",
            ep.method,
            ep.path
        );
        assert!(
            AUTH_CLASSES.contains(&ep.auth.as_str()),
            "unknown auth class {} for {} {}",
            ep.auth,
            ep.method,
            ep.path
        );
        contract_set.insert(ep.path.clone());
    }

    assert_eq!(route_set, contract_set, "server route registry drift");
}

#[test]
fn contract_has_no_duplicate_method_path_pairs() {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf();
    let contract: EndpointsContract = serde_json::from_slice(
        &std::fs::read(root.join("docs/contracts/ENDPOINTS.json")).expect("read contract"),
    )
    .expect("parse contract");

    let mut seen = std::collections::BTreeSet::new();
    for ep in &contract.endpoints {
        assert!(
            seen.insert((ep.method.clone(), ep.path.clone())),
            "duplicate contract entry {} {}",
            ep.method,
            ep.path
        );
    }
}
