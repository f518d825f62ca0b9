//! # Structured Logging
//!
//! Installs a JSON `tracing_subscriber` scoped to each test and checks the
//! log lines a registry emits: one `info` per applied mutation, one `warn`
//! carrying the error kind per rejection, and republished ledger events
//! under the `taxreg::events` target when `trace_events` is enabled.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use taxreg_core::Address;
use taxreg_service::{RegistryConfig, TaxRegistry};
use taxreg_state::{NewTaxItem, Role, TaxCategory};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    /// Captured output parsed as one JSON object per line.
    fn lines(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

/// Run `f` with a JSON subscriber writing into the returned capture.
fn capture_logs(filter: &str, f: impl FnOnce()) -> Capture {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    capture
}

fn addr(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    Address::from_bytes(bytes)
}

fn levy() -> NewTaxItem {
    NewTaxItem {
        name: "Excise".into(),
        description: "Excise on fuel".into(),
        category: TaxCategory::ExciseDuty,
        rate_bps: 1200,
    }
}

fn message(line: &serde_json::Value) -> &str {
    line["fields"]["message"].as_str().unwrap_or_default()
}

#[test]
fn rejected_mutation_logs_warning_with_kind() {
    let mut config = RegistryConfig::new(addr(1));
    config.trace_events = false;

    let logs = capture_logs("taxreg_service=info", || {
        let registry = TaxRegistry::new(config).unwrap();
        registry.create_tax_item(&addr(1), levy()).unwrap();
        let err = registry.create_tax_item(&addr(9), levy()).unwrap_err();
        assert_eq!(err.kind().as_str(), "authorization");
    })
    .lines();

    let applied: Vec<_> = logs
        .iter()
        .filter(|l| message(l) == "ledger mutation applied")
        .collect();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0]["level"], "INFO");
    assert_eq!(applied[0]["fields"]["op"], "create_tax_item");

    let rejected: Vec<_> = logs
        .iter()
        .filter(|l| message(l) == "ledger mutation rejected")
        .collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["level"], "WARN");
    assert_eq!(rejected[0]["fields"]["kind"], "authorization");
    assert_eq!(rejected[0]["fields"]["caller"], addr(9).to_string());
}

#[test]
fn events_republished_when_enabled() {
    let config = RegistryConfig::new(addr(1));
    assert!(config.trace_events);

    let logs = capture_logs("taxreg=info", || {
        let registry = TaxRegistry::new(config).unwrap();
        registry
            .grant_admin(&addr(1), Role::SubAdmin, addr(2))
            .unwrap();
        registry.create_tax_item(&addr(2), levy()).unwrap();
    })
    .lines();

    let events: Vec<_> = logs
        .iter()
        .filter(|l| l["target"] == "taxreg::events")
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["fields"]["kind"], "admin_added");
    assert_eq!(events[1]["fields"]["kind"], "tax_item_created");
    let payload: serde_json::Value =
        serde_json::from_str(events[1]["fields"]["payload"].as_str().unwrap()).unwrap();
    assert_eq!(payload["event"], "tax_item_created");
    assert_eq!(payload["id"], 1);
}

#[test]
fn events_not_republished_when_disabled() {
    let mut config = RegistryConfig::new(addr(1));
    config.trace_events = false;

    let logs = capture_logs("taxreg=info", || {
        let registry = TaxRegistry::new(config).unwrap();
        registry.create_tax_item(&addr(1), levy()).unwrap();
        assert_eq!(registry.journal().len(), 1);
    })
    .lines();

    assert!(logs.iter().all(|l| l["target"] != "taxreg::events"));
}
