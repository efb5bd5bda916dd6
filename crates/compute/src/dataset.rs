//! Loading record arrays from JSON exports.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use studio_core::config::DataConfig;
use studio_core::{
    CancellationRecord, ClientRecord, DomainRecord, LeadRecord, PayrollRecord, Result, SaleRecord,
    SessionRecord, StudioError,
};

/// Every record set a report can draw from, one `Vec` per variant.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub sales: Vec<SaleRecord>,
    pub sessions: Vec<SessionRecord>,
    pub leads: Vec<LeadRecord>,
    pub clients: Vec<ClientRecord>,
    pub cancellations: Vec<CancellationRecord>,
    pub payroll: Vec<PayrollRecord>,
}

impl Dataset {
    /// Load each configured file from `dir`. Missing files load as empty.
    pub fn load_dir(dir: &Path, cfg: &DataConfig) -> Result<Self> {
        let ds = Self {
            sales: load_records(&dir.join(&cfg.sales_file))?,
            sessions: load_records(&dir.join(&cfg.sessions_file))?,
            leads: load_records(&dir.join(&cfg.leads_file))?,
            clients: load_records(&dir.join(&cfg.clients_file))?,
            cancellations: load_records(&dir.join(&cfg.cancellations_file))?,
            payroll: load_records(&dir.join(&cfg.payroll_file))?,
        };
        info!(
            dir = %dir.display(),
            sales = ds.sales.len(),
            sessions = ds.sessions.len(),
            leads = ds.leads.len(),
            clients = ds.clients.len(),
            cancellations = ds.cancellations.len(),
            payroll = ds.payroll.len(),
            "dataset loaded"
        );
        Ok(ds)
    }

    /// Load a single file of `kind`-tagged records of mixed variants.
    pub fn load_tagged(path: &Path) -> Result<Self> {
        let records: Vec<DomainRecord> = load_records(path)?;
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: impl IntoIterator<Item = DomainRecord>) -> Self {
        let mut ds = Self::default();
        for r in records {
            match r {
                DomainRecord::Sale(s) => ds.sales.push(s),
                DomainRecord::Session(s) => ds.sessions.push(s),
                DomainRecord::Lead(l) => ds.leads.push(l),
                DomainRecord::Client(c) => ds.clients.push(c),
                DomainRecord::Cancellation(c) => ds.cancellations.push(c),
                DomainRecord::Payroll(p) => ds.payroll.push(p),
            }
        }
        ds
    }

    pub fn len(&self) -> usize {
        self.sales.len()
            + self.sessions.len()
            + self.leads.len()
            + self.clients.len()
            + self.cancellations.len()
            + self.payroll.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read a JSON array of records.
///
/// A missing file is an empty set. A top level that is not an array is a
/// data contract violation and an error, as is a record that does not
/// decode.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        warn!(path = %path.display(), "data file not found, treating as empty");
        return Ok(Vec::new());
    }

    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| StudioError::Serialize(format!("{}: {e}", path.display())))?;

    let serde_json::Value::Array(items) = value else {
        return Err(StudioError::InvalidInput(format!(
            "{} must contain a JSON array of records",
            path.display()
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| StudioError::Serialize(format!("{} record {i}: {e}", path.display())))
        })
        .collect()
}
