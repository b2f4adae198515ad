use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::iter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use eyre::{Result, eyre};
use tracing::{error, info, warn};

use super::lead::{LeadRecord, extract_lead};

pub const LEAD_COLUMNS: [&str; 6] = [
    "Data/Hora",
    "Nome",
    "Cidade",
    "Valor da Conta",
    "Painel Solar",
    "Telefone",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadOutcome {
    Saved,
    NoData,
    Failed,
}

/// Append-only CSV table of qualified leads.
///
/// The header row is written when the file does not exist yet. Failures are
/// logged and the lead is dropped; nothing here propagates an error to the
/// chat request.
#[derive(Debug, Clone)]
pub struct LeadStore {
    path: PathBuf,
}

impl LeadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, response: &str) -> LeadOutcome {
        self.save_at(response, Local::now())
    }

    pub fn save_at(&self, response: &str, recorded_at: DateTime<Local>) -> LeadOutcome {
        let lead = extract_lead(response);
        if lead.is_empty() {
            warn!("Could not extract lead data from model response");
            return LeadOutcome::NoData;
        }

        match self.append(&lead, recorded_at) {
            Ok(()) => {
                info!("Lead saved to {}", self.path.display());
                LeadOutcome::Saved
            }
            Err(e) => {
                error!("Failed to save lead: {}", e);
                LeadOutcome::Failed
            }
        }
    }

    fn append(&self, lead: &LeadRecord, recorded_at: DateTime<Local>) -> Result<()> {
        let path = self.path.as_path();
        let file_exists = path.is_file();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| eyre!("Failed to create directory {}: {}", parent.display(), e))?;
            }
        }

        let mut rows = String::new();
        if !file_exists {
            rows.push_str(&csv_row(LEAD_COLUMNS));
        }
        let timestamp = recorded_at.format(TIMESTAMP_FORMAT).to_string();
        rows.push_str(&csv_row(iter::once(timestamp.as_str()).chain(lead.values())));

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eyre!("Failed to open lead table {}: {}", path.display(), e))?;

        file.write_all(rows.as_bytes())
            .map_err(|e| eyre!("Failed to append to lead table {}: {}", path.display(), e))?;

        Ok(())
    }
}

fn csv_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut row = fields
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",");
    row.push_str("\r\n");
    row
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
