use std::path::Path;

use collector::WindowedCollector;
use mixin_source::{HttpSource, SourceConfig};

use super::auth;
use crate::config::{Credential, Effective};
use crate::error::ReportError;
use crate::render::{render_ids, render_report};

// ═══════════════════════════════════════════════════════════════
//  Main dispatch
// ═══════════════════════════════════════════════════════════════

pub async fn run(eff: &Effective) -> Result<(), ReportError> {
    let token = match &eff.credential {
        Credential::Token(token) => token.clone(),
        Credential::Client { id, secret } => auth::obtain_token(eff, id, secret).await?,
    };

    let mut source_cfg = SourceConfig::new(token).with_base_url(eff.api_base.as_str());
    source_cfg.timeout = eff.timeout;
    let source = HttpSource::new(source_cfg)?;

    let collector = WindowedCollector::new(source).with_dedup(eff.dedup);

    tracing::info!(
        asset = %eff.query.asset_id,
        opponent = %eff.query.counterparty_id,
        start = ?eff.query.start_time,
        end = ?eff.query.end_time,
        "collecting snapshots"
    );
    let records = collector.collect(&eff.query).await?;

    if records.is_empty() {
        tracing::info!("no records");
        return Ok(());
    }

    let report = render_report(&records, &eff.layout);
    match &eff.output {
        Some(path) => {
            write_file(path, &report)?;
            tracing::info!(path = %path.display(), records = records.len(), "report written");
        }
        None => print!("{report}"),
    }

    if let Some(path) = &eff.ids_output {
        write_file(path, &render_ids(&records))?;
        tracing::info!(path = %path.display(), "ids written");
    }

    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<(), ReportError> {
    std::fs::write(path, content).map_err(|source| ReportError::Write {
        path: path.display().to_string(),
        source,
    })
}
