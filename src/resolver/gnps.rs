//! GNPS task outputs (`mzspec:GNPS:TASK-<task>-<path>`)
//!
//! Task and quickstart references carry everything needed in the identifier
//! itself. The library provenance form (`GNPS-LIBRARY:accession:<ID>`) needs one
//! lookup to find the task and file the library spectrum was taken from.

use serde_json::Value;

use super::{
    build_url, file_name_of, massive, FetchDescriptor, LookupError, ProviderStrategy,
    ResolveContext, ResolveOptions,
};
use crate::usi::Usi;

const TASK_PREFIX: &str = "TASK-";
const QUICKSTART_PREFIX: &str = "QUICKSTART-";

/// Resolves GNPS task, quickstart and library references
pub struct GnpsTask;

impl ProviderStrategy for GnpsTask {
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        usi: &Usi,
        _options: &ResolveOptions,
    ) -> Result<FetchDescriptor, LookupError> {
        if let Some(accession) = usi.library_accession.as_deref() {
            return library_provenance(ctx, usi, accession);
        }
        if let Some(rest) = usi.path.strip_prefix(TASK_PREFIX) {
            let (task, file) = split_reference(rest, &usi.path)?;
            return task_file(ctx, usi, task, file);
        }
        if let Some(rest) = usi.path.strip_prefix(QUICKSTART_PREFIX) {
            let (session, file) = split_reference(rest, &usi.path)?;
            let url = build_url(
                &ctx.endpoints.gnps_quickstart,
                &["conversion", "file"],
                &[("sessionid", session), ("filename", file)],
            )?;
            return Ok(FetchDescriptor {
                remote_uri: url.to_string(),
                provider_kind: usi.kind,
                source_name: file_name_of(file).to_string(),
            });
        }
        Err(LookupError::Invalid(format!(
            "GNPS path '{}' is neither a task, quickstart nor library reference",
            usi.path
        )))
    }
}

/// Split `<id>-<relative path>` at the first dash
fn split_reference<'a>(rest: &'a str, path: &str) -> Result<(&'a str, &'a str), LookupError> {
    match rest.split_once('-') {
        Some((id, file)) if !id.is_empty() && !file.is_empty() => Ok((id, file)),
        _ => Err(LookupError::Invalid(format!(
            "GNPS reference '{path}' has no '<id>-<file>' part"
        ))),
    }
}

fn task_file(
    ctx: &ResolveContext<'_>,
    usi: &Usi,
    task: &str,
    file: &str,
) -> Result<FetchDescriptor, LookupError> {
    let url = build_url(
        &ctx.endpoints.gnps,
        &["ProteoSAFe", "DownloadResultFile"],
        &[("task", task), ("file", file), ("block", "main")],
    )?;
    Ok(FetchDescriptor {
        remote_uri: url.to_string(),
        provider_kind: usi.kind,
        source_name: file_name_of(file).to_string(),
    })
}

fn library_provenance(
    ctx: &ResolveContext<'_>,
    usi: &Usi,
    accession: &str,
) -> Result<FetchDescriptor, LookupError> {
    let url = build_url(
        &ctx.endpoints.gnps,
        &["ProteoSAFe", "SpectrumCommentServlet"],
        &[("SpectrumID", accession)],
    )?;
    let body = ctx.client.get_json(&url)?;
    let info = body.get("spectruminfo").ok_or_else(|| LookupError::Schema {
        url: url.to_string(),
        field: "spectruminfo".to_string(),
    })?;
    let field = |name: &str| -> Result<String, LookupError> {
        info.get(name)
            .and_then(Value::as_str)
            .map(|s| s.trim().trim_end_matches(';').to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LookupError::Schema {
                url: url.to_string(),
                field: format!("spectruminfo.{name}"),
            })
    };

    let source_file = field("source_file")?;
    let source_file = source_file
        .strip_prefix("f.")
        .unwrap_or(&source_file)
        .to_string();
    log::debug!("{accession} was taken from {source_file}");

    // Library spectra deposited from a dataset point back into MassIVE
    if source_file.starts_with("MSV") {
        return massive::download_descriptor(ctx, usi, &source_file);
    }
    let task = field("task")?;
    task_file(ctx, usi, &task, &source_file)
}
