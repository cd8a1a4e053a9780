//! MassIVE datasets (`MSV...`)

use serde_json::Value;

use super::{
    build_url, file_name_of, format_rank, FetchDescriptor, LookupError, ProviderStrategy,
    ResolveContext, ResolveOptions,
};
use crate::usi::Usi;

/// Looks up the files behind an identifier with MassIVE's spectrum query
pub struct MassiveDataset;

impl ProviderStrategy for MassiveDataset {
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        usi: &Usi,
        options: &ResolveOptions,
    ) -> Result<FetchDescriptor, LookupError> {
        match lookup(ctx, usi) {
            Ok(descriptor) => Ok(descriptor),
            Err(err) if options.force_best_effort => {
                log::warn!("MassIVE lookup for {usi} failed ({err}); building best-effort location");
                best_effort(ctx, usi, &usi.collection)
            }
            Err(err) => Err(err),
        }
    }
}

/// Ask MassIVE which files back the identifier and pick the best format
pub(crate) fn lookup(ctx: &ResolveContext<'_>, usi: &Usi) -> Result<FetchDescriptor, LookupError> {
    let query = format!("{}:{}:{}", usi.scheme, usi.collection, usi.path);
    let url = build_url(
        &ctx.endpoints.massive,
        &["ProteoSAFe", "QuerySpectrum"],
        &[("id", query.as_str())],
    )?;
    let body = ctx.client.get_json(&url)?;

    let rows = body
        .get("row_data")
        .and_then(Value::as_array)
        .ok_or_else(|| LookupError::Schema {
            url: url.to_string(),
            field: "row_data".to_string(),
        })?;

    let best = rows
        .iter()
        .filter_map(|row| row.get("file_descriptor").and_then(Value::as_str))
        .filter_map(|path| format_rank(path).map(|rank| (rank, path)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, path)| path)
        .ok_or_else(|| LookupError::NotListed {
            url: url.to_string(),
            wanted: usi.path.clone(),
        })?;

    download_descriptor(ctx, usi, best)
}

/// Location built from a dataset accession and in-dataset path without asking
pub(crate) fn best_effort(
    ctx: &ResolveContext<'_>,
    usi: &Usi,
    dataset: &str,
) -> Result<FetchDescriptor, LookupError> {
    download_descriptor(ctx, usi, &format!("{dataset}/{}", usi.path))
}

/// Download URL for a MassIVE file descriptor (`f.MSV.../path` or `MSV.../path`)
pub(crate) fn download_descriptor(
    ctx: &ResolveContext<'_>,
    usi: &Usi,
    file_descriptor: &str,
) -> Result<FetchDescriptor, LookupError> {
    let path = file_descriptor.trim().trim_end_matches(';');
    let path = path.strip_prefix("f.").unwrap_or(path);
    let file = format!("f.{path}");
    let url = build_url(
        &ctx.endpoints.massive,
        &["ProteoSAFe", "DownloadResultFile"],
        &[("file", file.as_str()), ("forceDownload", "true")],
    )?;
    Ok(FetchDescriptor {
        remote_uri: url.to_string(),
        provider_kind: usi.kind,
        source_name: file_name_of(path).to_string(),
    })
}
