//! Metabolomics Workbench studies (`ST...`)
//!
//! The study file list is served as a tab-separated table. Many Workbench
//! studies are mirrored on MassIVE, which is tried when the list does not
//! name the file.

use super::{
    build_url, file_name_of, massive, names_file, FetchDescriptor, LookupError,
    ProviderStrategy, ResolveContext, ResolveOptions,
};
use crate::usi::Usi;

/// Reads the study's file table, falling back to the MassIVE mirror
pub struct WorkbenchStudy;

impl ProviderStrategy for WorkbenchStudy {
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        usi: &Usi,
        options: &ResolveOptions,
    ) -> Result<FetchDescriptor, LookupError> {
        match study_file(ctx, usi) {
            Ok(descriptor) => Ok(descriptor),
            Err(err) => {
                log::info!("Workbench lookup for {usi} failed ({err}); trying MassIVE");
                match massive::lookup(ctx, usi) {
                    Ok(descriptor) => Ok(descriptor),
                    Err(_) if options.force_best_effort => {
                        massive::best_effort(ctx, usi, &usi.collection)
                    }
                    // The Workbench failure is the more informative one
                    Err(_) => Err(err),
                }
            }
        }
    }
}

fn study_file(ctx: &ResolveContext<'_>, usi: &Usi) -> Result<FetchDescriptor, LookupError> {
    let listing = build_url(
        &ctx.endpoints.workbench,
        &["rest", "study", "study_id", usi.collection.as_str(), "datafiles"],
        &[("format", "tsv")],
    )?;
    let body = ctx.client.get_text(&listing)?;
    let table_error = |source| LookupError::Table {
        url: listing.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader.headers().map_err(table_error)?.clone();
    let column = |name: &str| -> Result<usize, LookupError> {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| LookupError::Schema {
                url: listing.to_string(),
                field: name.to_string(),
            })
    };
    let name_col = column("file_name")?;
    let url_col = column("download_url")?;

    for record in reader.records() {
        let record = record.map_err(table_error)?;
        let (Some(name), Some(url)) = (record.get(name_col), record.get(url_col)) else {
            continue;
        };
        if names_file(name, usi) {
            let url = reqwest::Url::parse(url.trim())
                .map_err(|e| LookupError::InvalidUrl(format!("{url}: {e}")))?;
            return Ok(FetchDescriptor {
                remote_uri: url.to_string(),
                provider_kind: usi.kind,
                source_name: file_name_of(name).to_string(),
            });
        }
    }

    Err(LookupError::NotListed {
        url: listing.to_string(),
        wanted: usi.path.clone(),
    })
}
