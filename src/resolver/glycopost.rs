//! GlycoPOST projects (`GPST...`)

use serde_json::Value;

use super::{
    build_url, file_name_of, names_file, FetchDescriptor, LookupError, ProviderStrategy,
    ResolveContext, ResolveOptions,
};
use crate::usi::Usi;

/// Finds the file in the project's file list, which carries direct URLs
pub struct GlycoPostProject;

impl ProviderStrategy for GlycoPostProject {
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        usi: &Usi,
        _options: &ResolveOptions,
    ) -> Result<FetchDescriptor, LookupError> {
        let listing = build_url(
            &ctx.endpoints.glycopost,
            &["api", "projects", usi.collection.as_str(), "files"],
            &[],
        )?;
        let body = ctx.client.get_json(&listing)?;
        let files = body
            .get("files")
            .and_then(Value::as_array)
            .ok_or_else(|| LookupError::Schema {
                url: listing.to_string(),
                field: "files".to_string(),
            })?;

        let (name, url) = files
            .iter()
            .filter_map(|entry| {
                let name = entry.get("name").and_then(Value::as_str)?;
                let url = entry.get("url").and_then(Value::as_str)?;
                Some((name, url))
            })
            .find(|(name, _)| names_file(name, usi))
            .ok_or_else(|| LookupError::NotListed {
                url: listing.to_string(),
                wanted: usi.path.clone(),
            })?;

        let url = reqwest::Url::parse(url)
            .map_err(|e| LookupError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(FetchDescriptor {
            remote_uri: url.to_string(),
            provider_kind: usi.kind,
            source_name: file_name_of(name).to_string(),
        })
    }
}
