//! MetaboLights studies (`MTBLS...`)

use serde_json::Value;

use super::{
    build_url, file_name_of, names_file, FetchDescriptor, LookupError, ProviderStrategy,
    ResolveContext, ResolveOptions,
};
use crate::usi::Usi;

/// Finds the file in the study's file listing
pub struct MetaboLightsStudy;

impl ProviderStrategy for MetaboLightsStudy {
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        usi: &Usi,
        _options: &ResolveOptions,
    ) -> Result<FetchDescriptor, LookupError> {
        let listing = build_url(
            &ctx.endpoints.metabolights,
            &["studies", usi.collection.as_str(), "files"],
            &[("include_raw_data", "true")],
        )?;
        let body = ctx.client.get_json(&listing)?;
        let files = body
            .get("study")
            .and_then(Value::as_array)
            .ok_or_else(|| LookupError::Schema {
                url: listing.to_string(),
                field: "study".to_string(),
            })?;

        let file = files
            .iter()
            .filter_map(|entry| entry.get("file").and_then(Value::as_str))
            .find(|name| names_file(name, usi))
            .ok_or_else(|| LookupError::NotListed {
                url: listing.to_string(),
                wanted: usi.path.clone(),
            })?;

        let url = build_url(
            &ctx.endpoints.metabolights,
            &["studies", usi.collection.as_str(), "download", "public"],
            &[("file", file)],
        )?;
        Ok(FetchDescriptor {
            remote_uri: url.to_string(),
            provider_kind: usi.kind,
            source_name: file_name_of(file).to_string(),
        })
    }
}
