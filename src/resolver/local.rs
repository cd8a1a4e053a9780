//! Files already uploaded to local storage

use std::path::{Component, Path};

use super::{FetchDescriptor, LookupError, ProviderStrategy, ResolveContext, ResolveOptions};
use crate::usi::Usi;

/// Serves `mzspec:LOCAL:<relative path>` from the upload directory
pub struct LocalUpload;

impl ProviderStrategy for LocalUpload {
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        usi: &Usi,
        _options: &ResolveOptions,
    ) -> Result<FetchDescriptor, LookupError> {
        let relative = Path::new(&usi.path);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(LookupError::Invalid(format!(
                "local path '{}' must stay inside the upload directory",
                usi.path
            )));
        }

        let path = ctx.local_dir.join(relative);
        if !path.is_file() {
            return Err(LookupError::Invalid(format!(
                "no uploaded file at {}",
                path.display()
            )));
        }

        Ok(FetchDescriptor {
            remote_uri: path.to_string_lossy().into_owned(),
            provider_kind: usi.kind,
            source_name: usi.file_name().to_string(),
        })
    }
}
