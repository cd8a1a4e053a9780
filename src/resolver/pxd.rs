//! ProteomeXchange datasets (`PXD...`)
//!
//! Many datasets are mirrored on MassIVE, which is asked first. Otherwise the
//! ProteomeCentral record tells which repository hosts the files: PRIDE
//! (one more lookup for the file's public location) or MassIVE.

use serde_json::Value;

use super::{
    build_url, file_name_of, massive, names_file, FetchDescriptor, LookupError,
    ProviderStrategy, ResolveContext, ResolveOptions,
};
use crate::usi::Usi;

/// MassIVE mirror first, then the declared hosting repository
pub struct ProteomeExchangeDataset;

/// Repository a dataset's files are hosted in
#[derive(Debug, Clone, PartialEq, Eq)]
enum Host {
    Pride,
    Massive(String),
}

impl ProviderStrategy for ProteomeExchangeDataset {
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        usi: &Usi,
        _options: &ResolveOptions,
    ) -> Result<FetchDescriptor, LookupError> {
        match massive::lookup(ctx, usi) {
            Ok(descriptor) => return Ok(descriptor),
            Err(err) => log::info!("No MassIVE mirror for {usi} ({err}); asking ProteomeCentral"),
        }

        match declared_host(ctx, usi)? {
            Host::Pride => pride_file(ctx, usi),
            Host::Massive(dataset) => massive::best_effort(ctx, usi, &dataset),
        }
    }
}

fn declared_host(ctx: &ResolveContext<'_>, usi: &Usi) -> Result<Host, LookupError> {
    let url = build_url(
        &ctx.endpoints.proteomecentral,
        &["cgi", "GetDataset"],
        &[("ID", usi.collection.as_str()), ("outputMode", "JSON")],
    )?;
    let body = ctx.client.get_json(&url)?;
    let links = body
        .get("fullDatasetLinks")
        .and_then(Value::as_array)
        .ok_or_else(|| LookupError::Schema {
            url: url.to_string(),
            field: "fullDatasetLinks".to_string(),
        })?;

    let texts = links.iter().flat_map(|link| {
        ["name", "value", "accession"]
            .into_iter()
            .filter_map(move |key| link.get(key).and_then(Value::as_str))
    });

    let mut massive_dataset = None;
    for text in texts {
        if text.to_ascii_lowercase().contains("pride") {
            return Ok(Host::Pride);
        }
        if massive_dataset.is_none() {
            massive_dataset = msv_accession(text);
        }
    }

    massive_dataset.map(Host::Massive).ok_or_else(|| LookupError::Schema {
        url: url.to_string(),
        field: "PRIDE or MassIVE dataset link".to_string(),
    })
}

/// First `MSV` followed by digits in a link
fn msv_accession(text: &str) -> Option<String> {
    let start = text.find("MSV")?;
    let digits: String = text[start + 3..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    (!digits.is_empty()).then(|| format!("MSV{digits}"))
}

fn pride_file(ctx: &ResolveContext<'_>, usi: &Usi) -> Result<FetchDescriptor, LookupError> {
    let url = build_url(
        &ctx.endpoints.pride,
        &["files", "byProject"],
        &[("accession", usi.collection.as_str())],
    )?;
    let body = ctx.client.get_json(&url)?;
    let files = body.as_array().ok_or_else(|| LookupError::Schema {
        url: url.to_string(),
        field: "file list".to_string(),
    })?;

    let entry = files
        .iter()
        .find(|entry| {
            entry
                .get("fileName")
                .and_then(Value::as_str)
                .is_some_and(|name| names_file(name, usi))
        })
        .ok_or_else(|| LookupError::NotListed {
            url: url.to_string(),
            wanted: usi.path.clone(),
        })?;

    let locations = entry
        .get("publicFileLocations")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let values: Vec<&str> = locations
        .iter()
        .filter_map(|loc| loc.get("value").and_then(Value::as_str))
        .collect();
    let location = values
        .iter()
        .copied()
        .find(|value| value.starts_with("https://") || value.starts_with("http://"))
        .map(str::to_string)
        .or_else(|| values.iter().find_map(|value| over_https(value)))
        .ok_or_else(|| LookupError::Schema {
            url: url.to_string(),
            field: "publicFileLocations".to_string(),
        })?;

    let name = entry
        .get("fileName")
        .and_then(Value::as_str)
        .unwrap_or(&location);
    Ok(FetchDescriptor {
        source_name: file_name_of(name).to_string(),
        remote_uri: location,
        provider_kind: usi.kind,
    })
}

/// The PRIDE FTP tree is also served over HTTPS from the same host
fn over_https(location: &str) -> Option<String> {
    location
        .strip_prefix("ftp://")
        .map(|rest| format!("https://{rest}"))
}

#[cfg(test)]
mod tests {
    use super::{msv_accession, over_https};

    #[test]
    fn test_msv_accession_from_link() {
        assert_eq!(
            msv_accession("https://massive.ucsd.edu/dataset?accession=MSV000079514"),
            Some("MSV000079514".to_string())
        );
        assert_eq!(msv_accession("MSV"), None);
        assert_eq!(msv_accession("no link"), None);
    }

    #[test]
    fn test_ftp_location_served_over_https() {
        assert_eq!(
            over_https("ftp://ftp.pride.ebi.ac.uk/pride/data/archive/2014/04/PXD000561/b01.raw")
                .as_deref(),
            Some("https://ftp.pride.ebi.ac.uk/pride/data/archive/2014/04/PXD000561/b01.raw")
        );
        assert_eq!(over_https("prd_ascp@fasp.ebi.ac.uk:pride/b01.raw"), None);
    }
}
