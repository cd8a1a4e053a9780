use super::*;

const BASE: &str = "http://mock.test";

fn resolver(client: StaticMetadataClient) -> Resolver {
    Resolver::new(ProviderEndpoints::all_at(BASE), "/nonexistent", client)
}

fn resolve(client: StaticMetadataClient, usi: &str) -> Result<FetchDescriptor, ResolveError> {
    resolver(client).resolve_str(usi, &ResolveOptions::default())
}

/// Query string of a URI must not carry raw separators from the identifier
fn assert_quoted(uri: &str) {
    let url = reqwest::Url::parse(uri).unwrap();
    if let Some(query) = url.query() {
        assert!(!query.contains('/'), "unescaped '/' in {uri}");
    }
}

#[test]
fn test_massive_prefers_open_format() {
    let client = StaticMetadataClient::new().respond(
        "QuerySpectrum",
        r#"{"row_data": [
            {"file_descriptor": "f.MSV000084494/raw/GNPS00002_A3_p.raw"},
            {"file_descriptor": "f.MSV000084494/peak/GNPS00002_A3_p.mzXML"},
            {"file_descriptor": "f.MSV000084494/ccms_peak/GNPS00002_A3_p.mzML"}
        ]}"#,
    );
    let descriptor = resolve(client, "mzspec:MSV000084494:GNPS00002_A3_p:scan:1").unwrap();

    assert_eq!(descriptor.provider_kind, ProviderKind::ArchiveDataset);
    assert_eq!(descriptor.source_name, "GNPS00002_A3_p.mzML");
    assert!(descriptor
        .remote_uri
        .starts_with("http://mock.test/ProteoSAFe/DownloadResultFile?file=f.MSV000084494%2Fccms_peak%2FGNPS00002_A3_p.mzML"));
    assert_quoted(&descriptor.remote_uri);
}

#[test]
fn test_massive_falls_back_to_raw() {
    let client = StaticMetadataClient::new().respond(
        "QuerySpectrum",
        r#"{"row_data": [{"file_descriptor": "f.MSV000084494/raw/run.RAW"},
                         {"file_descriptor": "f.MSV000084494/other/run.txt"}]}"#,
    );
    let descriptor = resolve(client, "mzspec:MSV000084494:run").unwrap();
    assert_eq!(descriptor.source_name, "run.RAW");
}

#[test]
fn test_massive_failure_is_unresolved_unless_forced() {
    let err = resolve(StaticMetadataClient::new(), "mzspec:MSV000084494:peak/run.mzML").unwrap_err();
    assert_eq!(err.kind(), Some(ProviderKind::ArchiveDataset));
    assert!(matches!(err, ResolveError::UnresolvedIdentifier { .. }));

    let descriptor = resolver(StaticMetadataClient::new())
        .resolve_str("mzspec:MSV000084494:peak/run.mzML", &ResolveOptions::best_effort())
        .unwrap();
    assert!(descriptor.remote_uri.contains("file=f.MSV000084494%2Fpeak%2Frun.mzML"));
    assert_eq!(descriptor.source_name, "run.mzML");
}

#[test]
fn test_gnps_task_needs_no_lookup() {
    let client = StaticMetadataClient::new();
    let resolver = resolver(client);
    let descriptor = resolver
        .resolve_str(
            "mzspec:GNPS:TASK-c95481f0c53d42e78a61bf899e9f9adb-spectra/specs ms.mzML:scan:3",
            &ResolveOptions::default(),
        )
        .unwrap();

    assert_eq!(descriptor.provider_kind, ProviderKind::TaskOutput);
    assert_eq!(descriptor.source_name, "specs ms.mzML");
    let url = reqwest::Url::parse(&descriptor.remote_uri).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&(
        "task".to_string(),
        "c95481f0c53d42e78a61bf899e9f9adb".to_string()
    )));
    assert!(pairs.contains(&("file".to_string(), "spectra/specs ms.mzML".to_string())));
    assert_quoted(&descriptor.remote_uri);
}

#[test]
fn test_gnps_quickstart_reference() {
    let descriptor = resolve(
        StaticMetadataClient::new(),
        "mzspec:GNPS:QUICKSTART-8a1b-converted/run.mzML",
    )
    .unwrap();
    assert!(descriptor
        .remote_uri
        .starts_with("http://mock.test/conversion/file?sessionid=8a1b&filename=converted%2Frun.mzML"));
}

#[test]
fn test_gnps_library_provenance() {
    let client = StaticMetadataClient::new().respond(
        "SpectrumCommentServlet",
        r#"{"spectruminfo": {"task": "abc123", "source_file": "f.MSV000078787/ccms_peak/lib.mzXML;"}}"#,
    );
    let descriptor = resolve(client, "mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00005436077").unwrap();
    assert_eq!(descriptor.source_name, "lib.mzXML");
    assert!(descriptor
        .remote_uri
        .contains("file=f.MSV000078787%2Fccms_peak%2Flib.mzXML"));

    let client = StaticMetadataClient::new().respond(
        "SpectrumCommentServlet",
        r#"{"spectruminfo": {"task": "abc123", "source_file": "spectra/upload.mzML"}}"#,
    );
    let descriptor = resolve(client, "mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB1").unwrap();
    assert!(descriptor.remote_uri.contains("task=abc123"));

    let client = StaticMetadataClient::new().respond("SpectrumCommentServlet", r#"{"other": 1}"#);
    assert!(resolve(client, "mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB1").is_err());
}

#[test]
fn test_gnps_malformed_task() {
    let err = resolve(StaticMetadataClient::new(), "mzspec:GNPS:TASK-nofile").unwrap_err();
    assert_eq!(err.kind(), Some(ProviderKind::TaskOutput));
}

#[test]
fn test_metabolights_study_listing() {
    let client = StaticMetadataClient::new().respond(
        "/studies/MTBLS1842/files",
        r#"{"study": [{"file": "FILES/other.mzML"}, {"file": "FILES/sample 01.mzML"}]}"#,
    );
    let descriptor = resolve(client, "mzspec:MTBLS1842:sample 01:scan:4").unwrap();
    assert_eq!(descriptor.provider_kind, ProviderKind::StudyRepository);
    assert_eq!(descriptor.source_name, "sample 01.mzML");
    assert!(descriptor
        .remote_uri
        .starts_with("http://mock.test/studies/MTBLS1842/download/public?file=FILES%2Fsample+01.mzML"));
}

#[test]
fn test_glycopost_listing() {
    let client = StaticMetadataClient::new().respond(
        "/api/projects/GPST000024/files",
        r#"{"files": [{"name": "glyco_1.raw", "url": "https://glycopost.glycosmos.org/data/GPST000024/glyco_1.raw"}]}"#,
    );
    let descriptor = resolve(client, "mzspec:GPST000024:glyco_1.raw").unwrap();
    assert_eq!(descriptor.provider_kind, ProviderKind::GlycoRepository);
    assert_eq!(descriptor.source_name, "glyco_1.raw");

    let client = StaticMetadataClient::new()
        .respond("/api/projects/GPST000024/files", r#"{"files": []}"#);
    assert!(resolve(client, "mzspec:GPST000024:glyco_1.raw").is_err());
}

#[test]
fn test_workbench_table_then_massive_fallback() {
    let client = StaticMetadataClient::new().respond(
        "/datafiles",
        "file_name\tdownload_url\nQC_1.mzML\thttps://www.metabolomicsworkbench.org/data/QC_1.mzML\n",
    );
    let descriptor = resolve(client, "mzspec:ST001709:QC_1").unwrap();
    assert_eq!(descriptor.provider_kind, ProviderKind::Workbench);
    assert_eq!(
        descriptor.remote_uri,
        "https://www.metabolomicsworkbench.org/data/QC_1.mzML"
    );

    let client = StaticMetadataClient::new()
        .respond("/datafiles", "file_name\tdownload_url\n")
        .respond(
            "QuerySpectrum",
            r#"{"row_data": [{"file_descriptor": "f.MSV000085000/ST001709/QC_1.mzML"}]}"#,
        );
    let descriptor = resolve(client, "mzspec:ST001709:QC_1").unwrap();
    assert!(descriptor.remote_uri.contains("ProteoSAFe"));
    assert_eq!(descriptor.provider_kind, ProviderKind::Workbench);
}

#[test]
fn test_pxd_prefers_massive_mirror() {
    let client = StaticMetadataClient::new().respond(
        "QuerySpectrum",
        r#"{"row_data": [{"file_descriptor": "f.MSV000079514/peak/a.mzML"}]}"#,
    );
    let resolver = resolver(client);
    let descriptor = resolver
        .resolve_str("mzspec:PXD000561:a:scan:1", &ResolveOptions::default())
        .unwrap();
    assert!(descriptor.remote_uri.contains("MSV000079514"));
}

#[test]
fn test_pxd_via_pride() {
    let client = StaticMetadataClient::new()
        .respond(
            "GetDataset",
            r#"{"fullDatasetLinks": [{"name": "PRIDE project URI", "value": "http://www.ebi.ac.uk/pride/archive/projects/PXD000561"}]}"#,
        )
        .respond(
            "byProject",
            r#"[{"fileName": "b01.raw", "publicFileLocations": [
                {"name": "Aspera Protocol", "value": "prd_ascp@fasp.ebi.ac.uk:pride/b01.raw"},
                {"name": "FTP Protocol", "value": "ftp://ftp.pride.ebi.ac.uk/pride/data/archive/2014/04/PXD000561/b01.raw"}
            ]}]"#,
        );
    let descriptor = resolve(client, "mzspec:PXD000561:b01:scan:7").unwrap();
    assert_eq!(
        descriptor.remote_uri,
        "https://ftp.pride.ebi.ac.uk/pride/data/archive/2014/04/PXD000561/b01.raw"
    );
    assert_eq!(descriptor.source_name, "b01.raw");
    assert_eq!(descriptor.provider_kind, ProviderKind::ProteomeExchange);
}

#[test]
fn test_pxd_prefers_listed_http_location() {
    let client = StaticMetadataClient::new()
        .respond(
            "GetDataset",
            r#"{"fullDatasetLinks": [{"name": "PRIDE project URI", "value": "http://www.ebi.ac.uk/pride/archive/projects/PXD000561"}]}"#,
        )
        .respond(
            "byProject",
            r#"[{"fileName": "b02.mzML", "publicFileLocations": [
                {"name": "FTP Protocol", "value": "ftp://ftp.pride.ebi.ac.uk/pride/data/archive/PXD000561/b02.mzML"},
                {"name": "HTTPS Protocol", "value": "https://www.ebi.ac.uk/pride/data/PXD000561/b02.mzML"}
            ]}]"#,
        );
    let descriptor = resolve(client, "mzspec:PXD000561:b02").unwrap();
    assert_eq!(
        descriptor.remote_uri,
        "https://www.ebi.ac.uk/pride/data/PXD000561/b02.mzML"
    );
}

#[test]
fn test_pxd_via_massive_link() {
    let client = StaticMetadataClient::new().respond(
        "GetDataset",
        r#"{"fullDatasetLinks": [{"name": "MassIVE dataset URI", "value": "https://massive.ucsd.edu/MSV000080000"}]}"#,
    );
    let descriptor = resolve(client, "mzspec:PXD001234:run.mzML").unwrap();
    assert!(descriptor
        .remote_uri
        .contains("file=f.MSV000080000%2Frun.mzML"));
}

#[test]
fn test_pxd_without_links_is_unresolved() {
    let client = StaticMetadataClient::new().respond("GetDataset", r#"{"fullDatasetLinks": []}"#);
    let err = resolve(client, "mzspec:PXD001234:run.mzML").unwrap_err();
    assert_eq!(err.kind(), Some(ProviderKind::ProteomeExchange));
}

#[test]
fn test_local_upload() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("upload.mzML"), b"<mzML/>").unwrap();
    let resolver = Resolver::new(
        ProviderEndpoints::all_at(BASE),
        dir.path(),
        StaticMetadataClient::new(),
    );

    let descriptor = resolver
        .resolve_str("mzspec:LOCAL:upload.mzML", &ResolveOptions::default())
        .unwrap();
    assert!(descriptor.is_local());
    assert_eq!(
        std::path::PathBuf::from(&descriptor.remote_uri),
        dir.path().join("upload.mzML")
    );

    assert!(resolver
        .resolve_str("mzspec:LOCAL:../etc/passwd", &ResolveOptions::default())
        .is_err());
    assert!(resolver
        .resolve_str("mzspec:LOCAL:missing.mzML", &ResolveOptions::default())
        .is_err());
}

#[test]
fn test_unknown_collection_is_identifier_error() {
    let err = resolve(StaticMetadataClient::new(), "mzspec:ZENODO1:file").unwrap_err();
    assert!(matches!(err, ResolveError::Identifier(_)));
    assert_eq!(err.kind(), None);
}
