//! Local end-to-end checks of the batch flow: plan manifests from a
//! listing, persist and reload them, select one worker slot's share, then
//! unpack and rewrite a record's archive through the staging layout.

use flate2::write::GzEncoder;
use flate2::Compression;
use pdp_ingest::storage::ObjectUrl;
use pdp_ingest::trafficvision::batch::{extract_archive, select_assigned};
use pdp_ingest::trafficvision::manifest::{plan_batches, read_manifest};
use pdp_ingest::trafficvision::transform::rewrite_log_file;
use pdp_ingest::trafficvision::StagingArea;
use std::fs::File;
use std::path::Path;

fn listing(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("data/trafficvision/source/clip-{:03}.tar.gz", i))
        .collect()
}

fn write_archive(path: &Path, guid: &str, log: &str) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(log.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("{}/out.log", guid), log.as_bytes())
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap();
}

#[test]
fn manifests_round_trip_through_the_staging_folder() {
    let tmp = tempfile::tempdir().unwrap();
    let staging = StagingArea::new(tmp.path().join("work"), "source", "unpack", "load", "batch");
    staging.ensure_layout().unwrap();

    let source = ObjectUrl::parse("s3://staging-bucket/data/trafficvision/source").unwrap();
    let manifests = plan_batches(&listing(5), &source, 2);
    assert_eq!(manifests.len(), 3);

    for manifest in &manifests {
        manifest
            .write_to(&staging.manifest_path(&manifest.file_name()))
            .unwrap();
    }

    // Reload in sorted name order, the way the batch phase lists them.
    let mut names: Vec<String> = std::fs::read_dir(staging.batch_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "batch_metadata-000001.txt",
            "batch_metadata-000002.txt",
            "batch_metadata-000003.txt"
        ]
    );

    let assigned = select_assigned(&names, 2, 1);
    assert_eq!(
        assigned,
        vec!["batch_metadata-000001.txt", "batch_metadata-000003.txt"]
    );

    let records = read_manifest(&staging.manifest_path(&assigned[0])).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].guid, "clip-000");
    assert_eq!(
        records[0].pathname,
        "s3://staging-bucket/data/trafficvision/source/clip-000.tar.gz"
    );
    assert_eq!(records[0].batch_number, 1);
}

#[test]
fn record_flow_unpacks_and_rewrites_through_staging() {
    let tmp = tempfile::tempdir().unwrap();
    let staging = StagingArea::new(tmp.path().join("work"), "source", "unpack", "load", "batch");
    staging.ensure_layout().unwrap();

    let guid = "clip-042";
    let archive_path = staging.archive_path("clip-042.tar.gz");
    write_archive(
        &archive_path,
        guid,
        "{\"frame\": 1, \"boxes\": [[0, 0, 4, 4]]}\n{\"frame\": 2, \"boxes\": []}\n",
    );

    extract_archive(&archive_path, staging.unpack_dir()).unwrap();
    let extracted = staging.unpacked_log(guid);
    assert!(extracted.is_file());

    let load_path = staging.load_path(guid);
    rewrite_log_file(&extracted, &load_path, guid).unwrap();

    let rewritten = std::fs::read_to_string(&load_path).unwrap();
    assert_eq!(
        rewritten,
        "{\"id\": \"clip-042\", \"frame\": 1, \"boxes\": [[0, 0, 4, 4]]}\n\
         {\"id\": \"clip-042\", \"frame\": 2, \"boxes\": []}\n"
    );

    // Same cleanup the processor performs after upload.
    std::fs::remove_file(&archive_path).unwrap();
    std::fs::remove_file(&load_path).unwrap();
    std::fs::remove_dir_all(staging.unpacked_dir(guid)).unwrap();
    assert!(std::fs::read_dir(staging.unpack_dir()).unwrap().next().is_none());
}
