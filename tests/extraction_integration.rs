//! End-to-end tests: raw email file on disk → report files in the target directory.
//!
//! Fixtures (emails, gzip and zip archives) are built in memory for each test
//! and written into a fresh temp directory.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;

use dmarc_extract::config::ExtractorConfig;
use dmarc_extract::pipeline::UnroutedPolicy;
use dmarc_extract::{DmarcExtractor, Error, ExtractError, extract};

const GOOGLE_ARCHIVE: &str = "google.com!glenjarvis.com!1501372800!1501459199.xml.gz";
const GOOGLE_REPORT: &str = "google.com!glenjarvis.com!1501372800!1501459199.xml";

fn report_xml(org: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
         <feedback>\n\
         \x20 <report_metadata>\n\
         \x20   <org_name>{org}</org_name>\n\
         \x20   <email>noreply-dmarc-support@{org}</email>\n\
         \x20   <report_id>15015726943290862425</report_id>\n\
         \x20   <date_range><begin>1501372800</begin><end>1501459199</end></date_range>\n\
         \x20 </report_metadata>\n\
         \x20 <policy_published><domain>glenjarvis.com</domain><p>none</p></policy_published>\n\
         \x20 <record>\n\
         \x20   <row><source_ip>209.85.220.41</source_ip><count>1</count></row>\n\
         \x20 </record>\n\
         </feedback>\n"
    )
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Base64 body wrapped at 76 columns, as mail clients send it.
fn base64_body(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    encoded
        .as_bytes()
        .chunks(76)
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

struct Part<'a> {
    content_type: &'a str,
    disposition: &'a str,
    body: &'a [u8],
}

fn attachment<'a>(content_type: &'a str, disposition: &'a str, body: &'a [u8]) -> Part<'a> {
    Part {
        content_type,
        disposition,
        body,
    }
}

fn email(parts: &[Part<'_>]) -> Vec<u8> {
    let mut raw = String::from(
        "Return-Path: <noreply-dmarc-support@google.com>\r\n\
         From: noreply-dmarc-support@google.com\r\n\
         To: dmarc@glenjarvis.com\r\n\
         Subject: Report domain: glenjarvis.com Submitter: google.com\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"001a11c1d0bc5e30b90555a4f9fb\"\r\n\
         \r\n\
         --001a11c1d0bc5e30b90555a4f9fb\r\n\
         Content-Type: text/plain; charset=\"UTF-8\"; format=flowed; delsp=yes\r\n\
         \r\n\
         This is an aggregate report from google.com.\r\n",
    );
    for part in parts {
        raw.push_str(&format!(
            "--001a11c1d0bc5e30b90555a4f9fb\r\n\
             Content-Type: {}\r\n\
             Content-Disposition: {}\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {}\r\n",
            part.content_type,
            part.disposition,
            base64_body(part.body)
        ));
    }
    raw.push_str("--001a11c1d0bc5e30b90555a4f9fb--\r\n");
    raw.into_bytes()
}

fn gzip_attachment_disposition(name: &str) -> String {
    format!("attachment; filename=\"{name}\"")
}

/// Temp root with `msg.eml` and an empty `out/` directory.
fn workspace(raw_email: &[u8]) -> (tempfile::TempDir, PathBuf, PathBuf) {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("msg.eml");
    std::fs::write(&source, raw_email).unwrap();
    let out = root.path().join("out");
    std::fs::create_dir(&out).unwrap();
    (root, source, out)
}

fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn google_gzip_report_end_to_end() {
    let report = report_xml("google.com");
    let archive = gzip(report.as_bytes());
    let disposition = gzip_attachment_disposition(GOOGLE_ARCHIVE);
    let (_root, source, out) =
        workspace(&email(&[attachment("application/gzip", &disposition, &archive)]));

    let paths = extract(&source, &out).unwrap();

    assert_eq!(paths, vec![out.join(GOOGLE_REPORT)]);
    assert_eq!(std::fs::read(&paths[0]).unwrap(), report.as_bytes());
    assert_eq!(dir_listing(&out), vec![GOOGLE_REPORT, GOOGLE_ARCHIVE]);
}

#[test]
fn email_without_matching_attachment_writes_nothing() {
    let (_root, source, out) = workspace(&email(&[attachment(
        "application/pdf",
        "attachment; filename=\"invoice.pdf\"",
        b"%PDF-1.4",
    )]));

    let result = extract(&source, &out);

    assert!(matches!(result, Err(ExtractError::NoAttachmentFound { .. })));
    assert!(dir_listing(&out).is_empty());
}

#[test]
fn single_part_email_has_no_attachments() {
    let archive = gzip(report_xml("google.com").as_bytes());
    let raw = format!(
        "From: noreply-dmarc-support@google.com\r\n\
         Subject: Report domain: glenjarvis.com\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: application/gzip\r\n\
         Content-Disposition: attachment; filename=\"{GOOGLE_ARCHIVE}\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         {}\r\n",
        base64_body(&archive)
    );
    let (_root, source, out) = workspace(raw.as_bytes());

    let result = extract(&source, &out);

    assert!(matches!(result, Err(ExtractError::NoAttachmentFound { .. })));
    assert!(dir_listing(&out).is_empty());
}

#[test]
fn non_dmarc_gzip_is_dropped() {
    let archive = gzip(b"<html><body>quarterly newsletter</body></html>");
    let (_root, source, out) = workspace(&email(&[attachment(
        "application/gzip",
        "attachment; filename=\"newsletter.html.gz\"",
        &archive,
    )]));

    let paths = extract(&source, &out).unwrap();

    assert!(paths.is_empty());
    // Only the staged archive.
    assert_eq!(dir_listing(&out), vec!["newsletter.html.gz"]);
}

#[test]
fn zip_with_trailing_garbage_is_repaired_and_extracted() {
    let report = report_xml("yahoo.com");
    let mut archive = zip_archive(&[("yahoo.com!glenjarvis.com!1501372800!1501459199.xml", report.as_bytes())]);
    archive.extend_from_slice(b"\r\n-- \r\nsent by a broken mailer\r\n");

    let (_root, source, out) = workspace(&email(&[attachment(
        "application/zip",
        "attachment; filename=\"yahoo.com!glenjarvis.com!1501372800!1501459199.zip\"",
        &archive,
    )]));

    let paths = extract(&source, &out).unwrap();

    let expected = out.join("yahoo.com!glenjarvis.com!1501372800!1501459199.xml");
    assert_eq!(paths, vec![expected.clone()]);
    assert_eq!(std::fs::read(&expected).unwrap(), report.as_bytes());
}

#[test]
fn zip_entries_are_not_validated() {
    let archive = zip_archive(&[("notes.txt", b"hello".as_slice()), ("data.csv", b"a,b\n1,2\n".as_slice())]);
    let (_root, source, out) = workspace(&email(&[attachment(
        "application/zip",
        "attachment; filename=\"bundle.zip\"",
        &archive,
    )]));

    let paths = extract(&source, &out).unwrap();
    assert_eq!(paths, vec![out.join("notes.txt"), out.join("data.csv")]);
}

#[test]
fn csv_gzip_gets_xml_name() {
    let report = report_xml("example.org");
    let archive = gzip(report.as_bytes());
    let (_root, source, out) = workspace(&email(&[attachment(
        "application/gzip",
        "attachment; filename=\"report.csv.gz\"",
        &archive,
    )]));

    let paths = extract(&source, &out).unwrap();
    assert_eq!(paths, vec![out.join("report.xml")]);
}

#[test]
fn mixed_attachments_keep_email_order() {
    let gz_report = report_xml("google.com");
    let gz = gzip(gz_report.as_bytes());
    let zip_report = report_xml("yahoo.com");
    let zipped = zip_archive(&[("yahoo.xml", zip_report.as_bytes())]);
    let gz_disposition = gzip_attachment_disposition(GOOGLE_ARCHIVE);

    let (_root, source, out) = workspace(&email(&[
        attachment("application/zip", "attachment; filename=\"yahoo.zip\"", &zipped),
        attachment("text/plain", "attachment; filename=\"readme.txt\"", b"ignored"),
        attachment("application/gzip", &gz_disposition, &gz),
    ]));

    let paths = extract(&source, &out).unwrap();
    assert_eq!(paths, vec![out.join("yahoo.xml"), out.join(GOOGLE_REPORT)]);
}

#[test]
fn rerun_gives_same_result() {
    let archive = gzip(report_xml("google.com").as_bytes());
    let disposition = gzip_attachment_disposition(GOOGLE_ARCHIVE);
    let (_root, source, out) =
        workspace(&email(&[attachment("application/gzip", &disposition, &archive)]));

    let extractor = DmarcExtractor::new(&out).unwrap();
    let first = extractor.extract(&source).unwrap();
    let listing = dir_listing(&out);
    let second = extractor.extract(&source).unwrap();

    assert_eq!(first, second);
    assert_eq!(dir_listing(&out), listing);
}

#[test]
fn missing_target_directory() {
    let archive = gzip(report_xml("google.com").as_bytes());
    let disposition = gzip_attachment_disposition(GOOGLE_ARCHIVE);
    let (root, source, _out) =
        workspace(&email(&[attachment("application/gzip", &disposition, &archive)]));

    let result = extract(&source, root.path().join("does-not-exist"));
    assert!(matches!(result, Err(ExtractError::DirectoryNotFound(_))));
}

#[test]
fn fake_zip_is_archive_error() {
    let (_root, source, out) = workspace(&email(&[attachment(
        "application/zip",
        "attachment; filename=\"fake.zip\"",
        b"this is not a zip archive at all",
    )]));

    let result = extract(&source, &out);
    assert!(matches!(result, Err(ExtractError::ArchiveFormat { .. })));
}

#[test]
fn config_policy_reject_fails_unrouted() {
    let (_root, source, out) = workspace(&email(&[attachment(
        "application/octet-stream",
        "attachment; filename=\"report.bin\"",
        b"\x00\x01",
    )]));

    let mut config = ExtractorConfig::new(&out);
    config.content_types.push("application/octet-stream".into());
    config.unrouted_policy = UnroutedPolicy::Reject;

    let extractor = DmarcExtractor::from_config(&config).unwrap();
    let result = extractor.extract(&source);
    assert!(matches!(result, Err(ExtractError::UnroutableAttachment { .. })));
}

#[test]
fn from_config_checks_directory() {
    let root = tempfile::tempdir().unwrap();
    let config = ExtractorConfig::new(root.path().join("missing"));

    let result = DmarcExtractor::from_config(&config);
    assert!(matches!(
        result,
        Err(Error::Extract(ExtractError::DirectoryNotFound(_)))
    ));
}

#[test]
fn one_extractor_serves_parallel_runs() {
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let sources: Vec<PathBuf> = ["alpha", "beta", "gamma", "delta"]
        .iter()
        .map(|org| {
            let archive = gzip(report_xml(&format!("{org}.com")).as_bytes());
            let disposition = gzip_attachment_disposition(&format!("{org}.xml.gz"));
            let source = root.path().join(format!("{org}.eml"));
            std::fs::write(
                &source,
                email(&[attachment("application/gzip", &disposition, &archive)]),
            )
            .unwrap();
            source
        })
        .collect();

    let extractor = DmarcExtractor::new(&out).unwrap();

    let results: Vec<Vec<PathBuf>> = std::thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                let extractor = &extractor;
                scope.spawn(move || extractor.extract(source).unwrap().into_paths())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (org, paths) in ["alpha", "beta", "gamma", "delta"].iter().zip(&results) {
        assert_eq!(paths, &vec![out.join(format!("{org}.xml"))]);
    }
}
