//! Detection-log rewrite
//!
//! Each unpacked archive holds a newline-delimited JSON-like log of frame
//! detections. Lines opening with the frame marker get the owning video's
//! guid injected as a leading `"id"` field; everything else passes through
//! untouched. The rewrite is positional text surgery on the line prefix,
//! not a JSON parse, matching the upstream file contract.

use super::{Result, FRAME_MARKER};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Inject `"id": "<guid>"` after the opening brace of a frame record.
///
/// `{"frame"...}` becomes `{"id": "<guid>", "frame"...}`; non-matching
/// lines are returned unchanged.
pub fn inject_id<'a>(line: &'a str, guid: &str) -> Cow<'a, str> {
    match line.strip_prefix(FRAME_MARKER) {
        Some(rest) => Cow::Owned(format!("{{\"id\": \"{}\", \"frame\"{}", guid, rest)),
        None => Cow::Borrowed(line),
    }
}

/// Rewrite a detection log line by line, injecting the guid id field.
pub fn rewrite_log_file(source: &Path, destination: &Path, guid: &str) -> Result<()> {
    debug!(
        "Rewriting {} -> {} with id {}",
        source.display(),
        destination.display(),
        guid
    );

    let reader = BufReader::new(File::open(source)?);
    let mut writer = BufWriter::new(File::create(destination)?);

    for line in reader.lines() {
        let line = line?;
        writeln!(writer, "{}", inject_id(&line, guid))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_line_gets_id_field() {
        let line = r#"{"frame": 17, "boxes": []}"#;
        assert_eq!(
            inject_id(line, "clip-001"),
            r#"{"id": "clip-001", "frame": 17, "boxes": []}"#
        );
    }

    #[test]
    fn non_frame_lines_pass_through() {
        for line in [
            r#"{"meta": "header"}"#,
            "plain text",
            "",
            r#"{ "frame": 1}"#, // whitespace after the brace misses the marker
        ] {
            assert_eq!(inject_id(line, "g"), line);
        }
    }

    #[test]
    fn injection_is_reversible_at_the_field_level() {
        let original = r#"{"frame": 3}"#;
        let rewritten = inject_id(original, "g");

        let prefix = r#"{"id": "g", "#;
        let restored = format!("{{{}", rewritten.strip_prefix(prefix).unwrap());
        assert_eq!(restored, original);
    }

    #[test]
    fn distinct_guids_give_distinct_outputs() {
        let line = r#"{"frame": 1}"#;
        assert_ne!(inject_id(line, "a"), inject_id(line, "b"));
    }

    #[test]
    fn rewrites_file_line_by_line() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("out.log");
        let destination = tmp.path().join("outg.log");

        std::fs::write(
            &source,
            "{\"frame\": 1, \"boxes\": []}\nnot json\n{\"frame\": 2}\n",
        )
        .unwrap();

        rewrite_log_file(&source, &destination, "g").unwrap();

        let rewritten = std::fs::read_to_string(&destination).unwrap();
        assert_eq!(
            rewritten,
            "{\"id\": \"g\", \"frame\": 1, \"boxes\": []}\nnot json\n{\"id\": \"g\", \"frame\": 2}\n"
        );
    }

    #[test]
    fn empty_file_rewrites_to_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("out.log");
        let destination = tmp.path().join("outg.log");
        std::fs::write(&source, "").unwrap();

        rewrite_log_file(&source, &destination, "g").unwrap();

        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "");
    }
}
