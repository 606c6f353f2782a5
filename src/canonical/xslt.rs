//! Canonicalization through an external XSLT processor

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use csv::Reader;
use log::{debug, info};

use super::records::{parse_records, render_records, write_records_csv};
use super::{Canonicalizer, SourceKind};
use crate::error::{Error, Result};

/// Applies a mapping stylesheet with `<processor> <mapping> -`, rows fed on stdin
#[derive(Debug, Clone)]
pub struct XsltCanonicalizer {
    processor: PathBuf,
}

impl XsltCanonicalizer {
    pub fn new<P: Into<PathBuf>>(processor: P) -> Self {
        Self { processor: processor.into() }
    }
}

impl Canonicalizer for XsltCanonicalizer {
    fn canonicalize(
        &self,
        kind: SourceKind,
        source: &Path,
        mapping: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut reader = Reader::from_path(source)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for result in reader.records() {
            rows.push(result?);
        }
        let document = render_records(&headers, &rows)?;
        debug!("Rendered {} {} rows ({} bytes)", rows.len(), kind, document.len());

        let mut child = Command::new(&self.processor)
            .arg(mapping)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        // Feed stdin from its own thread so a large output can't stall the pipe
        let feeder = child
            .stdin
            .take()
            .map(|mut stdin| thread::spawn(move || stdin.write_all(document.as_bytes())));

        let out = child.wait_with_output()?;
        let fed = match feeder {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked"))),
            None => Ok(()),
        };

        if !out.status.success() {
            return Err(Error::Transform { kind, status: out.status });
        }
        fed?;

        let xml = String::from_utf8(out.stdout)
            .map_err(|e| Error::MalformedRecords(format!("non UTF-8 output: {}", e)))?;
        let records = parse_records(&xml)?;
        write_records_csv(output, &records)?;

        info!(
            "Canonicalized {} {} rows: {} -> {}",
            records.len(),
            kind,
            source.display(),
            output.display()
        );
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    /// Shell script standing in for the XSLT processor
    fn fake_processor(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-xslt");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_xslt_canonicalize_through_processor() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("location.csv");
        let mapping = dir.path().join("map.xslt");
        let output = dir.path().join("canexp.csv");
        fs::write(&source, "LocNumber,BuildingTIV\n1,1000\n2,2500\n").unwrap();
        fs::write(&mapping, "").unwrap();

        let processor = fake_processor(dir.path(), "exec sed -e 's/LocNumber=/LOCNUM=/g'");
        XsltCanonicalizer::new(processor)
            .canonicalize(SourceKind::Exposures, &source, &mapping, &output)
            .unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "LOCNUM,BuildingTIV\n1,1000\n2,2500\n"
        );
    }

    #[test]
    fn test_xslt_processor_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("account.csv");
        fs::write(&source, "AccNumber\nA1\n").unwrap();

        let processor = fake_processor(dir.path(), "cat > /dev/null; exit 3");
        let result = XsltCanonicalizer::new(processor).canonicalize(
            SourceKind::Accounts,
            &source,
            &dir.path().join("map.xslt"),
            &dir.path().join("canacc.csv"),
        );

        assert!(matches!(
            result,
            Err(Error::Transform { kind: SourceKind::Accounts, .. })
        ));
        assert!(!dir.path().join("canacc.csv").exists());
    }
}
