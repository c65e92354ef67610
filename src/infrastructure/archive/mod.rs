//! ZIP archive packing and unpacking for bulk workflow import/export

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::domain::DomainError;

/// One file extracted from an uploaded archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: Bytes,
}

/// Unpack an uploaded archive, keeping only its XML entries
///
/// Directories and non-XML files are skipped; an archive that yields no XML
/// entry at all is rejected, since the import would otherwise silently
/// create nothing.
pub fn extract_xml_entries(archive: &[u8]) -> Result<Vec<ArchiveEntry>, DomainError> {
    let mut archive = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| DomainError::invalid_xml(format!("Unreadable ZIP archive: {}", e)))?;

    let mut entries = Vec::new();

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| DomainError::invalid_xml(format!("Unreadable ZIP entry: {}", e)))?;

        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();

        if !name.to_ascii_lowercase().ends_with(".xml") {
            continue;
        }

        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content).map_err(|e| {
            DomainError::invalid_xml(format!("Failed to read ZIP entry '{}': {}", name, e))
        })?;

        entries.push(ArchiveEntry {
            name,
            content: Bytes::from(content),
        });
    }

    if entries.is_empty() {
        return Err(DomainError::invalid_xml(
            "ZIP archive contains no XML entries",
        ));
    }

    Ok(entries)
}

/// A workflow payload to pack into an export archive
#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub workflow_id: i64,
    pub name: String,
    pub content: Bytes,
}

/// Pack workflow payloads into a ZIP archive
///
/// Entries are named `<workflow name>.xml`; when two workflows share a name
/// the workflow id is appended so no entry overwrites another.
pub fn build_archive(entries: &[ExportEntry]) -> Result<Bytes, DomainError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut used_names: HashSet<String> = HashSet::new();

    for entry in entries {
        let base = sanitize_entry_name(&entry.name);
        let mut file_name = format!("{}.xml", base);

        if !used_names.insert(file_name.clone()) {
            file_name = format!("{}_{}.xml", base, entry.workflow_id);
            used_names.insert(file_name.clone());
        }

        writer
            .start_file(&file_name, options)
            .map_err(|e| DomainError::internal(format!("Failed to add archive entry: {}", e)))?;
        writer
            .write_all(&entry.content)
            .map_err(|e| DomainError::internal(format!("Failed to write archive entry: {}", e)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| DomainError::internal(format!("Failed to finish archive: {}", e)))?;

    Ok(Bytes::from(cursor.into_inner()))
}

/// Replace path separators and control characters so entry names stay flat
fn sanitize_entry_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        format!("workflow-{}", uuid::Uuid::new_v4())
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive_with(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_xml_entries() {
        let archive = archive_with(&[
            ("flow1.xml", b"<job name=\"F1\" projectName=\"P\"/>"),
            ("readme.txt", b"not a workflow"),
            ("flow2.XML", b"<job name=\"F2\" projectName=\"P\"/>"),
        ]);

        let entries = extract_xml_entries(&archive).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "flow1.xml");
        assert_eq!(entries[1].name, "flow2.XML");
    }

    #[test]
    fn test_extract_rejects_archive_without_xml() {
        let archive = archive_with(&[("readme.txt", b"nothing here")]);
        let err = extract_xml_entries(&archive).unwrap_err();
        assert!(err.to_string().contains("no XML entries"));
    }

    #[test]
    fn test_extract_rejects_garbage_bytes() {
        let err = extract_xml_entries(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, DomainError::InvalidXml { .. }));
    }

    #[test]
    fn test_build_and_extract_round_trip() {
        let payload: &[u8] = b"<job name=\"Flow1\" projectName=\"P\"/>";
        let archive = build_archive(&[ExportEntry {
            workflow_id: 1,
            name: "Flow1".to_string(),
            content: Bytes::from_static(payload),
        }])
        .unwrap();

        let entries = extract_xml_entries(&archive).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Flow1.xml");
        assert_eq!(entries[0].content.as_ref(), payload);
    }

    #[test]
    fn test_duplicate_names_get_id_suffix() {
        let entries = vec![
            ExportEntry {
                workflow_id: 1,
                name: "Flow".to_string(),
                content: Bytes::from_static(b"<job/>"),
            },
            ExportEntry {
                workflow_id: 2,
                name: "Flow".to_string(),
                content: Bytes::from_static(b"<job/>"),
            },
        ];

        let archive = build_archive(&entries).unwrap();
        let extracted = extract_xml_entries(&archive).unwrap();

        let names: Vec<&str> = extracted.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Flow.xml", "Flow_2.xml"]);
    }

    #[test]
    fn test_entry_names_are_sanitized() {
        let archive = build_archive(&[ExportEntry {
            workflow_id: 1,
            name: "a/b\\c".to_string(),
            content: Bytes::from_static(b"<job/>"),
        }])
        .unwrap();

        let extracted = extract_xml_entries(&archive).unwrap();
        assert_eq!(extracted[0].name, "a_b_c.xml");
    }
}
