//! Streaming workflow XML parser
//!
//! Validates that an uploaded payload is a well-formed XML document rooted
//! at a `job` element and extracts the metadata the catalog indexes: the
//! mandatory `name` and `projectName` attributes, job-level variables and
//! job-level generic-information entries. Task-level variables (nested
//! deeper than the job element) are deliberately ignored. Namespaces are
//! handled by matching on local names only.

use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::domain::workflow::{KeyValue, ParsedWorkflow};
use crate::domain::DomainError;

/// Section of the job document the cursor is currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Variables,
    GenericInformation,
}

#[derive(Debug, Default)]
struct ParserState {
    root_seen: bool,
    root_closed: bool,
    name: Option<String>,
    project_name: Option<String>,
    variables: Vec<KeyValue>,
    generic_information: Vec<KeyValue>,
}

/// Parse a workflow XML document, returning the extracted metadata
pub fn parse_workflow(payload: &[u8]) -> Result<ParsedWorkflow, DomainError> {
    let mut reader = Reader::from_reader(payload);
    reader.config_mut().check_end_names = true;

    let mut state = ParserState::default();
    let mut section = Section::None;
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => {
                handle_open(&element, depth, &mut section, &mut state)?;
                depth += 1;
            }
            Ok(Event::Empty(element)) => {
                handle_open(&element, depth, &mut section, &mut state)?;
                // Self-closing section elements hold no entries
                if depth == 1 {
                    section = Section::None;
                }
                if depth == 0 {
                    state.root_closed = true;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    DomainError::invalid_xml(format!(
                        "Unexpected closing tag at position {}",
                        reader.buffer_position()
                    ))
                })?;

                if depth == 1 {
                    section = Section::None;
                }
                if depth == 0 {
                    state.root_closed = true;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DomainError::invalid_xml(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                )));
            }
        }

        buf.clear();
    }

    if !state.root_seen {
        return Err(DomainError::invalid_xml("Document has no root element"));
    }

    if depth != 0 || !state.root_closed {
        return Err(DomainError::invalid_xml(
            "Unexpected end of document: unclosed elements remain",
        ));
    }

    let name = state
        .name
        .ok_or_else(|| DomainError::invalid_xml("Missing mandatory 'name' attribute on the job element"))?;

    let project_name = state.project_name.ok_or_else(|| {
        DomainError::invalid_xml("Missing mandatory 'projectName' attribute on the job element")
    })?;

    Ok(ParsedWorkflow {
        name,
        project_name,
        generic_information: state.generic_information,
        variables: state.variables,
    })
}

fn handle_open(
    element: &BytesStart<'_>,
    depth: usize,
    section: &mut Section,
    state: &mut ParserState,
) -> Result<(), DomainError> {
    let local_name = element.local_name();

    match depth {
        0 => {
            if state.root_seen {
                return Err(DomainError::invalid_xml(
                    "Document has more than one root element",
                ));
            }

            if local_name.as_ref() != b"job" {
                return Err(DomainError::invalid_xml(format!(
                    "Root element must be 'job', found '{}'",
                    String::from_utf8_lossy(local_name.as_ref())
                )));
            }

            state.root_seen = true;
            state.name = attribute_value(element, b"name")?;
            state.project_name = attribute_value(element, b"projectName")?;
        }
        1 => match local_name.as_ref() {
            b"variables" => *section = Section::Variables,
            b"genericInformation" => *section = Section::GenericInformation,
            _ => {}
        },
        2 => match (*section, local_name.as_ref()) {
            (Section::Variables, b"variable") => {
                state.variables.push(read_entry(element)?);
            }
            (Section::GenericInformation, b"info") => {
                state.generic_information.push(read_entry(element)?);
            }
            _ => {}
        },
        _ => {}
    }

    Ok(())
}

/// Read a key/value entry from an element's name/value attributes
fn read_entry(element: &BytesStart<'_>) -> Result<KeyValue, DomainError> {
    let name = attribute_value(element, b"name")?.ok_or_else(|| {
        DomainError::invalid_xml(format!(
            "Missing 'name' attribute on '{}' element",
            String::from_utf8_lossy(element.local_name().as_ref())
        ))
    })?;

    let value = attribute_value(element, b"value")?.unwrap_or_default();

    Ok(KeyValue::new(name, value))
}

fn attribute_value(
    element: &BytesStart<'_>,
    name: &[u8],
) -> Result<Option<String>, DomainError> {
    for attribute in element.attributes() {
        let attribute = attribute
            .map_err(|e| DomainError::invalid_xml(format!("Malformed attribute: {}", e)))?;

        if attribute.key.local_name().as_ref() == name {
            let value = attribute
                .unescape_value()
                .map_err(|e| DomainError::invalid_xml(format!("Malformed attribute value: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }

    Ok(None)
}
