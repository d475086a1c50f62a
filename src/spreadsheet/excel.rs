//! Office Open XML package helpers
use crate::error::EvidenceSheetError;
use crate::helpers::reader::SourceReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::collections::HashMap;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Relationship type suffixes
pub(crate) const WORKSHEET_RELATIONSHIP: &str = "/worksheet";
pub(crate) const DRAWING_RELATIONSHIP: &str = "/drawing";
pub(crate) const IMAGE_RELATIONSHIP: &str = "/image";

/// Loads the relationships of a package part
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `part` - Path of the part owning the relationships, e.g. `xl/workbook.xml`
/// * `kind` - Relationship type suffix to keep, e.g. `/worksheet`
///
/// # Returns
/// Mapping of relationship IDs to resolved part paths; empty when the part has no relationships
pub(super) fn load_relationships(zip: &mut ZipArchive<SourceReader>, part: &str, kind: &str) -> Result<HashMap<String, String>, EvidenceSheetError> {
    let mut relationships: HashMap<String, String> = HashMap::new();
    let mut reader = match zip.xml_reader(&rels_path_for(part))? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let relationship = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            let is_external = event.get_attribute_value("TargetMode")?
                .map(|mode| mode.eq_ignore_ascii_case("External"))
                .unwrap_or(false);
            if !is_external && relationship.map(|it| it.ends_with(kind)).unwrap_or(false) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), resolve_part_path(part, &target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Path of the relationships part belonging to `part`
///
/// `xl/worksheets/sheet1.xml` becomes `xl/worksheets/_rels/sheet1.xml.rels`
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((directory, file)) => format!("{directory}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the part that references it
///
/// # Arguments
/// * `part` - Path of the referencing part
/// * `target` - Relative (`../media/image1.png`) or absolute (`/xl/workbook.xml`) target
///
/// # Returns
/// Normalized path inside the zip archive
pub(crate) fn resolve_part_path(part: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    if !target.starts_with('/') {
        if let Some((directory, _)) = part.rsplit_once('/') {
            segments.extend(directory.split('/').filter(|segment| !segment.is_empty()));
        }
    }
    for segment in target.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}
