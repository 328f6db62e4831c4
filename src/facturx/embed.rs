use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::FACTURX_FILENAME;
use super::metadata::DocumentMetadata;
use super::xmp;
use crate::cii::ConformanceLevel;
use crate::core::FacturxError;

/// Whether the XML made it into the PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EmbedStatus {
    Embedded,
    /// The PDF could not be modified; the original bytes were returned.
    Degraded { reason: String },
}

/// Result of [`embed_xml`]: always carries usable PDF bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedOutcome {
    pub pdf: Vec<u8>,
    pub status: EmbedStatus,
}

impl EmbedOutcome {
    pub fn is_embedded(&self) -> bool {
        matches!(self.status, EmbedStatus::Embedded)
    }
}

/// Attach `xml` to `pdf_bytes` as `factur-x.xml`, best effort.
///
/// On any PDF library failure the original bytes come back unchanged with
/// [`EmbedStatus::Degraded`]. Use [`try_embed_xml`] to get the error instead.
pub fn embed_xml(
    pdf_bytes: &[u8],
    xml: &str,
    level: ConformanceLevel,
    meta: &DocumentMetadata,
) -> EmbedOutcome {
    match try_embed_xml(pdf_bytes, xml, level, meta) {
        Ok(pdf) => EmbedOutcome {
            pdf,
            status: EmbedStatus::Embedded,
        },
        Err(e) => {
            warn!(error = %e, "embedding failed, returning the original PDF");
            EmbedOutcome {
                pdf: pdf_bytes.to_vec(),
                status: EmbedStatus::Degraded {
                    reason: e.to_string(),
                },
            }
        }
    }
}

/// Attach `xml` to `pdf_bytes`, failing with [`FacturxError::Packaging`].
pub fn try_embed_xml(
    pdf_bytes: &[u8],
    xml: &str,
    level: ConformanceLevel,
    meta: &DocumentMetadata,
) -> Result<Vec<u8>, FacturxError> {
    let mut doc = Document::load_mem(pdf_bytes)
        .map_err(|e| FacturxError::Packaging(format!("failed to load PDF: {e}")))?;
    if doc.get_pages().is_empty() {
        return Err(FacturxError::Packaging("PDF has no pages".into()));
    }

    embed_into_document(&mut doc, xml.as_bytes(), level, meta)?;

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| FacturxError::Packaging(format!("failed to save PDF: {e}")))?;
    debug!(
        input = pdf_bytes.len(),
        output = output.len(),
        level = %level,
        "embedded Factur-X XML"
    );
    Ok(output)
}

fn embed_into_document(
    doc: &mut Document,
    xml_bytes: &[u8],
    level: ConformanceLevel,
    meta: &DocumentMetadata,
) -> Result<(), FacturxError> {
    // PDF/A-3 is based on PDF 1.7
    doc.version = "1.7".to_string();

    let ef_stream = Stream::new(
        dictionary! {
            "Type" => "EmbeddedFile",
            "Subtype" => Object::Name(b"text/xml".to_vec()),
            "Params" => dictionary! {
                "Size" => Object::Integer(xml_bytes.len() as i64),
            },
        },
        xml_bytes.to_vec(),
    );
    let ef_stream_id = doc.add_object(ef_stream);

    let filespec_id = doc.add_object(dictionary! {
        "Type" => "Filespec",
        "F" => Object::string_literal(FACTURX_FILENAME),
        "UF" => Object::string_literal(FACTURX_FILENAME),
        "Desc" => Object::string_literal("Factur-X XML invoice"),
        "AFRelationship" => Object::Name(level.af_relationship().as_bytes().to_vec()),
        "EF" => dictionary! {
            "F" => Object::Reference(ef_stream_id),
            "UF" => Object::Reference(ef_stream_id),
        },
    });

    let ef_name_tree_id = doc.add_object(dictionary! {
        "Names" => Object::Array(vec![
            Object::string_literal(FACTURX_FILENAME),
            Object::Reference(filespec_id),
        ]),
    });

    // Keep any other name trees (Dests, JavaScript...) the source PDF had.
    let mut names = existing_names(doc);
    names.set("EmbeddedFiles", Object::Reference(ef_name_tree_id));
    let names_id = doc.add_object(names);

    let metadata_stream = Stream::new(
        dictionary! {
            "Type" => "Metadata",
            "Subtype" => "XML",
        },
        xmp::build_xmp(level, meta).into_bytes(),
    )
    .with_compression(false);
    let metadata_id = doc.add_object(metadata_stream);

    let output_intent_id = doc.add_object(dictionary! {
        "Type" => "OutputIntent",
        "S" => "GTS_PDFA1",
        "OutputConditionIdentifier" => Object::string_literal("sRGB IEC61966-2.1"),
        "Info" => Object::string_literal("sRGB IEC61966-2.1"),
    });

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(meta.title.as_str()),
        "Subject" => Object::string_literal(meta.subject.as_str()),
        "Creator" => Object::string_literal(meta.creator.as_str()),
        "Producer" => Object::string_literal(meta.producer.as_str()),
        "Keywords" => Object::string_literal(meta.keywords.as_str()),
    });
    doc.trailer.set("Info", Object::Reference(info_id));

    let catalog = doc
        .catalog_mut()
        .map_err(|e| FacturxError::Packaging(format!("failed to get catalog: {e}")))?;
    catalog.set("AF", Object::Array(vec![Object::Reference(filespec_id)]));
    catalog.set("Names", Object::Reference(names_id));
    catalog.set("Metadata", Object::Reference(metadata_id));
    catalog.set(
        "OutputIntents",
        Object::Array(vec![Object::Reference(output_intent_id)]),
    );
    catalog.set("MarkInfo", dictionary! { "Marked" => Object::Boolean(true) });

    Ok(())
}

fn existing_names(doc: &Document) -> Dictionary {
    let Ok(catalog) = doc.catalog() else {
        return Dictionary::new();
    };
    match catalog.get(b"Names") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_default(),
        Ok(Object::Dictionary(d)) => d.clone(),
        _ => Dictionary::new(),
    }
}
