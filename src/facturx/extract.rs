use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use super::{FACTURX_FILENAME, ZUGFERD_FILENAME};

/// An XML attachment recovered from a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedXml {
    pub filename: String,
    pub content: Vec<u8>,
}

impl EmbeddedXml {
    /// The content as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

const MAX_NAME_TREE_DEPTH: usize = 8;

/// Recover the Factur-X XML from a PDF.
///
/// Looks for `factur-x.xml` (or the older `ZUGFeRD-invoice.xml`, compared
/// case-insensitively) in the EmbeddedFiles name tree and then in the
/// catalog `AF` array. Returns `None` for unreadable input as well as for
/// PDFs without the attachment.
pub fn extract_xml(pdf_bytes: &[u8]) -> Option<EmbeddedXml> {
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, "cannot load PDF for extraction");
            return None;
        }
    };
    let found = embedded_file_specs(&doc)
        .into_iter()
        .find(|(name, _)| is_facturx_filename(name))
        .and_then(|(filename, spec)| {
            let content = file_content(&doc, spec)?;
            Some(EmbeddedXml { filename, content })
        });
    debug!(found = found.is_some(), "searched PDF for Factur-X XML");
    found
}

/// Names of all files attached to the PDF, in name-tree order.
pub fn embedded_file_names(pdf_bytes: &[u8]) -> Vec<String> {
    Document::load_mem(pdf_bytes)
        .map(|doc| {
            embedded_file_specs(&doc)
                .into_iter()
                .map(|(name, _)| name)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn is_facturx_filename(name: &str) -> bool {
    name.eq_ignore_ascii_case(FACTURX_FILENAME) || name.eq_ignore_ascii_case(ZUGFERD_FILENAME)
}

/// (filename, file specification) pairs from the name tree, then the AF array.
fn embedded_file_specs(doc: &Document) -> Vec<(String, &Dictionary)> {
    let mut out = Vec::new();
    let Ok(catalog) = doc.catalog() else {
        return out;
    };

    if let Some(tree) = catalog
        .get(b"Names")
        .ok()
        .and_then(|n| resolve_dict(doc, n))
        .and_then(|names| names.get(b"EmbeddedFiles").ok())
        .and_then(|ef| resolve_dict(doc, ef))
    {
        walk_name_tree(doc, tree, 0, &mut out);
    }

    if let Some(af) = catalog
        .get(b"AF")
        .ok()
        .and_then(|a| resolve_obj(doc, a))
        .and_then(|a| a.as_array().ok())
    {
        for obj in af {
            let Some(spec) = resolve_dict(doc, obj) else {
                continue;
            };
            let name = spec
                .get(b"UF")
                .or_else(|_| spec.get(b"F"))
                .ok()
                .and_then(decode_pdf_string);
            if let Some(name) = name {
                if !out.iter().any(|(n, _)| n == &name) {
                    out.push((name, spec));
                }
            }
        }
    }
    out
}

fn walk_name_tree<'a>(
    doc: &'a Document,
    node: &'a Dictionary,
    depth: usize,
    out: &mut Vec<(String, &'a Dictionary)>,
) {
    if depth > MAX_NAME_TREE_DEPTH {
        return;
    }
    if let Ok(names) = node.get(b"Names").and_then(Object::as_array) {
        // [name1, spec1, name2, spec2, ...]
        for pair in names.chunks_exact(2) {
            if let (Some(name), Some(spec)) = (decode_pdf_string(&pair[0]), resolve_dict(doc, &pair[1])) {
                out.push((name, spec));
            }
        }
    }
    if let Ok(kids) = node.get(b"Kids").and_then(Object::as_array) {
        for kid in kids {
            if let Some(kid) = resolve_dict(doc, kid) {
                walk_name_tree(doc, kid, depth + 1, out);
            }
        }
    }
}

fn file_content(doc: &Document, spec: &Dictionary) -> Option<Vec<u8>> {
    let ef = spec.get(b"EF").ok().and_then(|ef| resolve_dict(doc, ef))?;
    let f = ef.get(b"UF").or_else(|_| ef.get(b"F")).ok()?;
    let stream = resolve_obj(doc, f)?.as_stream().ok()?;
    // decompressed_content() fails without a Filter entry
    Some(
        stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()),
    )
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

fn resolve_obj<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// PDF text strings are either UTF-16BE with a BOM or single-byte.
fn decode_pdf_string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16(&units).ok();
    }
    Some(String::from_utf8_lossy(bytes).into_owned())
}
