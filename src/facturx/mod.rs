//! Factur-X PDF/A-3 packaging.
//!
//! Embeds CII XML into a PDF as `factur-x.xml` with the XMP packet,
//! output intent and document information PDF/A-3 requires, and reads
//! it back out.
//!
//! # Levels
//!
//! | Level | Use case |
//! |-------|----------|
//! | Minimum | Minimal machine-readable data |
//! | BasicWl | Basic without line items (read only) |
//! | Basic | Line items, EN 16931 core subset |
//! | Comfort | Full EN 16931 |
//! | Extended | Beyond EN 16931 |

mod embed;
mod extract;
mod metadata;
mod render;
mod xmp;

#[cfg(feature = "compliance")]
mod generate;

pub use crate::cii::ConformanceLevel;
pub use embed::{EmbedOutcome, EmbedStatus, embed_xml, try_embed_xml};
pub use extract::{EmbeddedXml, embedded_file_names, extract_xml};
#[cfg(feature = "compliance")]
pub use generate::{BatchItem, FacturxInfo, GeneratedInvoice, generate_batch, generate_facturx, inspect};
pub use metadata::DocumentMetadata;
pub use render::{PdfRenderer, SummaryPdfRenderer};
pub use xmp::build_xmp;

/// The embedded XML filename per Factur-X 1.0+.
pub const FACTURX_FILENAME: &str = "factur-x.xml";

/// Attachment name used by ZUGFeRD 1.x, accepted on read.
pub const ZUGFERD_FILENAME: &str = "ZUGFeRD-invoice.xml";

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{Document, Object, Stream, dictionary};

    /// One empty-ish A4 page.
    pub fn minimal_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => Object::Reference(content_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}
