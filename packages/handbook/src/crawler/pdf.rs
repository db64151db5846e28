//! PDF page text and link-annotation extraction.

use lopdf::{Dictionary, Document as PdfDocument, Object};
use url::Url;

use super::html::strip_fragment;
use crate::error::{CrawlError, CrawlResult};

/// One page of a PDF. `index` is 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    pub index: u32,
    pub text: String,
}

/// What the crawler keeps from one PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPdf {
    pub title: String,
    pub pages: Vec<PdfPage>,
    pub links: Vec<Url>,
}

/// Parse a PDF body. Link URIs are resolved against `base`.
pub fn parse_pdf(body: &[u8], base: &Url) -> CrawlResult<ParsedPdf> {
    let doc = PdfDocument::load_mem(body).map_err(|e| CrawlError::Pdf {
        url: base.to_string(),
        reason: e.to_string(),
    })?;

    let mut pages = Vec::new();
    let mut links = Vec::new();

    for (index, (page_number, page_id)) in doc.get_pages().into_iter().enumerate() {
        let text = match doc.extract_text(&[page_number]) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::debug!(url = %base, page = page_number, error = %e, "No text on PDF page");
                String::new()
            }
        };
        pages.push(PdfPage {
            index: index as u32,
            text,
        });

        if let Ok(page) = doc.get_dictionary(page_id) {
            links.extend(
                annotation_uris(&doc, page)
                    .into_iter()
                    .filter_map(|uri| base.join(uri.trim()).ok())
                    .filter(|url| matches!(url.scheme(), "http" | "https"))
                    .map(strip_fragment),
            );
        }
    }

    Ok(ParsedPdf {
        title: document_title(&doc),
        pages,
        links,
    })
}

/// `/Annots [ << /A << /URI (...) >> >> ]` entries of a page.
fn annotation_uris(doc: &PdfDocument, page: &Dictionary) -> Vec<String> {
    let Some(annots) = page
        .get(b"Annots")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
    else {
        return Vec::new();
    };

    annots
        .iter()
        .filter_map(|annot| resolve(doc, annot)?.as_dict().ok())
        .filter_map(|annot| resolve(doc, annot.get(b"A").ok()?)?.as_dict().ok())
        .filter_map(|action| resolve(doc, action.get(b"URI").ok()?))
        .filter_map(|uri| uri.as_str().ok())
        .map(decode_text)
        .collect()
}

fn document_title(doc: &PdfDocument) -> String {
    doc.trailer
        .get(b"Info")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|info| info.get(b"Title").ok())
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_str().ok())
        .map(decode_text)
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn resolve<'a>(doc: &'a PdfDocument, object: &'a Object) -> Option<&'a Object> {
    doc.dereference(object).ok().map(|(_, o)| o)
}

/// PDF text strings are either UTF-16BE with a BOM or byte strings.
fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Build a small PDF with one Courier text line per page. `link` adds a URI
/// annotation to the first page.
#[cfg(test)]
pub(crate) fn sample_pdf(title: &str, pages: &[&str], link: Option<&str>) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for (index, text) in pages.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        if let (0, Some(uri)) = (index, link) {
            let annot_id = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![72.into(), 700.into(), 300.into(), 730.into()],
                "A" => dictionary! {
                    "S" => "URI",
                    "URI" => Object::string_literal(uri),
                },
            });
            page.set("Annots", vec![Object::Reference(annot_id)]);
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut body = Vec::new();
    doc.save_to(&mut body).unwrap();
    body
}
