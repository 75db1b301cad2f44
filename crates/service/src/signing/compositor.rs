use image::{ImageFormat, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;
use tracing::debug;

/// US Letter width in points, used when no MediaBox can be resolved.
const DEFAULT_PAGE_WIDTH: f32 = 612.0;
/// Bound on the `Parent` chain walked while resolving inherited page attributes.
const MAX_PAGE_TREE_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("invalid signature image: {0}")]
    InvalidSignature(String),
    #[error("invalid PDF document: {0}")]
    InvalidDocument(String),
    #[error("document has no pages")]
    NoPages,
}

/// Overlays a signature image onto a document, producing the signed bytes.
/// Implementations are CPU-bound and synchronous.
pub trait SignatureCompositor: Send + Sync {
    fn compose(&self, document: &[u8], signature_png: &[u8]) -> Result<Vec<u8>, SignError>;
}

/// Where the signature lands on the first page, in PDF points.
/// `x` is measured back from the right edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub from_right: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            from_right: 250.0,
            bottom: 50.0,
            width: 200.0,
            height: 100.0,
        }
    }
}

impl Placement {
    /// Lower-left corner for a page `page_width` points wide, clamped to the page.
    pub fn origin(&self, page_width: f32) -> (f32, f32) {
        ((page_width - self.from_right).max(0.0), self.bottom)
    }
}

/// Draws a PNG signature on the first page of a PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfSignatureCompositor {
    placement: Placement,
}

impl PdfSignatureCompositor {
    pub fn new(placement: Placement) -> Self {
        Self { placement }
    }
}

impl SignatureCompositor for PdfSignatureCompositor {
    fn compose(&self, document: &[u8], signature_png: &[u8]) -> Result<Vec<u8>, SignError> {
        let signature = image::load_from_memory_with_format(signature_png, ImageFormat::Png)
            .map_err(|e| SignError::InvalidSignature(e.to_string()))?
            .to_rgba8();

        let mut doc = Document::load_mem(document).map_err(invalid_document)?;
        let page_id = *doc.get_pages().values().next().ok_or(SignError::NoPages)?;
        let (x, y) = self.placement.origin(page_width(&doc, page_id));

        materialize_resources(&mut doc, page_id)?;
        let image_id = add_signature_image(&mut doc, &signature);
        let image_name = format!("Sig{}", image_id.0);
        doc.add_xobject(page_id, image_name.as_bytes(), image_id)
            .map_err(invalid_document)?;

        let mut content = doc.get_and_decode_page_content(page_id).map_err(invalid_document)?;
        // isolate the existing drawing so its graphics state cannot leak into ours
        content.operations.insert(0, Operation::new("q", vec![]));
        content.operations.push(Operation::new("Q", vec![]));
        content.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    self.placement.width.into(),
                    0.0f32.into(),
                    0.0f32.into(),
                    self.placement.height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        set_page_content(&mut doc, page_id, content)?;

        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(invalid_document)?;
        debug!(
            x,
            y,
            width = signature.width(),
            height = signature.height(),
            bytes = out.len(),
            "signature composed"
        );
        Ok(out)
    }
}

fn invalid_document(err: impl std::fmt::Display) -> SignError {
    SignError::InvalidDocument(err.to_string())
}

/// Embed the RGB channels as an image XObject with the alpha channel as its
/// soft mask, so transparent signature pixels stay transparent.
fn add_signature_image(doc: &mut Document, signature: &RgbaImage) -> ObjectId {
    let (width, height) = signature.dimensions();
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    let mut alpha = Vec::with_capacity(width as usize * height as usize);
    for px in signature.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }

    let mut mask = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    );
    let _ = mask.compress();
    let mask_id = doc.add_object(mask);

    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => mask_id,
        },
        rgb,
    );
    let _ = image.compress();
    doc.add_object(image)
}

fn set_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Content,
) -> Result<(), SignError> {
    let encoded = content.encode().map_err(invalid_document)?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(invalid_document)?
        .set("Contents", content_id);
    Ok(())
}

/// Look `key` up on the page, then along its `Parent` chain.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let dict = doc.get_object(current?).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok(),
                direct => Some(direct),
            };
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Give the page its own copy of inherited Resources. Adding the signature
/// XObject creates a page-level dictionary, which would otherwise hide the
/// fonts and graphics states defined on the page tree.
fn materialize_resources(doc: &mut Document, page_id: ObjectId) -> Result<(), SignError> {
    let page = doc.get_object(page_id).and_then(Object::as_dict).map_err(invalid_document)?;
    if page.has(b"Resources") {
        return Ok(());
    }
    let Some(resources) = inherited(doc, page_id, b"Resources").cloned() else {
        return Ok(());
    };
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(invalid_document)?
        .set("Resources", resources);
    Ok(())
}

fn page_width(doc: &Document, page_id: ObjectId) -> f32 {
    if let Some(Object::Array(media_box)) = inherited(doc, page_id, b"MediaBox") {
        if let [x0, _, x1, _] = media_box.as_slice() {
            if let (Some(x0), Some(x1)) = (number(x0), number(x1)) {
                return (x1 - x0).abs();
            }
        }
    }
    DEFAULT_PAGE_WIDTH
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}
