use std::collections::BTreeMap;

use log::warn;
use lopdf::{content::Content, Object};

use crate::{Annotation, LayoutError};

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

// ---------------------------------------------------------------------------
// Content-stream values
// ---------------------------------------------------------------------------

/// A lopdf-independent representation of a content-stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// The first `n` operands as numbers, or `None` if any is missing or
    /// non-numeric.
    pub fn numbers<const N: usize>(&self) -> Option<[f32; N]> {
        let mut out = [0.0; N];
        for (slot, operand) in out.iter_mut().zip(self.operands.iter()) {
            *slot = get_number_from_value(operand)?;
        }
        (self.operands.len() >= N).then_some(out)
    }
}

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Stream objects keep only their dictionary.
impl From<&Object> for PdfValue {
    fn from(obj: &Object) -> Self {
        match obj {
            Object::Null => Self::Null,
            Object::Boolean(flag) => Self::Bool(*flag),
            Object::Integer(n) => Self::Integer(*n),
            Object::Real(n) => Self::Real(*n),
            Object::Name(name) => Self::Name(name.clone()),
            Object::String(bytes, _) => Self::Str(bytes.clone()),
            Object::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            Object::Dictionary(dict) => Self::from_dict(dict),
            Object::Stream(stream) => Self::from_dict(&stream.dict),
            Object::Reference(id) => Self::Reference(*id),
        }
    }
}

impl PdfValue {
    fn from_dict(dict: &lopdf::Dictionary) -> Self {
        Self::Dict(
            dict.iter()
                .map(|(key, value)| (key.clone(), Self::from(value)))
                .collect(),
        )
    }
}

/// Big-endian UTF-16 code units; a trailing odd byte is ignored.
fn utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Best-effort decoding of raw PDF string bytes.
///
/// UTF-16BE with a BOM is decoded as such, valid UTF-8 is taken as-is and
/// anything else is read as Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return utf16be(payload);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().copied().map(char::from).collect(),
    }
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Everything the content walker needs from a PDF parser.
///
/// The walker only talks to this trait, so it can be driven by a mock in
/// tests.
pub trait PdfBackend {
    /// Mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Page `(width, height)` in PDF units.
    fn page_size(&self, page: PageId) -> Result<(f32, f32), LayoutError>;

    /// Raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, LayoutError>;

    /// Decode content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, LayoutError>;

    /// Decode the bytes of a text-showing operand for the given font key.
    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String;

    /// Link annotations carrying a URI action.
    fn page_annotations(&self, page: PageId) -> Result<Vec<Annotation>, LayoutError>;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// [`PdfBackend`] backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, LayoutError> {
        let doc =
            lopdf::Document::load_mem(data).map_err(|e| LayoutError::Decode(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(LayoutError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    // -- private helpers ----------------------------------------------------

    fn page_dict(&self, page: PageId) -> Result<&lopdf::Dictionary, LayoutError> {
        self.doc
            .get_object(page)
            .and_then(|obj| obj.as_dict())
            .map_err(|e| LayoutError::Decode(format!("page {page:?} is not a dictionary: {e}")))
    }

    /// The page's MediaBox, or the nearest ancestor's.
    fn find_media_box(&self, dict: &lopdf::Dictionary) -> Option<Vec<Object>> {
        if let Some(found) = dict.get(b"MediaBox").ok().and_then(|o| self.resolve_array(o)) {
            return Some(found);
        }

        let parent = dict
            .get(b"Parent")
            .ok()
            .and_then(|o| o.as_reference().ok())
            .and_then(|id| self.doc.get_object(id).ok())
            .and_then(|o| o.as_dict().ok())?;
        self.find_media_box(parent)
    }

    /// Follow one reference, if `obj` is one.
    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            direct => Some(direct),
        }
    }

    fn resolve_array(&self, obj: &Object) -> Option<Vec<Object>> {
        self.resolve(obj)?.as_array().ok().cloned()
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a lopdf::Dictionary> {
        self.resolve(obj)?.as_dict().ok()
    }

    /// Numeric array entries, each possibly indirect.
    fn numbers(&self, objects: &[Object]) -> Result<Vec<f32>, LayoutError> {
        objects
            .iter()
            .map(|obj| match self.resolve(obj) {
                Some(Object::Integer(n)) => Ok(*n as f32),
                Some(Object::Real(n)) => Ok(*n),
                other => Err(LayoutError::Decode(format!("not a number: {other:?}"))),
            })
            .collect()
    }

    /// Build an [`Annotation`] from an annotation dictionary with a URI action.
    fn link_annotation(&self, dict: &lopdf::Dictionary) -> Option<Annotation> {
        let action = dict.get(b"A").ok().and_then(|o| self.resolve_dict(o))?;
        if action.get(b"S").ok()?.as_name().ok()? != b"URI" {
            return None;
        }
        let url = match action.get(b"URI").ok()? {
            Object::String(bytes, _) => decode_text_simple(bytes),
            _ => return None,
        };

        let rect = dict.get(b"Rect").ok().and_then(|o| self.resolve_array(o))?;
        match self.numbers(&rect) {
            Ok(nums) if nums.len() >= 4 => Some(Annotation {
                url,
                rect: [nums[0], nums[1], nums[2], nums[3]],
            }),
            _ => {
                warn!("skipping link annotation with malformed Rect: {url}");
                None
            }
        }
    }

    fn font_encoding_name(&self, page: PageId, font_key: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        let font_dict = fonts.get(font_key)?;
        match font_dict.get(b"Encoding").ok()? {
            Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    /// MediaBox is `[llx, lly, urx, ury]`, inherited through `Parent` when
    /// the page does not carry its own.
    fn page_size(&self, page: PageId) -> Result<(f32, f32), LayoutError> {
        let media_box = self
            .find_media_box(self.page_dict(page)?)
            .ok_or_else(|| LayoutError::Decode(format!("MediaBox not found for page {page:?}")))?;

        let corners = self.numbers(&media_box)?;
        match corners.as_slice() {
            [llx, lly, urx, ury, ..] => Ok((urx - llx, ury - lly)),
            short => Err(LayoutError::Decode(format!(
                "MediaBox for page {page:?} has only {} entries",
                short.len()
            ))),
        }
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, LayoutError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| LayoutError::Decode(format!("no content for page {page:?}: {e}")))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, LayoutError> {
        let content = Content::decode(data)
            .map_err(|e| LayoutError::Decode(format!("bad content stream: {e}")))?;

        Ok(content
            .operations
            .into_iter()
            .map(|operation| ContentOp {
                operands: operation.operands.iter().map(PdfValue::from).collect(),
                operator: operation.operator,
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String {
        // Identity-H / Identity-V fonts usually carry 2-byte codes that are
        // Unicode code units.
        let identity = self
            .font_encoding_name(page, font_key)
            .is_some_and(|enc| enc.contains("Identity"));
        if identity && !bytes.is_empty() && bytes.len() % 2 == 0 {
            let decoded = utf16be(bytes);
            if decoded.chars().any(|c| c != '\u{FFFD}' && c != '\0') {
                return decoded;
            }
        }

        decode_text_simple(bytes)
    }

    fn page_annotations(&self, page: PageId) -> Result<Vec<Annotation>, LayoutError> {
        let page_dict = self.page_dict(page)?;
        let Some(annots) = page_dict.get(b"Annots").ok().and_then(|o| self.resolve_array(o))
        else {
            return Ok(vec![]);
        };

        Ok(annots
            .iter()
            .filter_map(|obj| self.resolve_dict(obj))
            .filter_map(|dict| self.link_annotation(dict))
            .collect())
    }
}
