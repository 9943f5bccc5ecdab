//! In-memory PDF fixtures for unit tests.

use lopdf::{dictionary, Document, Object, Stream};

use crate::parser::LopdfBackend;

/// An image XObject to place in a fixture page's resources.
pub(crate) struct FixtureImage {
    name: &'static str,
    width: u32,
    height: u32,
    filter: Option<&'static str>,
    data: Vec<u8>,
}

impl FixtureImage {
    /// DCT-encoded image; the payload is a minimal SOI/EOI marker pair.
    pub(crate) fn jpeg(name: &'static str, width: u32, height: u32) -> Self {
        Self {
            name,
            width,
            height,
            filter: Some("DCTDecode"),
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
        }
    }

    /// Unfiltered 8-bit RGB samples.
    pub(crate) fn rgb(name: &'static str, width: u32, height: u32) -> Self {
        Self {
            name,
            width,
            height,
            filter: None,
            data: vec![0x80; (width * height * 3) as usize],
        }
    }

    fn to_stream(&self) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        if let Some(filter) = self.filter {
            dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
        }
        Stream::new(dict, self.data.clone())
    }
}

/// Stream carrying a `/Filter` lopdf cannot decode.
pub(crate) const UNDECODABLE_FILTER: &str = "RunLengthDecode";

/// A Form XObject placed in a fixture page's resources.
pub(crate) struct FixtureForm {
    name: &'static str,
    content: String,
    filter: Option<&'static str>,
}

impl FixtureForm {
    pub(crate) fn new(name: &'static str, content: &str) -> Self {
        Self {
            name,
            content: content.to_string(),
            filter: None,
        }
    }

    /// Declare a filter on the form stream without encoding its bytes.
    pub(crate) fn with_filter(mut self, filter: &'static str) -> Self {
        self.filter = Some(filter);
        self
    }

    fn to_stream(&self) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        if let Some(filter) = self.filter {
            dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
        }
        Stream::new(dict, self.content.as_bytes().to_vec())
    }
}

/// A one-page Letter document with font `F1` (Helvetica, no widths).
pub(crate) struct FixturePage<'a> {
    content: &'a str,
    content_filter: Option<&'static str>,
    images: &'a [FixtureImage],
    forms: &'a [FixtureForm],
}

impl<'a> FixturePage<'a> {
    pub(crate) fn new(content: &'a str) -> Self {
        Self {
            content,
            content_filter: None,
            images: &[],
            forms: &[],
        }
    }

    pub(crate) fn images(mut self, images: &'a [FixtureImage]) -> Self {
        self.images = images;
        self
    }

    pub(crate) fn forms(mut self, forms: &'a [FixtureForm]) -> Self {
        self.forms = forms;
        self
    }

    /// Declare a filter on the page content stream without encoding it.
    pub(crate) fn content_filter(mut self, filter: &'static str) -> Self {
        self.content_filter = Some(filter);
        self
    }

    pub(crate) fn load(&self) -> LopdfBackend {
        LopdfBackend::load_bytes(&self.to_bytes()).expect("fixture document loads")
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        build_page(self)
    }
}

/// Load [`single_page_bytes`] into a backend.
pub(crate) fn single_page(content: &str, images: &[FixtureImage]) -> LopdfBackend {
    FixturePage::new(content).images(images).load()
}

/// Build a one-page document with the given content and images.
pub(crate) fn single_page_bytes(content: &str, images: &[FixtureImage]) -> Vec<u8> {
    FixturePage::new(content).images(images).to_bytes()
}

fn build_page(page: &FixturePage<'_>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut xobjects = lopdf::Dictionary::new();
    for image in page.images {
        let id = doc.add_object(image.to_stream());
        xobjects.set(image.name, Object::Reference(id));
    }
    for form in page.forms {
        let id = doc.add_object(form.to_stream());
        xobjects.set(form.name, Object::Reference(id));
    }

    let mut content_dict = lopdf::Dictionary::new();
    if let Some(filter) = page.content_filter {
        content_dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    }
    let content_id = doc.add_object(Stream::new(
        content_dict,
        page.content.as_bytes().to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture document serializes");
    bytes
}
