//! Small generated PDF documents for tests.

use lopdf::{dictionary, Document, Object, Stream};

/// A letter-sized document with `page_count` empty pages.
pub fn sample_pdf(page_count: u32) -> Vec<u8> {
    sample_pdf_with_size(page_count, 612, 792)
}

/// A document whose pages all share the given media box, in points.
pub fn sample_pdf_with_size(page_count: u32, width_pt: u32, height_pt: u32) -> Vec<u8> {
    build(page_count, width_pt, height_pt, None).save()
}

/// A single page whose content stream is `content`, e.g. `0 g 0 0 10 10 re f`.
pub fn pdf_with_content(width_pt: u32, height_pt: u32, content: &str) -> Vec<u8> {
    build(1, width_pt, height_pt, Some(content)).save()
}

/// A one-page document whose trailer points at a standard security handler.
pub fn encrypted_pdf() -> Vec<u8> {
    let mut fixture = build(1, 612, 792, None);
    let encrypt_id = fixture.doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1_i64,
        "R" => 2_i64,
        "P" => -44_i64,
        "O" => Object::string_literal(vec![0_u8; 32]),
        "U" => Object::string_literal(vec![0_u8; 32]),
    });
    fixture.doc.trailer.set("Encrypt", encrypt_id);
    fixture.save()
}

struct Fixture {
    doc: Document,
}

impl Fixture {
    fn save(mut self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes).expect("generated document should serialize");
        bytes
    }
}

fn build(page_count: u32, width_pt: u32, height_pt: u32, content: Option<&str>) -> Fixture {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let media_box: Vec<Object> =
        vec![0_i64.into(), 0_i64.into(), i64::from(width_pt).into(), i64::from(height_pt).into()];

    let kids: Vec<Object> = (0..page_count)
        .map(|_| {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box.clone(),
            };
            if let Some(content) = content {
                let stream = Stream::new(dictionary! {}, content.as_bytes().to_vec());
                page.set("Contents", doc.add_object(stream));
            }
            doc.add_object(page).into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(page_count),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Fixture { doc }
}
