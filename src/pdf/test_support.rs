//! Synthetic label documents for unit tests

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

pub fn op(name: &str, operands: Vec<Object>) -> Operation {
    Operation::new(name, operands)
}

pub fn real(value: f32) -> Object {
    Object::Real(value)
}

/// One Letter-size page per entry, all sharing a Helvetica font as `F1`
pub fn pdf_with_pages(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let count = pages.len() as i64;
    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(pages_id, Object::Dictionary(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
    }));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Content showing `text` in 10pt Helvetica with its baseline starting at (x, y)
pub fn text_line(text: &str, x: f32, y: f32) -> Vec<Operation> {
    vec![
        op("BT", vec![]),
        op("Tf", vec![Object::Name(b"F1".to_vec()), real(10.0)]),
        op("Td", vec![real(x), real(y)]),
        op("Tj", vec![Object::string_literal(text)]),
        op("ET", vec![]),
    ]
}

/// Same as [`text_line`] but reading bottom to top
pub fn rotated_line(text: &str, x: f32, y: f32) -> Vec<Operation> {
    vec![
        op("BT", vec![]),
        op("Tf", vec![Object::Name(b"F1".to_vec()), real(10.0)]),
        op("Tm", vec![real(0.0), real(1.0), real(-1.0), real(0.0), real(x), real(y)]),
        op("Tj", vec![Object::string_literal(text)]),
        op("ET", vec![]),
    ]
}

/// Pages of text lines, 40pt apart from the top of the page down
pub fn label_pdf(pages: &[Vec<&str>]) -> Vec<u8> {
    let pages: Vec<Vec<Operation>> = pages
        .iter()
        .map(|lines| {
            lines
                .iter()
                .enumerate()
                .flat_map(|(i, line)| text_line(line, 72.0, 700.0 - 40.0 * i as f32))
                .collect::<Vec<Operation>>()
        })
        .collect();
    pdf_with_pages(pages)
}
