//! Page dictionary lookups shared by the locator and the rewriter

use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::{Error, Result};

/// Limit for Parent chains and reference hops, guards against cycles
const MAX_DEPTH: usize = 32;

/// Follow references until a direct object is reached
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    let mut current = object;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

/// Look up a key in a dictionary and resolve the value
pub(crate) fn get_resolved<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

/// Numeric value of an Integer or Real object
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Name value as a lossy string
pub(crate) fn name_str(object: &Object) -> Option<String> {
    match object {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Get a page dictionary
pub(crate) fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary> {
    match doc.get_object(page_id)? {
        Object::Dictionary(dict) => Ok(dict),
        _ => Err(Error::Decode(format!("page object {:?} is not a dictionary", page_id))),
    }
}

/// Find an inheritable page attribute, walking up the Parent chain
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page_dict(doc, page_id).ok()?;
    for _ in 0..MAX_DEPTH {
        if let Some(value) = get_resolved(doc, dict, key) {
            return Some(value);
        }
        match get_resolved(doc, dict, b"Parent") {
            Some(Object::Dictionary(parent)) => dict = parent,
            _ => return None,
        }
    }
    None
}

/// The page's effective Resources dictionary (own or inherited), cloned
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    match inherited(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    }
}

/// The page's effective MediaBox as `[llx lly urx ury]`
pub(crate) fn page_media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let array = match inherited(doc, page_id, b"MediaBox")? {
        Object::Array(array) => array,
        _ => return None,
    };
    if array.len() < 4 {
        return None;
    }
    let mut media_box = [0.0; 4];
    for (slot, value) in media_box.iter_mut().zip(array.iter()) {
        *slot = number(resolve(doc, value))?;
    }
    Some(media_box)
}

/// Add a font to the page's own Resources dictionary under `resource_name`
///
/// Inherited or referenced resources are copied onto the page first so the
/// change stays local to this page.
pub(crate) fn add_font_to_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    resource_name: &[u8],
    font_id: ObjectId,
) -> Result<()> {
    let mut resources = page_resources(doc, page_id);

    // Get or create Font subdictionary
    let mut fonts = match get_resolved(doc, &resources, b"Font") {
        Some(Object::Dictionary(fonts)) => fonts.clone(),
        _ => Dictionary::new(),
    };
    fonts.set(resource_name.to_vec(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let page_obj = doc.get_object_mut(page_id)?;
    if let Object::Dictionary(ref mut page_dict) = page_obj {
        page_dict.set("Resources", Object::Dictionary(resources));
    }

    Ok(())
}

/// Replace all of a page's content streams with one new stream
pub(crate) fn replace_page_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let stream_id = doc.add_object(lopdf::Stream::new(Dictionary::new(), content));

    let page_obj = doc.get_object_mut(page_id)?;
    if let Object::Dictionary(ref mut page_dict) = page_obj {
        page_dict.set("Contents", Object::Reference(stream_id));
    }

    Ok(())
}
