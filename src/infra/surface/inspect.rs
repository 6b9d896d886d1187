//! Read-only view of a loaded document, extracted with a streaming HTML pass.

use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, element, html_content::Attribute, rewrite_str, text};

use crate::{application::SurfaceError, domain::value::Region};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementEntry {
    pub tag: String,
    pub region: Option<Region>,
    pub attributes: Vec<(String, String)>,
}

impl ElementEntry {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedDocument {
    elements: Vec<ElementEntry>,
    title: Option<String>,
}

#[derive(Default)]
struct InspectState {
    elements: Vec<ElementEntry>,
    title: Option<String>,
}

impl LoadedDocument {
    pub fn parse(html: &str) -> Result<Self, SurfaceError> {
        let state = Rc::new(RefCell::new(InspectState::default()));

        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("head *", {
                        let state = Rc::clone(&state);
                        move |el| {
                            state
                                .borrow_mut()
                                .elements
                                .push(entry(el.tag_name(), Some(Region::Head), el.attributes()));
                            Ok(())
                        }
                    }),
                    element!("body *", {
                        let state = Rc::clone(&state);
                        move |el| {
                            state
                                .borrow_mut()
                                .elements
                                .push(entry(el.tag_name(), Some(Region::Body), el.attributes()));
                            Ok(())
                        }
                    }),
                    text!("title", {
                        let state = Rc::clone(&state);
                        move |chunk| {
                            state
                                .borrow_mut()
                                .title
                                .get_or_insert_with(String::new)
                                .push_str(chunk.as_str());
                            Ok(())
                        }
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| SurfaceError::unavailable(format!("document failed to load: {err}")))?;

        let state = state.take();
        Ok(Self {
            elements: state.elements,
            title: state.title,
        })
    }

    pub fn elements(&self) -> &[ElementEntry] {
        &self.elements
    }

    pub fn elements_in(&self, region: Region) -> impl Iterator<Item = &ElementEntry> {
        self.elements
            .iter()
            .filter(move |entry| entry.region == Some(region))
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Document-order index of the first element with this tag.
    pub fn position_of_tag(&self, tag: &str) -> Option<usize> {
        self.elements.iter().position(|entry| entry.tag == tag)
    }

    /// Document-order index of the element carrying this id.
    pub fn position_of_id(&self, id: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|entry| entry.attribute("id") == Some(id))
    }
}

fn entry(tag: String, region: Option<Region>, attributes: &[Attribute<'_>]) -> ElementEntry {
    ElementEntry {
        tag,
        region,
        attributes: attributes
            .iter()
            .map(|attribute| (attribute.name(), attribute.value()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_elements_by_region_in_document_order() {
        let html = "<!DOCTYPE html>\n<html><head><title>Demo</title><style media=\"print\">p{}</style></head>\
                    <body><script>go()</script><div id=\"x\">hi</div></body></html>";
        let doc = LoadedDocument::parse(html).expect("document parses");

        assert_eq!(doc.title(), Some("Demo"));
        let head: Vec<_> = doc.elements_in(Region::Head).map(|e| e.tag.as_str()).collect();
        assert_eq!(head, vec!["title", "style"]);
        let body: Vec<_> = doc.elements_in(Region::Body).map(|e| e.tag.as_str()).collect();
        assert_eq!(body, vec!["script", "div"]);

        let style = &doc.elements()[1];
        assert_eq!(style.attribute("media"), Some("print"));
        assert_eq!(doc.position_of_tag("script"), Some(2));
        assert_eq!(doc.position_of_id("x"), Some(3));
    }

    #[test]
    fn empty_document_has_no_elements() {
        let doc = LoadedDocument::parse("<!DOCTYPE html>\n<html><head></head><body></body></html>")
            .expect("document parses");
        assert!(doc.elements().is_empty());
        assert_eq!(doc.title(), None);
    }
}
