//! Text, link, and image extraction over parsed HTML.

use scraper::{ElementRef, Html, Selector};

/// Element type plus optional class/id/attribute constraints, compiled to a
/// CSS selector such as `p.lead.intro#main[data-kind="body"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFilter {
    pub element: String,
    pub class_name: Option<String>,
    pub id_name: Option<String>,
    pub attributes: Vec<(String, String)>,
}

impl ElementFilter {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            class_name: None,
            id_name: None,
            attributes: Vec::new(),
        }
    }

    pub fn paragraphs() -> Self {
        Self::new("p")
    }

    pub fn links() -> Self {
        Self::new("a")
    }

    pub fn images() -> Self {
        Self::new("img")
    }

    /// Space-separated class names are all required.
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_id(mut self, id_name: impl Into<String>) -> Self {
        self.id_name = Some(id_name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn css_selector(&self) -> String {
        let mut selector = self.element.clone();
        if let Some(class_name) = self.class_name.as_deref().filter(|c| !c.trim().is_empty()) {
            for class in class_name.split_whitespace() {
                selector.push('.');
                selector.push_str(class);
            }
        }
        if let Some(id_name) = self.id_name.as_deref().filter(|id| !id.trim().is_empty()) {
            selector.push('#');
            selector.push_str(id_name);
        }
        for (key, value) in &self.attributes {
            selector.push_str(&format!("[{}=\"{}\"]", key, value.replace('"', "\\\"")));
        }
        selector
    }
}

impl Default for ElementFilter {
    fn default() -> Self {
        Self::paragraphs()
    }
}

/// Elements matching `filter`; an unparsable selector matches nothing.
pub fn select_elements<'a>(doc: &'a Html, filter: &ElementFilter) -> Vec<ElementRef<'a>> {
    let css = filter.css_selector();
    let selector = match Selector::parse(&css) {
        Ok(selector) => selector,
        Err(err) => {
            tracing::error!("Element extraction failed for selector {:?}: {}", css, err);
            return Vec::new();
        }
    };
    doc.select(&selector).collect()
}

/// Text content of every matching element, in document order.
pub fn extract_text(doc: &Html, filter: &ElementFilter) -> Vec<String> {
    select_elements(doc, filter)
        .into_iter()
        .map(|element| element.text().collect::<String>())
        .collect()
}

/// `href` values of matching elements; elements without one are skipped.
pub fn extract_links(doc: &Html, filter: &ElementFilter) -> Vec<String> {
    extract_attribute(doc, filter, "href")
}

/// `src` values of matching elements; elements without one are skipped.
pub fn extract_images(doc: &Html, filter: &ElementFilter) -> Vec<String> {
    extract_attribute(doc, filter, "src")
}

fn extract_attribute(doc: &Html, filter: &ElementFilter, attribute: &str) -> Vec<String> {
    select_elements(doc, filter)
        .into_iter()
        .filter_map(|element| element.value().attr(attribute).map(str::to_string))
        .collect()
}
