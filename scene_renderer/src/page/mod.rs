// page/mod.rs - Typed page document: tagged elements, layout rects and queries

pub mod events;
pub mod split_text;

pub use events::*;
pub use split_text::*;

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error_handling::{RendererError, Result};

/// Axis-aligned box in page coordinates (CSS pixels, y grows downwards)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Same box relative to the visible viewport
    pub fn client_rect(&self, viewport: &Viewport) -> Rect {
        Rect {
            top: self.top - viewport.scroll_y,
            ..*self
        }
    }
}

/// Visible window: size plus current vertical scroll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub scroll_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1440.0, height: 900.0, scroll_y: 0.0 }
    }
}

/// One element of the page tree.
///
/// `component`, `select` and `section` mirror the `data-component`,
/// `data-select` and `data-section` attributes of the markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub text: Option<String>,
    /// Sized by the viewport (e.g. a fixed full-screen canvas host)
    #[serde(default)]
    pub fill_viewport: bool,
    #[serde(default)]
    pub children: Vec<Element>,
}

fn default_tag() -> String {
    "div".to_string()
}

impl Element {
    /// Current content-box size (`clientWidth`, `clientHeight`)
    pub fn client_size(&self, viewport: &Viewport) -> (f32, f32) {
        if self.fill_viewport {
            (viewport.width, viewport.height)
        } else {
            (self.rect.width, self.rect.height)
        }
    }

    /// Layout box, honouring `fill_viewport`
    pub fn layout_rect(&self, viewport: &Viewport) -> Rect {
        if self.fill_viewport {
            // pinned to the viewport: its page-space top follows the scroll
            Rect { left: 0.0, top: viewport.scroll_y, width: viewport.width, height: viewport.height }
        } else {
            self.rect
        }
    }

    /// Descendants (not self) in document order matching `predicate`
    pub fn query_all<'a, P>(&'a self, predicate: P) -> Vec<&'a Element>
    where
        P: Fn(&Element) -> bool + Copy,
    {
        let mut found = Vec::new();
        for child in &self.children {
            if predicate(child) {
                found.push(child);
            }
            found.extend(child.query_all(predicate));
        }
        found
    }

    /// `querySelectorAll("[data-select='<role>']")`
    pub fn select_all(&self, role: &str) -> Vec<&Element> {
        self.query_all(|el| el.select.as_deref() == Some(role))
    }

    /// `querySelector("[data-select='<role>']")`
    pub fn select_first(&self, role: &str) -> Option<&Element> {
        self.select_all(role).into_iter().next()
    }

    /// Descendants with the given tag name
    pub fn by_tag(&self, tag: &str) -> Vec<&Element> {
        self.query_all(|el| el.tag == tag)
    }

    /// Text of this element and all descendants, concatenated in order
    pub fn text_content(&self) -> String {
        let mut text = self.text.clone().unwrap_or_default();
        for child in &self.children {
            text.push_str(&child.text_content());
        }
        text
    }
}

/// The whole page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub viewport: Viewport,
    pub body: Element,
}

impl Document {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await.map_err(|source| RendererError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// `querySelectorAll("[data-component='<role>']")`
    pub fn components(&self, role: &str) -> Vec<&Element> {
        self.body.query_all(|el| el.component.as_deref() == Some(role))
    }

    /// `querySelector("[data-section='<name>']")`
    pub fn section(&self, name: &str) -> Option<&Element> {
        self.body
            .query_all(|el| el.section.as_deref() == Some(name))
            .into_iter()
            .next()
    }

    /// Scrollable height: bottom of the lowest element
    pub fn scroll_height(&self) -> f32 {
        fn lowest(el: &Element) -> f32 {
            el.children
                .iter()
                .map(lowest)
                .fold(el.rect.top + el.rect.height, f32::max)
        }
        lowest(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "viewport": { "width": 1200, "height": 800 },
        "body": {
            "tag": "body",
            "children": [
                { "section": "landing", "rect": { "left": 0, "top": 0, "width": 1200, "height": 1600 },
                  "children": [
                      { "component": "label", "text": "Bone deep", "rect": { "left": 0, "top": 900, "width": 600, "height": 40 } }
                  ] },
                { "component": "parallax", "rect": { "left": 0, "top": 1600, "width": 1200, "height": 800 },
                  "children": [ { "tag": "img", "select": "image" } ] },
                { "section": "footer", "rect": { "left": 0, "top": 2400, "width": 1200, "height": 600 } }
            ]
        }
    }"#;

    #[test]
    fn test_parse_and_query() {
        let doc = Document::from_json(PAGE).unwrap();
        assert_eq!(doc.viewport.height, 800.0);
        assert_eq!(doc.components("label").len(), 1);
        assert_eq!(doc.components("echo").len(), 0);
        assert_eq!(doc.section("footer").unwrap().rect.top, 2400.0);
        assert!(doc.section("pricing").is_none());

        let parallax = doc.components("parallax")[0];
        assert_eq!(parallax.select_first("image").unwrap().tag, "img");
        assert_eq!(doc.scroll_height(), 3000.0);
    }

    #[test]
    fn test_client_rect_follows_scroll() {
        let rect = Rect { left: 10.0, top: 500.0, width: 100.0, height: 50.0 };
        let vp = Viewport { width: 800.0, height: 600.0, scroll_y: 120.0 };
        assert_eq!(rect.client_rect(&vp).top, 380.0);
        assert_eq!(rect.client_rect(&vp).left, 10.0);
    }

    #[test]
    fn test_fill_viewport_sizing() {
        let el = Element { fill_viewport: true, ..Default::default() };
        let vp = Viewport { width: 640.0, height: 480.0, scroll_y: 300.0 };
        assert_eq!(el.client_size(&vp), (640.0, 480.0));
        assert_eq!(el.layout_rect(&vp).client_rect(&vp).top, 0.0);
    }

    #[test]
    fn test_text_content_concatenates() {
        let el = Element {
            text: Some("a".into()),
            children: vec![Element { text: Some("b".into()), ..Default::default() }],
            ..Default::default()
        };
        assert_eq!(el.text_content(), "ab");
    }
}
