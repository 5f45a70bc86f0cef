use quick_xml::{
    escape::escape,
    events::{BytesStart, Event},
    Reader,
};
use tracing::debug;

use crate::{
    page::{PageLayout, Placement, ViewBox},
    LayoutError,
};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Print-ready page derived from a rendered calendar SVG.
///
/// `placement` is `None` when the source could not be margin-corrected and
/// `svg` is the source text unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintPage {
    pub svg: String,
    pub placement: Option<Placement>,
}

impl PrintPage {
    pub fn is_passthrough(&self) -> bool {
        self.placement.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrintLayoutTransformer {
    layout: PageLayout,
}

impl PrintLayoutTransformer {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }

    /// Never fails: anything that cannot be placed on the page is returned
    /// byte-identical.
    pub fn transform(&self, source: &str) -> PrintPage {
        match SourceSvg::parse(source) {
            Ok(parsed) if self.is_finished_page(&parsed.root) => {
                debug!("layout: source is already a print page, left as is");
                PrintPage {
                    svg: source.to_string(),
                    placement: Some(self.layout.full_page()),
                }
            }
            Ok(parsed) => {
                let placement = self.layout.place(&parsed.root.view_box);
                PrintPage {
                    svg: self.render(&parsed, &placement),
                    placement: Some(placement),
                }
            }
            Err(reason) => {
                debug!(%reason, "layout: source passed through without margin correction");
                PrintPage {
                    svg: source.to_string(),
                    placement: None,
                }
            }
        }
    }

    pub fn transform_batch<'a>(&self, sources: impl IntoIterator<Item = &'a str>) -> Vec<PrintPage> {
        sources.into_iter().map(|source| self.transform(source)).collect()
    }

    /// A root already sized to this page in inches with a page-unit viewBox
    /// is our own output.
    fn is_finished_page(&self, root: &RootAttributes) -> bool {
        let page_box = ViewBox {
            x: 0.0,
            y: 0.0,
            width: self.layout.page_width(),
            height: self.layout.page_height(),
        };
        let inches = |value: f64| format!("{}in", format_number(value));
        root.view_box == page_box
            && root.width.as_deref() == Some(inches(self.layout.page_width_in).as_str())
            && root.height.as_deref() == Some(inches(self.layout.page_height_in).as_str())
    }

    fn render(&self, source: &SourceSvg<'_>, placement: &Placement) -> String {
        let width = format_number(self.layout.page_width());
        let height = format_number(self.layout.page_height());

        let mut transform = format!(
            "translate({} {}) scale({})",
            format_number(placement.offset_x),
            format_number(placement.offset_y),
            format_number(placement.scale)
        );
        let view_box = &source.root.view_box;
        if view_box.x != 0.0 || view_box.y != 0.0 {
            transform.push_str(&format!(
                " translate({} {})",
                format_number(-view_box.x),
                format_number(-view_box.y)
            ));
        }

        let mut namespaces = String::new();
        for (key, value) in &source.root.namespaces {
            namespaces.push_str(&format!(" {key}=\"{}\"", escape(value.as_str())));
        }

        format!(
            "<svg xmlns=\"{SVG_NS}\" xmlns:xlink=\"{XLINK_NS}\"{namespaces} width=\"{}in\" height=\"{}in\" viewBox=\"0 0 {width} {height}\">\
<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"white\"/>\
<g transform=\"{transform}\">{}</g></svg>",
            format_number(self.layout.page_width_in),
            format_number(self.layout.page_height_in),
            source.inner
        )
    }
}

struct RootAttributes {
    view_box: ViewBox,
    namespaces: Vec<(String, String)>,
    width: Option<String>,
    height: Option<String>,
}

struct SourceSvg<'a> {
    root: RootAttributes,
    inner: &'a str,
}

struct RootTag {
    attributes: RootAttributes,
    inner_start: usize,
}

impl<'a> SourceSvg<'a> {
    fn parse(source: &'a str) -> Result<Self, LayoutError> {
        let mut reader = Reader::from_str(source);
        let mut root: Option<RootTag> = None;
        let mut depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(tag)) => {
                    if root.is_none() {
                        root = Some(RootTag {
                            attributes: root_attributes(&tag)?,
                            inner_start: reader.buffer_position() as usize,
                        });
                    }
                    depth += 1;
                }
                Ok(Event::Empty(tag)) if root.is_none() => {
                    return Ok(Self {
                        root: root_attributes(&tag)?,
                        inner: "",
                    });
                }
                Ok(Event::End(_)) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let root = root.ok_or(LayoutError::MissingRoot)?;
                        // The closing tag is the last `</` before the reader position.
                        let after = reader.buffer_position() as usize;
                        let inner_end = source[..after]
                            .rfind("</")
                            .filter(|end| *end >= root.inner_start)
                            .ok_or(LayoutError::UnclosedRoot)?;
                        return Ok(Self {
                            root: root.attributes,
                            inner: &source[root.inner_start..inner_end],
                        });
                    }
                }
                Ok(Event::Eof) => {
                    return Err(if root.is_some() {
                        LayoutError::UnclosedRoot
                    } else {
                        LayoutError::MissingRoot
                    });
                }
                Err(err) => return Err(LayoutError::Xml(err.to_string())),
                Ok(_) => {}
            }
        }
    }
}

fn root_attributes(tag: &BytesStart<'_>) -> Result<RootAttributes, LayoutError> {
    if tag.local_name().as_ref() != b"svg" {
        return Err(LayoutError::MissingRoot);
    }

    let mut view_box = None;
    let mut namespaces = Vec::new();
    let (mut width, mut height) = (None, None);
    for attribute in tag.attributes() {
        let attribute = attribute.map_err(|err| LayoutError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| LayoutError::Xml(err.to_string()))?
            .into_owned();

        if key == "viewBox" {
            view_box = Some(ViewBox::parse(&value)?);
        } else if key == "width" {
            width = Some(value);
        } else if key == "height" {
            height = Some(value);
        } else if key.starts_with("xmlns:") && key != "xmlns:xlink" {
            namespaces.push((key, value));
        }
    }

    Ok(RootAttributes {
        view_box: view_box.ok_or(LayoutError::MissingViewBox)?,
        namespaces,
        width,
        height,
    })
}

/// Fixed four-decimal output with trailing zeros dropped, so equal geometry
/// always serializes to equal text.
pub(crate) fn format_number(value: f64) -> String {
    let fixed = format!("{value:.4}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/transform_tests.rs"]
mod tests;
