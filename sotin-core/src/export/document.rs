//! Paginated PDF transcript.
//!
//! The Markdown transcript is flowed line by line onto fixed-size pages in a
//! monospace font. Long lines wrap at `max_columns` instead of being cut, so
//! the document carries the same text as the Markdown export.
//!
//! Encoding needs the `pdf` feature (`lopdf`). Pagination does not, so it is
//! always compiled and tested.

use crate::config::DocumentLayout;

use super::ExportError;

/// One page's worth of already-wrapped lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub lines: Vec<String>,
}

pub fn is_supported() -> bool {
    cfg!(feature = "pdf")
}

fn wrap(line: &str, columns: usize, out: &mut Vec<String>) {
    let expanded = line.replace('\t', "    ");
    let chars: Vec<char> = expanded.chars().collect();
    if chars.is_empty() {
        out.push(String::new());
        return;
    }
    for chunk in chars.chunks(columns.max(1)) {
        out.push(chunk.iter().collect());
    }
}

/// Split `text` into pages. Always yields at least one page.
pub fn paginate(text: &str, layout: &DocumentLayout) -> Vec<Page> {
    let mut lines = Vec::new();
    for line in text.lines() {
        wrap(line, layout.max_columns, &mut lines);
    }

    let per_page = layout.lines_per_page();
    let mut pages: Vec<Page> = lines
        .chunks(per_page)
        .map(|chunk| Page {
            lines: chunk.to_vec(),
        })
        .collect();

    if pages.is_empty() {
        pages.push(Page { lines: Vec::new() });
    }
    pages
}

#[cfg(feature = "pdf")]
pub fn encode(pages: &[Page], layout: &DocumentLayout, title: &str) -> Result<Vec<u8>, ExportError> {
    pdf::encode(pages, layout, title)
}

#[cfg(not(feature = "pdf"))]
pub fn encode(_pages: &[Page], _layout: &DocumentLayout, _title: &str) -> Result<Vec<u8>, ExportError> {
    Err(ExportError::CapabilityUnavailable(super::ExportFormat::Pdf))
}

#[cfg(feature = "pdf")]
mod pdf {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    use super::{ExportError, Page};
    use crate::config::DocumentLayout;

    const FONT_KEY: &str = "F1";

    fn document_error(err: lopdf::Error) -> ExportError {
        ExportError::Document(err.to_string())
    }

    /// Courier through WinAnsi covers Latin-1; anything else prints as `?`.
    fn latin1(line: &str) -> Vec<u8> {
        line.chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect()
    }

    fn page_content(page: &Page, layout: &DocumentLayout) -> Content {
        let top = i64::from(layout.page_height) - i64::from(layout.margin) - i64::from(layout.font_size);
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![FONT_KEY.into(), Object::Integer(i64::from(layout.font_size))],
            ),
            Operation::new("TL", vec![Object::Integer(i64::from(layout.line_height))]),
            Operation::new(
                "Td",
                vec![Object::Integer(i64::from(layout.margin)), Object::Integer(top)],
            ),
        ];
        for line in &page.lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(latin1(line))]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));
        Content { operations }
    }

    pub(super) fn encode(
        pages: &[Page],
        layout: &DocumentLayout,
        title: &str,
    ) -> Result<Vec<u8>, ExportError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { FONT_KEY => font_id },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for page in pages {
            let content = page_content(page, layout).encode().map_err(document_error)?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(i64::from(layout.page_width)),
                Object::Integer(i64::from(layout.page_height)),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(latin1(title)),
            "Producer" => Object::string_literal("sotin"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ExportError::Document(e.to_string()))?;
        Ok(bytes)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(max_columns: usize, page_height: u32) -> DocumentLayout {
        DocumentLayout {
            max_columns,
            page_height,
            margin: 0,
            line_height: 10,
            ..DocumentLayout::default()
        }
    }

    #[test]
    fn test_long_lines_wrap_without_loss() {
        let text = "abcdefghij";
        let pages = paginate(text, &layout(4, 1000));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines, vec!["abcd", "efgh", "ij"]);
        assert_eq!(pages[0].lines.concat(), text);
    }

    #[test]
    fn test_wrap_counts_characters_not_bytes() {
        let pages = paginate("ééééé", &layout(2, 1000));
        assert_eq!(pages[0].lines, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_pages_split_at_lines_per_page() {
        // 30 / 10 = 3 lines per page
        let text = "1\n2\n3\n4\n5\n6\n7";
        let pages = paginate(text, &layout(80, 30));
        let sizes: Vec<usize> = pages.iter().map(|p| p.lines.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(pages[2].lines, vec!["7"]);
    }

    #[test]
    fn test_blank_lines_and_tabs_preserved() {
        let pages = paginate("a\n\n\tb", &layout(80, 1000));
        assert_eq!(pages[0].lines, vec!["a", "", "    b"]);
    }

    #[test]
    fn test_empty_text_still_yields_a_page() {
        let pages = paginate("", &DocumentLayout::default());
        assert_eq!(pages, vec![Page { lines: Vec::new() }]);
    }
}
