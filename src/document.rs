use std::{fs::File, io::BufReader, path::PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};

use crate::{error::RenderError, shopping_list::ShoppingListItem};

/// US letter, in points.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
/// 1cm on every side.
pub const MARGIN: f32 = 28.35;

pub const TITLE: &str = "Shopping list:";
const TITLE_X: f32 = 200.0;
const TITLE_Y: f32 = 5.0;
const TITLE_SIZE: f32 = 18.0;

const LINE_X: f32 = 10.0;
const FIRST_LINE_Y: f32 = 20.0;
const LINE_STEP: f32 = 20.0;
const LINE_SIZE: f32 = 14.0;
/// Lines after the first page break are set one step larger.
const CONTINUATION_LINE_SIZE: f32 = 16.0;
/// A cursor at or past this starts a new page.
const PAGE_LIMIT_Y: f32 = 780.0;

/// Font the document text is set in.
#[derive(Debug, Clone)]
pub enum FontSource {
    TrueType(PathBuf),
    Builtin(BuiltinFont),
}

/// Text placed on a page. Coordinates are points measured from the top-left
/// corner of the margin box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
}

pub type PageLayout = Vec<PlacedLine>;

pub fn format_line(index: usize, item: &ShoppingListItem) -> String {
    format!(
        "{}. {}, {} {}.",
        index, item.name, item.amount, item.measurement_unit
    )
}

/// Splits the list into pages.
///
/// Only the first page carries the title, numbering continues across pages
/// and an empty list still yields one page.
pub fn layout(items: &[ShoppingListItem]) -> Vec<PageLayout> {
    let mut pages = Vec::new();
    let mut page = vec![PlacedLine {
        x: TITLE_X,
        y: TITLE_Y,
        size: TITLE_SIZE,
        text: TITLE.to_string(),
    }];
    let mut cursor = FIRST_LINE_Y;
    let mut size = LINE_SIZE;

    for (number, item) in items.iter().enumerate() {
        page.push(PlacedLine {
            x: LINE_X,
            y: cursor,
            size,
            text: format_line(number + 1, item),
        });

        cursor += LINE_STEP;
        if cursor >= PAGE_LIMIT_Y && number + 1 < items.len() {
            pages.push(std::mem::take(&mut page));
            cursor = FIRST_LINE_Y;
            size = CONTINUATION_LINE_SIZE;
        }
    }
    pages.push(page);

    pages
}

fn to_mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

fn load_font(doc: &PdfDocumentReference, font: &FontSource) -> Result<IndirectFontRef, RenderError> {
    match font {
        FontSource::TrueType(path) => {
            let file = File::open(path).map_err(|source| RenderError::FontFile {
                path: path.clone(),
                source,
            })?;
            doc.add_external_font(BufReader::new(file))
                .map_err(|e| RenderError::Font(format!("{e:?}")))
        }
        FontSource::Builtin(builtin) => doc
            .add_builtin_font(*builtin)
            .map_err(|e| RenderError::Font(format!("{e:?}"))),
    }
}

/// Renders the shopping list into a complete in-memory PDF.
pub fn render(items: &[ShoppingListItem], font: &FontSource) -> Result<Vec<u8>, RenderError> {
    let pages = layout(items);
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Shopping list",
        to_mm(PAGE_WIDTH),
        to_mm(PAGE_HEIGHT),
        "Page 1",
    );
    let font = load_font(&doc, font)?;

    for (number, lines) in pages.iter().enumerate() {
        let (page, layer) = if number == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(
                to_mm(PAGE_WIDTH),
                to_mm(PAGE_HEIGHT),
                format!("Page {}", number + 1),
            )
        };
        let layer = doc.get_page(page).get_layer(layer);

        for line in lines {
            layer.use_text(
                line.text.as_str(),
                line.size,
                to_mm(MARGIN + line.x),
                to_mm(PAGE_HEIGHT - MARGIN - line.y),
                &font,
            );
        }
    }

    doc.save_to_bytes()
        .map_err(|e| RenderError::Document(format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(count: usize) -> Vec<ShoppingListItem> {
        (1..=count)
            .map(|i| ShoppingListItem {
                name: format!("Item {i:03}"),
                measurement_unit: String::from("g"),
                amount: i as i64,
            })
            .collect()
    }

    #[test]
    fn line_format() {
        let item = ShoppingListItem {
            name: String::from("Flour"),
            measurement_unit: String::from("g"),
            amount: 500,
        };
        assert_eq!(format_line(1, &item), "1. Flour, 500 g.");
    }

    #[test]
    fn empty_list_has_title_only() {
        let pages = layout(&[]);

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 1);
        assert_eq!(pages[0][0].text, TITLE);
    }

    #[test]
    fn full_page_does_not_leave_blank_page() {
        let pages = layout(&items(38));

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 39);
        assert_eq!(pages[0][38].y, 760.0);
    }

    #[test]
    fn numbering_continues_on_next_page() {
        let pages = layout(&items(39));

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].len(), 1);

        let carried = &pages[1][0];
        assert!(carried.text.starts_with("39. "));
        assert_eq!(carried.y, FIRST_LINE_Y);
        assert_eq!(carried.size, CONTINUATION_LINE_SIZE);
        assert_eq!(pages[0][1].size, LINE_SIZE);
        assert!(pages[1].iter().all(|line| line.text != TITLE));
    }

    #[test]
    fn renders_with_builtin_font() {
        let bytes = render(&items(40), &FontSource::Builtin(BuiltinFont::Helvetica)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn missing_font_is_fatal() {
        let font = FontSource::TrueType(PathBuf::from("/definitely/not/here.ttf"));
        let error = render(&items(1), &font).unwrap_err();

        assert!(matches!(error, RenderError::FontFile { .. }));
    }
}
