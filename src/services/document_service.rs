//! Printable order document, rendered as an A4 PDF.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    config::BusinessInfo,
    dto::orders::OrderWithItems,
    error::{AppError, AppResult},
    services::order_service,
    state::AppState,
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LAYER: &str = "Content";
const PT_TO_MM: f32 = 0.3528;
const WRAP_AT: usize = 95;

/// Item table columns, in mm from the left margin.
const COL_PRODUCT: f32 = 0.0;
const COL_CATEGORY: f32 = 68.0;
const COL_QUANTITY: f32 = 104.0;
const COL_UNIT_PRICE: f32 = 124.0;
const COL_SUBTOTAL: f32 = 150.0;

pub struct OrderDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub async fn order_document(state: &AppState, id: Uuid) -> AppResult<OrderDocument> {
    let order = order_service::find_order(state, id).await?;
    let bytes = render_order_pdf(&order, &state.business)?;
    tracing::debug!(order_id = %id, bytes = bytes.len(), "order document rendered");
    Ok(OrderDocument {
        filename: format!("order_{id}.pdf"),
        bytes,
    })
}

pub fn render_order_pdf(order: &OrderWithItems, business: &BusinessInfo) -> AppResult<Vec<u8>> {
    render(order, business).map(|(bytes, _)| bytes)
}

fn render(order: &OrderWithItems, business: &BusinessInfo) -> AppResult<(Vec<u8>, usize)> {
    let header = &order.order;
    let mut pages = Pages::new(&format!("Order {}", header.id))?;

    pages.line(18.0, true, &business.name);
    if !business.address.is_empty() {
        pages.line(9.0, false, &format!("Address: {}", business.address));
    }
    if !business.phone.is_empty() {
        pages.line(9.0, false, &format!("Phone: {}", business.phone));
    }
    pages.gap(6.0);

    pages.line(13.0, true, &format!("Order # {}", header.id));
    pages.line(
        10.0,
        false,
        &format!("Date: {}", header.created_at.format("%d/%m/%Y %H:%M UTC")),
    );
    pages.line(10.0, false, &format!("Status: {}", header.status_display));

    pages.section("Customer");
    pages.line(11.0, false, &format!("Name: {}", header.customer_name));
    if !header.customer_phone.is_empty() {
        pages.line(11.0, false, &format!("Phone: {}", header.customer_phone));
    }
    if !header.customer_address.is_empty() {
        pages.line(11.0, false, &format!("Address: {}", header.customer_address));
    }

    pages.section("Dates");
    for (label, date) in [
        ("Event", header.event_date),
        ("Delivery", header.delivery_date),
        ("Return", header.return_date),
    ] {
        pages.line(11.0, false, &format!("{label}: {}", date.format("%d/%m/%Y")));
    }

    pages.section("Rented items");
    let columns = [
        (COL_PRODUCT, "Product"),
        (COL_CATEGORY, "Category"),
        (COL_QUANTITY, "Quantity"),
        (COL_UNIT_PRICE, "Unit price"),
        (COL_SUBTOTAL, "Subtotal"),
    ];
    pages.row(10.0, true, &columns);
    for item in &order.items {
        if pages.ensure_room(row_height(9.0)) {
            pages.row(10.0, true, &columns);
        }
        let name = clip(&item.product_name, 38);
        let category = clip(&item.product_category, 20);
        let quantity = item.quantity.to_string();
        let unit_price = money(item.unit_price);
        let subtotal = money(item.subtotal);
        pages.row(
            9.0,
            false,
            &[
                (COL_PRODUCT, name.as_str()),
                (COL_CATEGORY, category.as_str()),
                (COL_QUANTITY, quantity.as_str()),
                (COL_UNIT_PRICE, unit_price.as_str()),
                (COL_SUBTOTAL, subtotal.as_str()),
            ],
        );
    }

    pages.gap(6.0);
    let total = format!("TOTAL: {}", money(order.total));
    pages.row(14.0, true, &[(COL_UNIT_PRICE, total.as_str())]);

    if !header.observations.trim().is_empty() {
        pages.section("Observations");
        for line in wrap(&header.observations, WRAP_AT) {
            pages.line(10.0, false, &line);
        }
    }

    pages.finish()
}

struct Pages {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    count: usize,
}

impl Pages {
    fn new(title: &str) -> AppResult<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            count: 1,
        })
    }

    /// Starts a new page when `height` does not fit; returns whether it did.
    fn ensure_room(&mut self, height: f32) -> bool {
        if self.y - height >= MARGIN {
            return false;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.count += 1;
        true
    }

    fn line(&mut self, size: f32, bold: bool, text: &str) {
        self.row(size, bold, &[(0.0, text)]);
    }

    fn row(&mut self, size: f32, bold: bool, cells: &[(f32, &str)]) {
        let height = row_height(size);
        self.ensure_room(height);
        self.y -= height;
        let font = if bold { &self.bold } else { &self.regular };
        for &(x, text) in cells {
            self.layer
                .use_text(text, size, Mm(MARGIN + x), Mm(self.y), font);
        }
    }

    fn section(&mut self, title: &str) {
        self.gap(4.0);
        self.line(12.0, true, title);
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn finish(self) -> AppResult<(Vec<u8>, usize)> {
        let count = self.count;
        let bytes = self.doc.save_to_bytes().map_err(pdf_error)?;
        Ok((bytes, count))
    }
}

fn row_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.6
}

fn pdf_error(err: printpdf::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("pdf rendering failed: {err:?}"))
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Truncates to `max` characters, marking the cut with "...".
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Greedy word wrap; words longer than `width` get a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = current.chars().count() + word.chars().count() + 1;
            if !current.is_empty() && needed > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}
