//! PDF invoices for admin download.

use chrono::Datelike;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use rust_decimal::Decimal;
use thiserror::Error;

use bazaar_core::pricing::InvoiceTotals;

use crate::models::{Order, OrderCustomer};

const STORE_NAME: &str = "Bazaar";
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LINE_HEIGHT: f32 = 7.0;
/// Lowest baseline for body text. The footer sits below it at `MARGIN`.
const BOTTOM: f32 = 40.0;

// Table column x positions.
const COL_ITEM: f32 = MARGIN;
const COL_QTY: f32 = 120.0;
const COL_PRICE: f32 = 145.0;
const COL_TOTAL: f32 = 170.0;

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// Invoice number for an order, e.g. `INV-2025-000042`.
#[must_use]
pub fn invoice_number(order: &Order) -> String {
    let id = format!("{:06}", order.id.as_i32());
    let tail = id.get(id.len().saturating_sub(6)..).unwrap_or(&id);
    format!("INV-{}-{tail}", order.created_at.year())
}

/// Payment line shown on the invoice.
#[must_use]
pub fn payment_status(order: &Order) -> &'static str {
    if order.is_cash_on_delivery() {
        "Pending (COD)"
    } else {
        "Paid"
    }
}

/// Totals for an order's lines.
#[must_use]
pub fn totals(order: &Order) -> InvoiceTotals {
    InvoiceTotals::from_lines(order.items.iter().map(|i| (i.unit_price, i.quantity)))
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Text cursor over the pages of one document.
struct Writer<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Writer<'_> {
    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn rule(&self) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn advance(&mut self, lines: f32) {
        self.y -= LINE_HEIGHT * lines;
    }

    /// Start a new page unless `lines` more rows fit above the footer.
    fn ensure_room(&mut self, lines: f32) {
        if !fits(self.y, lines) {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Invoice");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }
}

fn fits(y: f32, lines: f32) -> bool {
    y - LINE_HEIGHT * (lines - 1.0) >= BOTTOM
}

/// Render an order as a PDF invoice.
///
/// # Errors
///
/// Returns `InvoiceError::Pdf` if fonts cannot be embedded or the document
/// cannot be serialized.
pub fn render(order: &Order, customer: Option<&OrderCustomer>) -> Result<Vec<u8>, InvoiceError> {
    let number = invoice_number(order);
    let (doc, page, layer) = PdfDocument::new(
        format!("{STORE_NAME} invoice {number}"),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Invoice",
    );
    let mut w = Writer {
        layer: doc.get_page(page).get_layer(layer),
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        doc: &doc,
        y: PAGE_HEIGHT - MARGIN - 5.0,
    };

    // Header
    w.text(STORE_NAME, 24.0, MARGIN, true);
    w.advance(1.2);
    w.text("Quality tech, delivered.", 10.0, MARGIN, false);
    w.advance(1.0);
    w.rule();
    w.advance(1.5);

    // Meta
    w.text(&format!("Invoice No: {number}"), 11.0, MARGIN, true);
    w.advance(1.0);
    w.text(&format!("Order ID: {}", order.id), 10.0, MARGIN, false);
    w.advance(1.0);
    w.text(&format!("Tracking ID: {}", order.tracking_id), 10.0, MARGIN, false);
    w.advance(1.0);
    w.text(
        &format!("Date: {}", order.created_at.format("%b %d, %Y")),
        10.0,
        MARGIN,
        false,
    );
    w.advance(1.0);
    w.text(&format!("Status: {}", order.status), 10.0, MARGIN, false);
    w.advance(1.0);
    w.text(
        &format!("Payment: {} ({})", payment_status(order), order.payment_method),
        10.0,
        MARGIN,
        false,
    );
    w.advance(1.5);

    // Bill to
    let address = &order.shipping_address;
    w.text("Bill To", 11.0, MARGIN, true);
    w.advance(1.0);
    w.text(&address.full_name, 10.0, MARGIN, false);
    w.advance(1.0);
    if let Some(customer) = customer {
        let email = customer.email.as_ref().map_or("", |e| e.as_str());
        w.text(&format!("{} {email}", customer.username), 10.0, MARGIN, false);
        w.advance(1.0);
    }
    w.text(&address.phone, 10.0, MARGIN, false);
    w.advance(1.0);
    w.text(&address.one_line(), 10.0, MARGIN, false);
    w.advance(1.5);

    // Lines
    for (heading, x) in [
        ("Item", COL_ITEM),
        ("Qty", COL_QTY),
        ("Price", COL_PRICE),
        ("Total", COL_TOTAL),
    ] {
        w.text(heading, 10.0, x, true);
    }
    w.advance(0.5);
    w.rule();
    w.advance(1.0);
    for item in &order.items {
        w.ensure_room(1.0);
        w.text(&item.name, 10.0, COL_ITEM, false);
        w.text(&item.quantity.to_string(), 10.0, COL_QTY, false);
        w.text(&money(item.unit_price), 10.0, COL_PRICE, false);
        w.text(&money(item.line_total()), 10.0, COL_TOTAL, false);
        w.advance(1.0);
    }
    w.rule();
    w.advance(1.5);

    // Totals
    let totals = totals(order);
    let coupon_lines = if order.coupon_code.is_some() { 1.0 } else { 0.0 };
    w.ensure_room(3.0 + coupon_lines);
    let label_x = COL_PRICE - 20.0;
    for (label, amount, bold) in [
        ("Subtotal", totals.subtotal, false),
        ("VAT (10%)", totals.vat, false),
        ("Grand Total", totals.grand_total, true),
    ] {
        w.text(label, 10.0, label_x, bold);
        w.text(&money(amount), 10.0, COL_TOTAL, bold);
        w.advance(1.0);
    }
    if let Some(code) = &order.coupon_code {
        w.text(&format!("Coupon applied at checkout: {code}"), 9.0, MARGIN, false);
        w.advance(1.0);
    }

    // Footer
    w.y = MARGIN;
    w.text(
        "This is a computer-generated invoice and does not require a signature.",
        8.0,
        MARGIN,
        false,
    );

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use bazaar_core::{OrderId, OrderStatus, ProductId, UserId};

    use super::*;
    use crate::models::{OrderItem, ShippingAddress};

    fn order(id: i32, payment_method: &str) -> Order {
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(7),
            items: vec![
                OrderItem {
                    product_id: Some(ProductId::new(1)),
                    name: "Laptop".to_string(),
                    unit_price: Decimal::new(1000_00, 2),
                    quantity: 1,
                },
                OrderItem {
                    product_id: None,
                    name: "Mouse".to_string(),
                    unit_price: Decimal::new(25_50, 2),
                    quantity: 2,
                },
            ],
            total: Decimal::new(1051_00, 2),
            payment_method: payment_method.to_string(),
            tracking_id: "ORD-0A1B2C3D".to_string(),
            status: OrderStatus::Placed,
            cancelled_at: None,
            status_updated_at: None,
            shipping_address: ShippingAddress {
                full_name: "Ada Lovelace".to_string(),
                phone: "555".to_string(),
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: None,
                postal_code: "12345".to_string(),
                country: "US".to_string(),
            },
            hidden_for_user: false,
            coupon_code: None,
            created_at: Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_invoice_number_pads_and_truncates() {
        assert_eq!(invoice_number(&order(42, "Cash on Delivery")), "INV-2025-000042");
        assert_eq!(invoice_number(&order(12_345_678, "Card")), "INV-2025-345678");
    }

    #[test]
    fn test_payment_status() {
        assert_eq!(payment_status(&order(1, "Cash on Delivery")), "Pending (COD)");
        assert_eq!(payment_status(&order(1, "Card")), "Paid");
    }

    #[test]
    fn test_totals_add_vat() {
        let totals = totals(&order(1, "Card"));
        assert_eq!(totals.subtotal, Decimal::new(1051_00, 2));
        assert_eq!(totals.vat, Decimal::new(105_10, 2));
        assert_eq!(totals.grand_total, Decimal::new(1156_10, 2));
    }

    #[test]
    fn test_totals_block_breaks_before_footer() {
        let top = PAGE_HEIGHT - MARGIN;
        assert!(fits(top, 4.0));
        assert!(fits(BOTTOM, 1.0));
        assert!(!fits(BOTTOM, 3.0));
        assert!(!fits(BOTTOM + LINE_HEIGHT, 4.0));
        assert!(fits(BOTTOM + 3.0 * LINE_HEIGHT, 4.0));
    }

    #[test]
    fn test_render_long_order_spans_pages() {
        let mut long = order(7, "Card");
        let line = long.items.first().cloned().unwrap();
        long.items = vec![line; 60];
        long.coupon_code = Some("SAVE10".to_string());
        let bytes = render(&long, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render(&order(42, "Cash on Delivery"), None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
