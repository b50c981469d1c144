use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::error::ReminderError;
use crate::format;
use crate::settings::ReminderSettings;
use crate::store::Debt;

/// Renders a one-page statement PDF for a debt.
///
/// Encoding runs on the blocking pool, so the caller suspends rather than
/// stalls. A failure here is an attachment failure only: the enclosing send
/// drops the attachment and proceeds.
pub async fn generate_statement(
    debt: &Debt,
    settings: &ReminderSettings,
) -> Result<Vec<u8>, ReminderError> {
    let debt = debt.clone();
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || render_statement(&debt, &settings))
        .await
        .map_err(|e| ReminderError::Statement(e.to_string()))?
}

fn render_statement(debt: &Debt, settings: &ReminderSettings) -> Result<Vec<u8>, ReminderError> {
    let title = format!("Statement - Debt #{}", debt.id);
    // A4 portrait.
    let (doc, page, layer) = PdfDocument::new(&title, Mm(210.0), Mm(297.0), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(statement_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(statement_error)?;
    let layer = doc.get_page(page).get_layer(layer);

    let business = settings.business_name.trim();
    let heading = if business.is_empty() {
        "Statement of Account"
    } else {
        business
    };
    let symbol = &settings.currency_symbol;

    layer.use_text(heading, 18.0, Mm(20.0), Mm(272.0), &bold);
    let mut y = Mm(264.0);
    if !business.is_empty() {
        layer.use_text("Statement of Account", 11.0, Mm(20.0), y, &regular);
        y = Mm(y.0 - 8.0);
    }
    layer.use_text(
        format!("Issued {}", chrono::Utc::now().format("%-d %b %Y")),
        10.0,
        Mm(20.0),
        y,
        &regular,
    );
    y = Mm(y.0 - 14.0);

    // Body lines at a uniform size; empty strings act as spacers.
    let mut lines: Vec<(String, &printpdf::IndirectFontRef)> = Vec::new();
    lines.push((format!("Customer: {}", debt.customer_name), &regular));
    if let Some(phone) = debt.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        lines.push((format!("Phone: {}", phone.trim()), &regular));
    }
    if let Some(email) = debt.email_on_file() {
        lines.push((format!("Email: {email}"), &regular));
    }
    lines.push((String::new(), &regular));

    lines.push((format!("Debt #{}", debt.id), &bold));
    if let Some(reference) = debt.reference.as_deref().filter(|r| !r.trim().is_empty()) {
        lines.push((format!("Reference: {}", reference.trim()), &regular));
    }
    if let Some(purchased) = debt.date_of_purchase.as_deref() {
        lines.push((
            format!("Date of purchase: {}", format::display_date(purchased)),
            &regular,
        ));
    }
    if let Some(due) = debt.due_date.as_deref() {
        lines.push((format!("Due date: {}", format::display_date(due)), &regular));
    }
    if !debt.items.trim().is_empty() {
        lines.push((format!("Items: {}", debt.items.trim()), &regular));
    }
    lines.push((String::new(), &regular));

    lines.push((format!("Total amount: {}", format::money(debt.total_amount, symbol)), &regular));
    lines.push((format!("Amount paid: {}", format::money(debt.amount_paid, symbol)), &regular));
    lines.push((format!("Balance due: {}", format::money(debt.balance(), symbol)), &bold));

    for (text, font) in lines {
        if !text.is_empty() {
            layer.use_text(text, 11.0, Mm(20.0), y, font);
        }
        y = Mm(y.0 - 7.0);
    }

    doc.save_to_bytes().map_err(statement_error)
}

fn statement_error(error: printpdf::Error) -> ReminderError {
    ReminderError::Statement(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_debt() -> Debt {
        Debt {
            id: 7,
            customer_id: 3,
            customer_name: "Jane Wairimu".to_string(),
            phone: Some("0712 000000".to_string()),
            email: Some("jane@example.com".to_string()),
            items: "Wine case".to_string(),
            total_amount: 1000.0,
            amount_paid: 400.0,
            date_of_purchase: Some("2023-12-01".to_string()),
            due_date: Some("2024-01-10".to_string()),
            reference: Some("INV-118".to_string()),
            branch_name: Some("westlands".to_string()),
        }
    }

    #[test]
    fn statement_encodes_as_pdf() {
        let settings = ReminderSettings {
            business_name: "Harbor Wine Merchants".to_string(),
            ..Default::default()
        };
        let bytes = render_statement(&sample_debt(), &settings).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn statement_tolerates_sparse_debts() {
        let debt = Debt {
            phone: None,
            email: None,
            reference: None,
            date_of_purchase: None,
            due_date: None,
            items: String::new(),
            ..sample_debt()
        };
        let bytes = render_statement(&debt, &ReminderSettings::default()).unwrap();
        assert!(!bytes.is_empty());
    }
}
