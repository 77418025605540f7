//! HTML bodies for the transactional emails. User-supplied text is escaped.

use chrono::{Days, NaiveDate};
use std::fmt::Write;

use super::OrderDetails;
use crate::domain::value_objects::ShippingAddress;

pub const DELIVERY_DAYS: u64 = 14;

const SIGNATURE: &str = "<p style=\"margin-top: 30px;\">Best regards,<br><strong>EU Wristbands Team</strong></p>";
const FOOTER: &str = "<div style=\"margin-top: 40px; padding-top: 20px; border-top: 1px solid #ddd; text-align: center; color: #888; font-size: 12px;\">\
    <p>This is an automated email. Please do not reply directly to this message.</p></div>";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn wrap(heading: &str, accent: &str, body: &str) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;\">\
         <h1 style=\"color: #333; border-bottom: 2px solid {accent}; padding-bottom: 10px;\">{heading}</h1>{body}</div>"
    )
}

fn section(title: &str, rows: &str) -> String {
    format!("<h2 style=\"color: #555; margin-top: 30px;\">{title}</h2><div style=\"background: #f5f5f5; padding: 15px; border-radius: 8px;\">{rows}</div>")
}

fn row(out: &mut String, label: &str, value: &str) {
    let _ = write!(out, "<p><strong>{label}:</strong> {value}</p>");
}

fn address_block(title: &str, address: &ShippingAddress, fallback_name: &str) -> String {
    let name = if address.name.is_empty() { fallback_name } else { &address.name };
    let mut rows = format!(
        "<p>{}</p><p>{}</p><p>{}, {} {}</p><p>{}</p>",
        escape(name), escape(&address.address), escape(&address.city),
        escape(address.state.as_deref().unwrap_or_default()), escape(&address.zip_code), escape(&address.country),
    );
    if let Some(phone) = &address.phone {
        row(&mut rows, "Phone", &escape(phone));
    }
    section(title, &rows)
}

fn wristband_rows(out: &mut String, details: &OrderDetails) {
    let order = &details.order;
    row(out, "Quantity", &format!("{} pieces", order.quantity.value()));
    row(out, "Wristband Type", details.design.as_ref().map(|d| d.wristband_type.label()).unwrap_or("N/A"));
}

fn preview(details: &OrderDetails) -> String {
    match &details.design {
        Some(d) => format!(
            "<h2 style=\"color: #555; margin-top: 30px;\">Design Preview</h2><div style=\"text-align: center; margin: 20px 0;\">\
             <img src=\"{}\" alt=\"Wristband Design\" style=\"max-width: 100%; border-radius: 8px; border: 1px solid #ddd;\" /></div>",
            escape(&d.image_url)
        ),
        None => String::new(),
    }
}

/// Customer confirmation sent when an order is approved or paid.
pub fn confirmation(details: &OrderDetails, today: NaiveDate) -> (String, String) {
    let order = &details.order;
    let name = escape(details.customer_name());
    let delivery = today.checked_add_days(Days::new(DELIVERY_DAYS)).unwrap_or(today);

    let mut summary = String::new();
    row(&mut summary, "Order ID", &order.id.to_string());
    wristband_rows(&mut summary, details);
    if let Some(label) = order.options.print_type.label() { row(&mut summary, "Print Type", label); }
    if order.options.has_qr_code { row(&mut summary, "Secure Guests", "Yes"); }
    row(&mut summary, "Total Amount", &order.total().to_string());

    let mut body = format!(
        "<p>Dear {name},</p><p>Great news! Your custom wristband order has been approved and is now being processed.</p>{}",
        section("Order Summary", &summary)
    );
    if let Some(address) = &order.shipping_address {
        body.push_str(&address_block("Delivery Address", address, details.customer_name()));
    }
    let _ = write!(
        body,
        "<h2 style=\"color: #555; margin-top: 30px;\">Estimated Delivery</h2>\
         <p style=\"font-size: 18px; color: #4CAF50; font-weight: bold;\">{}</p>\
         <p style=\"margin-top: 30px;\">We're working hard to get your custom wristbands to you as quickly as possible!</p>{SIGNATURE}{FOOTER}",
        delivery.format("%A, %B %-d, %Y")
    );

    (format!("Order Confirmed - {} Custom Wristbands", order.quantity.value()), wrap("Order Confirmed!", "#4CAF50", &body))
}

/// Alert for the shop admin about a new paid order.
pub fn admin_alert(details: &OrderDetails, dashboard_url: &str) -> (String, String) {
    let order = &details.order;
    let email = details.profile.as_ref().map(|p| p.email.as_str()).unwrap_or("Unknown");

    let mut rows = String::new();
    row(&mut rows, "Order ID", &order.id.to_string());
    row(&mut rows, "Customer", &format!("{} ({})", escape(details.customer_name()), escape(email)));
    wristband_rows(&mut rows, details);
    if let Some(d) = &details.design {
        row(&mut rows, "Wristband Color", &escape(&d.color));
        if let Some(text) = &d.custom_text { row(&mut rows, "Custom Text", &escape(text)); }
    }
    if let Some(label) = order.options.print_type.label() { row(&mut rows, "Print Type", label); }
    if order.options.has_trademark {
        row(&mut rows, "Trademark", &escape(order.options.trademark_text.as_deref().unwrap_or("Yes")));
    }
    if order.options.has_qr_code { row(&mut rows, "Secure Guests", "Yes"); }
    for (name, amount) in order.extra_charges.iter() {
        row(&mut rows, &format!("Extra ({})", escape(name)), &crate::domain::value_objects::Money::new(amount, order.currency).to_string());
    }
    row(&mut rows, "Total Amount", &order.total().to_string());
    row(&mut rows, "Order Date", &order.created_at.format("%Y-%m-%d %H:%M UTC").to_string());

    let mut body = format!("<p><strong>A new order has been placed and requires your attention.</strong></p>{}", section("Order Details", &rows));
    if let Some(address) = &order.shipping_address {
        body.push_str(&address_block("Shipping Address", address, details.customer_name()));
    }
    body.push_str(&preview(details));
    let _ = write!(
        body,
        "<div style=\"text-align: center; margin: 30px 0;\"><a href=\"{}\" style=\"background: #4CAF50; color: white; padding: 15px 30px; \
         text-decoration: none; border-radius: 8px; display: inline-block; font-weight: bold;\">View in Admin Dashboard</a></div>\
         <p style=\"margin-top: 30px;\">Please review and approve/decline this order in the admin dashboard.</p>{SIGNATURE}{FOOTER}",
        escape(dashboard_url)
    );

    (format!("New Order #{} - {} Wristbands", order.short_id(), order.quantity.value()), wrap("New Order Received!", "#FF6B6B", &body))
}

/// Production brief for the supplier assigned to the order.
pub fn supplier_alert(details: &OrderDetails) -> (String, String) {
    let order = &details.order;
    let supplier_name = details.supplier.as_ref().map(|s| s.company_name.as_str()).unwrap_or("Supplier");
    let email = details.profile.as_ref().map(|p| p.email.as_str()).unwrap_or("N/A");

    let mut info = String::new();
    row(&mut info, "Order ID", &order.short_id());
    row(&mut info, "Customer", &format!("{} ({})", escape(details.customer_name()), escape(email)));
    row(&mut info, "Order Date", &order.created_at.format("%Y-%m-%d").to_string());
    row(&mut info, "Payment Status", order.payment_status.as_str());
    row(&mut info, "Order Status", order.status.as_str());

    let mut production = String::new();
    wristband_rows(&mut production, details);
    if let Some(d) = &details.design {
        row(&mut production, "Wristband Color", &escape(&d.color));
    }
    if let Some(label) = order.options.print_type.label() { row(&mut production, "Print Type", label); }
    if let Some(text) = details.design.as_ref().and_then(|d| d.custom_text.as_deref()) {
        row(&mut production, "Custom Text", &escape(text));
    }
    if order.options.has_qr_code { row(&mut production, "Security Features", "QR Code / Secure Guests Enabled"); }
    row(&mut production, "Total Amount", &order.total().to_string());

    let mut body = format!(
        "<p>Dear {},</p><p>A new custom wristband order has been placed and assigned to you. Please review the production details below.</p>{}{}",
        escape(supplier_name), section("Order Details", &info), section("Production Specifications", &production)
    );
    body.push_str(&preview(details));
    if let Some(address) = &order.shipping_address {
        body.push_str(&address_block("Shipping Address", address, details.customer_name()));
    }
    let _ = write!(
        body,
        "<p style=\"margin-top: 30px;\">Please log in to your supplier dashboard to manage this order and update its production status.</p>{SIGNATURE}{FOOTER}"
    );

    (format!("New Order #{} - {} Wristbands", order.short_id(), order.quantity.value()), wrap("New Order Received!", "#4CAF50", &body))
}

pub fn verification(full_name: Option<&str>, confirmation_url: &str) -> (String, String) {
    let url = escape(confirmation_url);
    let body = format!(
        "<p>Dear {},</p><p>Thank you for signing up! Please confirm your email address to complete your registration and start designing custom wristbands.</p>\
         <div style=\"text-align: center; margin: 30px 0;\"><a href=\"{url}\" style=\"background: #667eea; color: white; padding: 15px 30px; \
         text-decoration: none; border-radius: 8px; display: inline-block; font-weight: bold;\">Verify Email Address</a></div>\
         <p style=\"color: #666; font-size: 14px;\">If the button doesn't work, copy and paste this link into your browser:</p>\
         <p style=\"background: #f5f5f5; padding: 10px; border-radius: 5px; word-break: break-all; font-size: 12px;\">{url}</p>{SIGNATURE}{FOOTER}",
        escape(full_name.unwrap_or("Customer")),
    );
    ("Verify Your Email - EU Wristbands".to_string(), wrap("Welcome to EU Wristbands!", "#4CAF50", &body))
}
