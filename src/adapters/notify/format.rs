//! Alert text rendering

use std::fmt::Write;

use crate::domain::MilestoneKind;
use crate::ports::alerts::MilestoneAlert;

/// Compact USD amount: `$1.2M`, `$5.0K`, `$950`
pub fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return "$0".to_string();
    }
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("${:.1}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("${:.1}K", value / 1_000.0)
    } else {
        format!("${:.0}", value)
    }
}

/// USD price with enough decimals to show four significant digits of
/// sub-dollar prices
pub fn format_price(price: f64) -> String {
    if !price.is_finite() || price <= 0.0 {
        return "$0".to_string();
    }
    if price >= 1.0 {
        return format!("${:.4}", price);
    }
    let leading_zeros = (-price.log10()).floor() as usize;
    let decimals = (leading_zeros + 4).min(12);
    format!("${:.*}", decimals, price)
}

/// Plain-text alert shared by every notifier
pub fn format_alert(alert: &MilestoneAlert) -> String {
    let event = &alert.event;
    let icon = match event.kind {
        MilestoneKind::Gain => "🚀",
        MilestoneKind::Drawdown => "⚠️",
    };

    let mut text = format!("{} {} ({}) hit {}\n", icon, event.symbol, event.name, event.milestone_label);
    let _ = writeln!(text, "Chain: {}", event.chain);
    let _ = writeln!(text, "Baseline: {}", format_price(event.baseline_price));
    let _ = writeln!(text, "Current: {}", format_price(event.current_price));
    let _ = writeln!(text, "Multiplier: {:.2}x ({:+.1}%)", event.multiplier, event.percent_change);

    let skipped: Vec<&str> = event.skipped_labels().collect();
    if !skipped.is_empty() {
        let _ = writeln!(text, "Also crossed: {}", skipped.join(", "));
    }

    for annotation in &alert.annotations {
        let _ = writeln!(text, "{}: {}", annotation.key, annotation.value);
    }

    text.push_str(&event.dexscreener_url());
    text
}
