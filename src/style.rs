use crate::metrics;
use crate::record::PLACEHOLDER;
use chrono::NaiveDate;

/// Display colour for a verdict, as CSS hex and as RGB for the charts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Swatch {
    pub hex: &'static str,
    pub rgb: (u8, u8, u8),
}

pub const SAFE: Swatch = Swatch {
    hex: "#00CC96",
    rgb: (0x00, 0xCC, 0x96),
};
pub const ALERT: Swatch = Swatch {
    hex: "#EF553B",
    rgb: (0xEF, 0x55, 0x3B),
};
pub const FRAUD: Swatch = Swatch {
    hex: "#B2182B",
    rgb: (0xB2, 0x18, 0x2B),
};
pub const NEUTRAL: Swatch = Swatch {
    hex: "#9E9E9E",
    rgb: (0x9E, 0x9E, 0x9E),
};

/// Verdict → colour mapping.
///
/// Labels are matched by case-insensitive containment, the same rule
/// [`metrics::is_negative`] counts threats with, so `FRAUDE confirmado` is
/// drawn as fraud. Negative labels win over `SEGURO`; anything else is neutral.
pub fn verdict_swatch(verdict: &str) -> Swatch {
    let label = verdict.to_uppercase();
    if label.contains("FRAUDE") {
        FRAUD
    } else if metrics::is_negative(&label) {
        ALERT
    } else if label.contains("SEGURO") {
        SAFE
    } else {
        NEUTRAL
    }
}

/// Inline CSS for the verdict cell of the detail table
pub fn verdict_cell_style(verdict: &str) -> String {
    format!(
        "background-color:{};color:#ffffff;font-weight:600",
        verdict_swatch(verdict).hex
    )
}

/// `$ 1.234.567`: rounded to whole units, dot-grouped thousands.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-$ {}", grouped)
    } else {
        format!("$ {}", grouped)
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_have_fixed_colours() {
        assert_eq!(verdict_swatch("SEGURO"), SAFE);
        assert_eq!(verdict_swatch(" seguro "), SAFE);
        assert_eq!(verdict_swatch("VERIFICAR"), ALERT);
        assert_eq!(verdict_swatch("Riesgoso"), ALERT);
        assert_eq!(verdict_swatch("FRAUDE"), FRAUD);
    }

    #[test]
    fn decorated_labels_colour_like_threat_counting() {
        for verdict in ["FRAUDE confirmado", "Posible fraude", "RIESGOSO - revisar RUT", "verificar monto"] {
            assert!(metrics::is_negative(verdict), "input {verdict:?}");
            assert_ne!(verdict_swatch(verdict), NEUTRAL, "input {verdict:?}");
            assert_ne!(verdict_swatch(verdict), SAFE, "input {verdict:?}");
        }
        assert_eq!(verdict_swatch("FRAUDE confirmado"), FRAUD);
        assert_eq!(verdict_swatch("RIESGOSO - revisar RUT"), ALERT);
        assert_eq!(verdict_swatch("SEGURO (manual)"), SAFE);
    }

    #[test]
    fn unknown_labels_are_neutral() {
        assert_eq!(verdict_swatch("N/A"), NEUTRAL);
        assert_eq!(verdict_swatch("PENDIENTE"), NEUTRAL);
        assert!(verdict_cell_style("PENDIENTE").contains(NEUTRAL.hex));
    }

    #[test]
    fn currency_uses_dot_thousands() {
        assert_eq!(format_currency(0.0), "$ 0");
        assert_eq!(format_currency(999.4), "$ 999");
        assert_eq!(format_currency(1000.0), "$ 1.000");
        assert_eq!(format_currency(1_234_567.5), "$ 1.234.568");
        assert_eq!(format_currency(-350.0), "-$ 350");
    }

    #[test]
    fn missing_date_shows_placeholder() {
        assert_eq!(format_date(None), PLACEHOLDER);
        assert_eq!(format_date(NaiveDate::from_ymd_opt(2024, 2, 9)), "2024-02-09");
    }
}
