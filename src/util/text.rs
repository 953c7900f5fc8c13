//! Small text normalization helpers shared across the schema and overview layers.

/// Title-case a name: every alphabetic character that follows a
/// non-alphabetic character is uppercased, the rest are lowercased
/// (`"order item"` → `"Order Item"`, `"ORDER-ITEM"` → `"Order-Item"`).
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_alpha = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Normalize a display name into a key segment: trimmed, lowercased,
/// spaces replaced with hyphens.
pub fn slugify(input: &str) -> String {
    input.trim().to_lowercase().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::{slugify, title_case};

    #[test]
    fn title_case_capitalizes_each_word() {
        assert_eq!(title_case("order item"), "Order Item");
        assert_eq!(title_case("ORDER"), "Order");
        assert_eq!(title_case("sales-report"), "Sales-Report");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn slugify_normalizes_spacing_and_case() {
        assert_eq!(slugify("  Order Ready  "), "order-ready");
        assert_eq!(slugify("Invoice"), "invoice");
        assert_eq!(slugify("two  spaces"), "two--spaces");
    }
}
