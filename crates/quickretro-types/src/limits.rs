use std::collections::HashSet;

use crate::models::BoardColumn;

pub const MAX_COLUMNS: usize = 5;
pub const MAX_ID_BYTES: usize = 36;
pub const MAX_COLOR_BYTES: usize = 16;
pub const MAX_CATEGORY_TEXT_CHARS: usize = 80;
pub const MAX_TEXT_CHARS: usize = 80;
pub const MAX_TIMER_SECONDS: u16 = 3600;

/// Checks the shape of a full column set: 1 to 5 columns, unique ids,
/// bounded id/color/text.
pub fn validate_columns(columns: &[BoardColumn]) -> Result<(), &'static str> {
    if columns.is_empty() {
        return Err("at least one column is required");
    }
    if columns.len() > MAX_COLUMNS {
        return Err("too many columns");
    }
    let mut seen = HashSet::with_capacity(columns.len());
    for col in columns {
        if col.id.is_empty() || col.id.len() > MAX_ID_BYTES {
            return Err("column id length out of range");
        }
        if col.color.len() > MAX_COLOR_BYTES {
            return Err("column color too long");
        }
        if col.text.chars().count() > MAX_CATEGORY_TEXT_CHARS {
            return Err("column text too long");
        }
        if !seen.insert(col.id.as_str()) {
            return Err("duplicate column id");
        }
    }
    Ok(())
}

pub fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_BYTES
}

pub fn valid_text(text: &str) -> bool {
    text.chars().count() <= MAX_TEXT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(id: &str) -> BoardColumn {
        BoardColumn {
            id: id.into(),
            text: "Went well".into(),
            is_default: true,
            color: "green".into(),
            position: 1,
        }
    }

    #[test]
    fn accepts_one_to_five_columns() {
        assert!(validate_columns(&[col("a")]).is_ok());
        let five: Vec<_> = ["a", "b", "c", "d", "e"].into_iter().map(col).collect();
        assert!(validate_columns(&five).is_ok());
    }

    #[test]
    fn rejects_empty_and_oversized_sets() {
        assert!(validate_columns(&[]).is_err());
        let six: Vec<_> = ["a", "b", "c", "d", "e", "f"].into_iter().map(col).collect();
        assert_eq!(validate_columns(&six), Err("too many columns"));
    }

    #[test]
    fn rejects_field_overflow_and_duplicates() {
        let mut c = col(&"x".repeat(MAX_ID_BYTES + 1));
        assert!(validate_columns(&[c.clone()]).is_err());

        c = col("a");
        c.color = "c".repeat(MAX_COLOR_BYTES + 1);
        assert_eq!(validate_columns(&[c]), Err("column color too long"));

        let mut c = col("a");
        c.text = "é".repeat(MAX_CATEGORY_TEXT_CHARS + 1);
        assert_eq!(validate_columns(&[c]), Err("column text too long"));

        assert_eq!(validate_columns(&[col("a"), col("a")]), Err("duplicate column id"));
    }
}
