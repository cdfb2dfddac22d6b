//! A1 notation helpers.

/// Right-most column ever read or cleared; matches the header growth limit.
pub const LAST_COLUMN: &str = "ZZ";

/// 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// "A" -> 0, "AA" -> 26. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        n = n.checked_mul(26)? + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(n - 1)
}

/// Parse `D5` / `$D$5` into (0-based column, 1-based row).
pub fn parse_cell(cell: &str) -> Option<(usize, usize)> {
    let cell = cell.trim().replace('$', "");
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    let col = column_index(letters)?;
    let row: usize = digits.parse().ok()?;
    (row > 0).then_some((col, row))
}

/// Quote a sheet title for use in a range: `It's` -> `'It''s'`.
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub fn sheet_range(title: &str, cells: &str) -> String {
    format!("{}!{cells}", quote_title(title))
}

/// Every column the engine may use, all rows.
pub fn whole_sheet(title: &str) -> String {
    sheet_range(title, &format!("A:{LAST_COLUMN}"))
}

/// Split `'Title'!A1:B2` (or `Title!A1`) into the unquoted title and the cell part.
pub fn split_range(range: &str) -> Option<(String, &str)> {
    if let Some(rest) = range.strip_prefix('\'') {
        let mut title = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    title.push('\'');
                    chars.next();
                    continue;
                }
                let after = &rest[i + 1..];
                return match after.strip_prefix('!') {
                    Some(cells) => Some((title, cells)),
                    None if after.is_empty() => Some((title, "")),
                    None => None,
                };
            }
            title.push(c);
        }
        None
    } else {
        match range.split_once('!') {
            Some((title, cells)) => Some((title.to_string(), cells)),
            None => Some((range.to_string(), "")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_roundtrip() {
        for (i, s) in [(0, "A"), (3, "D"), (25, "Z"), (26, "AA"), (701, "ZZ"), (702, "AAA")] {
            assert_eq!(column_letters(i), s);
            assert_eq!(column_index(s), Some(i));
        }
    }

    #[test]
    fn parses_cells_with_and_without_anchors() {
        assert_eq!(parse_cell("D5"), Some((3, 5)));
        assert_eq!(parse_cell("$d$12"), Some((3, 12)));
        assert_eq!(parse_cell("A0"), None);
        assert_eq!(parse_cell("5"), None);
        assert_eq!(parse_cell("D"), None);
    }

    #[test]
    fn quotes_and_splits_titles() {
        let r = whole_sheet("It's 2024");
        assert_eq!(r, "'It''s 2024'!A:ZZ");
        assert_eq!(split_range(&r), Some(("It's 2024".to_string(), "A:ZZ")));
        assert_eq!(split_range("Plain!A1"), Some(("Plain".to_string(), "A1")));
        assert_eq!(split_range("'Open"), None);
    }
}
