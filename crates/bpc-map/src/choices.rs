//! Parsing of registry choice strings (`"1, Yes | 2, No (unconfirmed)"`).

/// One `code, label` entry of a choice string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceEntry {
    pub code: String,
    pub label: String,
}

/// Split a choice string into entries.
///
/// Entries are separated by `|` and split once on the first `,`. Entries
/// without a comma, or with an empty code or label, are skipped.
pub fn parse_choices(choices: &str) -> Vec<ChoiceEntry> {
    choices
        .split('|')
        .filter_map(|entry| {
            let (code, label) = entry.split_once(',')?;
            let code = code.trim();
            let label = strip_parenthetical(label);
            if code.is_empty() || label.is_empty() {
                return None;
            }
            Some(ChoiceEntry {
                code: code.to_string(),
                label: label.to_string(),
            })
        })
        .collect()
}

/// Drop one trailing `( ... )` qualifier from a label.
pub fn strip_parenthetical(label: &str) -> &str {
    let trimmed = label.trim();
    if !trimmed.ends_with(')') {
        return trimmed;
    }
    match trimmed.rfind('(') {
        Some(open) => trimmed[..open].trim_end(),
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_skips_malformed() {
        let entries = parse_choices("1, Yes | 2, No (confirmed) | broken | 3, | , Orphan");
        assert_eq!(
            entries,
            vec![
                ChoiceEntry {
                    code: "1".to_string(),
                    label: "Yes".to_string()
                },
                ChoiceEntry {
                    code: "2".to_string(),
                    label: "No".to_string()
                },
            ]
        );
    }

    #[test]
    fn label_commas_after_the_first_are_kept() {
        let entries = parse_choices("7, Carboplatin, AUC 5");
        assert_eq!(entries[0].label, "Carboplatin, AUC 5");
    }

    #[test]
    fn strip_parenthetical_only_touches_trailing_segment() {
        assert_eq!(strip_parenthetical(" Aspirin (alternative) "), "Aspirin");
        assert_eq!(strip_parenthetical("Nab-paclitaxel (Abraxane)"), "Nab-paclitaxel");
        assert_eq!(strip_parenthetical("(NOS) Other"), "(NOS) Other");
        assert_eq!(strip_parenthetical("Ibuprofen"), "Ibuprofen");
    }
}
