//! See [NamingStrategy].

/// A pure mapping from a declared field name to the NBT name used on the
/// wire.
///
/// Structure adapters snapshot the engine's strategy when they are built,
/// so changing it afterwards does not affect adapters that already exist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NamingStrategy {
    /// Use the field name verbatim.
    #[default]
    FieldName,
    /// Lowercase the whole field name: `lastPlayed` -> `lastplayed`.
    LowerCase,
    /// Uppercase the whole field name: `lastPlayed` -> `LASTPLAYED`.
    UpperCase,
    /// Capitalize the first letter: `lastPlayed` -> `LastPlayed`.
    UpperCamel,
    /// Split into words, lowercase them and join with the delimiter:
    /// `lastPlayed` -> `last_played` for `"_"`.
    LowerCaseWithDelimiter(String),
    /// Split into words, uppercase them and join with the delimiter:
    /// `lastPlayed` -> `LAST-PLAYED` for `"-"`.
    UpperCaseWithDelimiter(String),
}

impl NamingStrategy {
    /// Applies the strategy to a declared field name.
    pub fn apply(&self, field: &str) -> String {
        match self {
            NamingStrategy::FieldName => field.to_string(),
            NamingStrategy::LowerCase => field.to_lowercase(),
            NamingStrategy::UpperCase => field.to_uppercase(),
            NamingStrategy::UpperCamel => {
                let mut chars = field.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
            NamingStrategy::LowerCaseWithDelimiter(d) => words(field)
                .iter()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
                .join(d),
            NamingStrategy::UpperCaseWithDelimiter(d) => words(field)
                .iter()
                .map(|w| w.to_uppercase())
                .collect::<Vec<_>>()
                .join(d),
        }
    }
}

/// Splits a field name into words at underscores, dashes and camel humps.
fn words(field: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in field.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::NamingStrategy;

    #[test]
    fn transforms() {
        let name = "borderDamagePerBlock";
        assert_eq!(NamingStrategy::FieldName.apply(name), name);
        assert_eq!(
            NamingStrategy::LowerCase.apply(name),
            "borderdamageperblock"
        );
        assert_eq!(
            NamingStrategy::UpperCase.apply(name),
            "BORDERDAMAGEPERBLOCK"
        );
        assert_eq!(
            NamingStrategy::UpperCamel.apply(name),
            "BorderDamagePerBlock"
        );
        assert_eq!(
            NamingStrategy::LowerCaseWithDelimiter("_".into()).apply(name),
            "border_damage_per_block"
        );
        assert_eq!(
            NamingStrategy::UpperCaseWithDelimiter("-".into()).apply(name),
            "BORDER-DAMAGE-PER-BLOCK"
        );
    }

    #[test]
    fn snake_case_fields_split_too() {
        assert_eq!(
            NamingStrategy::UpperCaseWithDelimiter("_".into()).apply("rain_time"),
            "RAIN_TIME"
        );
        assert_eq!(NamingStrategy::UpperCamel.apply(""), "");
    }
}
