/// Try to get a keyword from a string, ignoring string casing.
pub fn keyword_from_str(s: &str) -> Option<Keyword> {
    let upper = s.to_ascii_uppercase();
    let idx = KEYWORD_STRINGS
        .binary_search_by(|k| k.cmp(&upper.as_str()))
        .ok()?;
    Some(ALL_KEYWORDS[idx])
}

/// Generate an enum of keywords.
///
/// Keywords must be listed in sorted order.
macro_rules! define_keywords {
    ($($ident:ident),*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($ident),*
        }

        pub const ALL_KEYWORDS: &[Keyword] = &[
            $(Keyword::$ident),*
        ];

        pub const KEYWORD_STRINGS: &[&str] = &[
            $(stringify!($ident),)*
        ];
    };
}

#[rustfmt::skip]
define_keywords!(
    AND,
    AS,
    BY,
    COLUMNS,
    DELETE,
    DESC,
    DESCRIBE,
    DISTINCT,
    FALSE,
    FROM,
    GROUP,
    HAVING,
    INNER,
    INSERT,
    INTO,
    IS,
    JOIN,
    LEFT,
    NOT,
    NULL,
    ON,
    OR,
    OUTER,
    PREPARE,
    SELECT,
    SET,
    SHOW,
    TABLES,
    TRUE,
    UPDATE,
    UPSERT,
    VALUES,
    WHERE
);

impl Keyword {
    /// Reserved keywords can't be used as bare identifiers or aliases.
    pub const fn is_reserved(&self) -> bool {
        !matches!(self, Keyword::COLUMNS | Keyword::TABLES | Keyword::DESC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_sorted() {
        let mut sorted = KEYWORD_STRINGS.to_vec();
        sorted.sort();
        assert_eq!(KEYWORD_STRINGS, sorted.as_slice());
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(Some(Keyword::SELECT), keyword_from_str("select"));
        assert_eq!(Some(Keyword::UPSERT), keyword_from_str("UpSeRt"));
        assert_eq!(None, keyword_from_str("users"));
    }
}
