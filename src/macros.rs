//! Macros to reduce boilerplate in the codebase

/// Macro to generate Display and FromStr implementations for enums
///
/// # Usage
///
/// ```rust,ignore
/// enum_display_fromstr!(
///     SortDirection,
///     SyncError::InvalidSortDirection,
///     {
///         Asc => "asc",
///         Desc => "desc",
///     }
/// );
/// ```
#[macro_export]
macro_rules! enum_display_fromstr {
    (
        $enum_name:ident,
        $error_variant:path,
        { $($variant:ident => $str:expr),+ $(,)? }
    ) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($enum_name::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::error::SyncError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok($enum_name::$variant),)+
                    _ => Err($error_variant(s.to_string())),
                }
            }
        }
    };
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use crate::error::SyncError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Lane {
        Fast,
        Slow,
    }

    enum_display_fromstr!(Lane, SyncError::Other, { Fast => "fast", Slow => "slow" });

    #[test]
    fn test_display() {
        assert_eq!(Lane::Fast.to_string(), "fast");
        assert_eq!(Lane::Slow.to_string(), "slow");
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(Lane::from_str("FAST").unwrap(), Lane::Fast);
        assert!(matches!(Lane::from_str("medium"), Err(SyncError::Other(s)) if s == "medium"));
    }
}
