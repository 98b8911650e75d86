//! Newtype IDs for type-safe entity references.
//!
//! Every table in the booking schema uses a `SERIAL` primary key. The
//! `define_id!` macro wraps those keys so a shop ID can never be passed where
//! an appointment ID is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use chairbook_core::define_id;
/// define_id!(BarberId);
/// define_id!(ChairId);
///
/// let barber = BarberId::new(1);
/// let chair = ChairId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: BarberId = chair;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Entity IDs
define_id!(UserId);
define_id!(ShopId);
define_id!(ServiceId);
define_id!(AppointmentId);
define_id!(AvailableTimeId);
define_id!(ReviewId);

impl UserId {
    /// Parse a user ID from a query or path value.
    ///
    /// Returns `None` for empty strings and the placeholder values clients
    /// send when no employee has been picked (`undefined`, `null`, `any`).
    #[must_use]
    pub fn parse_optional(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || matches!(raw, "undefined" | "null" | "any") {
            return None;
        }
        raw.parse::<i32>().ok().filter(|id| *id > 0).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        let id = AppointmentId::new(42);
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("42"));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_parse_optional_user_id() {
        assert_eq!(UserId::parse_optional("7"), Some(UserId::new(7)));
        assert_eq!(UserId::parse_optional(" 12 "), Some(UserId::new(12)));
        assert_eq!(UserId::parse_optional(""), None);
        assert_eq!(UserId::parse_optional("undefined"), None);
        assert_eq!(UserId::parse_optional("null"), None);
        assert_eq!(UserId::parse_optional("any"), None);
        assert_eq!(UserId::parse_optional("abc"), None);
        assert_eq!(UserId::parse_optional("0"), None);
    }
}
