//! Resolution of reference URIs embedded in content records.
//!
//! A record that points at another record stores a path such as
//! `/api/content?type=Author&id=4`. `parse_reference_uri` turns that path
//! into a `Target` that can be fetched with `ContentClient::content`.

use std::fmt;

use crate::error::ReferenceError;

/// Path prefix every reference URI must carry.
pub const REFERENCE_PREFIX: &str = "/api/content?";

/// Lookup criteria for a single content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub content_type: String,
    pub id: i64,
}

impl Target {
    /// Canonical reference URI for this target.
    pub fn endpoint(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("type", &self.content_type)
            .append_pair("id", &self.id.to_string())
            .finish();
        format!("{REFERENCE_PREFIX}{query}")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.content_type, self.id)
    }
}

/// Parse a reference URI into a `Target`. `type` is validated before `id`.
pub fn parse_reference_uri(uri: &str) -> Result<Target, ReferenceError> {
    let query = uri
        .strip_prefix(REFERENCE_PREFIX)
        .ok_or_else(|| ReferenceError::Malformed(uri.to_string()))?;

    let mut content_type = None;
    let mut id = None;
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        match k.as_ref() {
            "type" if content_type.is_none() => content_type = Some(v.into_owned()),
            "id" if id.is_none() => id = Some(v.into_owned()),
            _ => {}
        }
    }

    let content_type = content_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ReferenceError::MissingType(uri.to_string()))?;
    let id = id
        .filter(|i| !i.is_empty())
        .ok_or_else(|| ReferenceError::MissingId(uri.to_string()))?;

    Ok(Target {
        content_type,
        id: id.parse()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_and_id() {
        let target = parse_reference_uri("/api/content?type=Test&id=1").unwrap();
        assert_eq!(
            target,
            Target {
                content_type: "Test".to_string(),
                id: 1
            }
        );
    }

    #[test]
    fn parameter_order_does_not_matter() {
        let target = parse_reference_uri("/api/content?id=42&type=Author").unwrap();
        assert_eq!(target.content_type, "Author");
        assert_eq!(target.id, 42);
    }

    #[test]
    fn missing_prefix() {
        let err = parse_reference_uri("/api/content").unwrap_err();
        assert_eq!(err.to_string(), "improperly formatted reference URI: /api/content");
    }

    #[test]
    fn missing_id() {
        let err = parse_reference_uri("/api/content?type=Test&noID=1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "reference URI missing 'id' value: /api/content?type=Test&noID=1"
        );
    }

    #[test]
    fn missing_type() {
        let err = parse_reference_uri("/api/content?noType=Test&id=1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "reference URI missing 'type' value: /api/content?noType=Test&id=1"
        );
    }

    #[test]
    fn empty_values_count_as_missing() {
        assert!(matches!(
            parse_reference_uri("/api/content?type=&id=1"),
            Err(ReferenceError::MissingType(_))
        ));
        assert!(matches!(
            parse_reference_uri("/api/content?type=T&id="),
            Err(ReferenceError::MissingId(_))
        ));
    }

    #[test]
    fn non_numeric_id() {
        let err = parse_reference_uri("/api/content?type=T&id=abc").unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidId(_)));
    }

    #[test]
    fn endpoint_roundtrips() {
        let target = Target {
            content_type: "Blog Post".to_string(),
            id: 7,
        };
        assert_eq!(target.endpoint(), "/api/content?type=Blog+Post&id=7");
        assert_eq!(parse_reference_uri(&target.endpoint()).unwrap(), target);
    }
}
