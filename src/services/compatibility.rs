//! Feature/parameter compatibility matching.
//!
//! A parameter type tag is either `"any"`, a geometry name, or a
//! `dataType` discriminator. Matching is pure and total: features with an
//! unexpected shape simply do not match.

use crate::models::Feature;

/// Tag that accepts every feature.
pub const ANY: &str = "any";

/// Whether `feature` can be passed to a parameter declared with `type_tag`.
///
/// - `"any"` always matches.
/// - `Point` matches point geometries; `LineString` and `Polygon` also
///   accept their `Multi*` counterparts.
/// - Any other tag is compared, lower-cased, against `properties.dataType`
///   (so `"Track"` matches `dataType == "track"`).
pub fn is_compatible(feature: &Feature, type_tag: &str) -> bool {
    match type_tag {
        ANY => true,
        "Point" => feature.geometry_type() == Some("Point"),
        "LineString" => matches!(
            feature.geometry_type(),
            Some("LineString" | "MultiLineString")
        ),
        "Polygon" => matches!(feature.geometry_type(), Some("Polygon" | "MultiPolygon")),
        other => feature.data_type() == Some(other.to_lowercase().as_str()),
    }
}
