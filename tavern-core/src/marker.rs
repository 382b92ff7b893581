// ABOUTME: Marker type identifying the last response unit already accounted for
// ABOUTME: Element-id based when the surface exposes one, positional otherwise

use crate::traits::ResponseUnit;

/// Opaque identity for the most recently observed response unit.
///
/// A positional marker is only meaningful relative to a single non-reloaded
/// surface state; it must be refreshed after any identity change or reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Stable element id exposed by the surface
    Element(String),
    /// Index in rendering order, synthesized when no id exists
    Position(usize),
}

impl Marker {
    /// Derive a marker from one unit, preferring its element id.
    ///
    /// Element ids survive list reorders that break positional markers, so
    /// they win when present.
    pub fn from_unit(unit: &ResponseUnit) -> Self {
        match &unit.element_id {
            Some(id) if !id.is_empty() => Marker::Element(id.clone()),
            _ => Marker::Position(unit.position),
        }
    }

    /// Derive a marker for the newest unit in a snapshot, if any
    pub fn from_last(units: &[ResponseUnit]) -> Option<Self> {
        units.last().map(Self::from_unit)
    }

    /// Resolve this marker to its index within a fresh snapshot.
    ///
    /// `None` means the marker is stale (its unit no longer resolvable, e.g.
    /// after a surface reload); callers treat that as "no last-known
    /// position" and rescan from the start rather than failing.
    pub fn resolve(&self, units: &[ResponseUnit]) -> Option<usize> {
        match self {
            Marker::Element(id) => units
                .iter()
                .position(|u| u.element_id.as_deref() == Some(id.as_str())),
            Marker::Position(index) => (*index < units.len()).then_some(*index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(position: usize, element_id: Option<&str>) -> ResponseUnit {
        ResponseUnit {
            speaker: Some("Nova".to_string()),
            text: format!("message {position}"),
            position,
            element_id: element_id.map(String::from),
        }
    }

    #[test]
    fn test_from_unit_prefers_element_id() {
        let m = Marker::from_unit(&unit(4, Some("mes-4")));
        assert_eq!(m, Marker::Element("mes-4".to_string()));
    }

    #[test]
    fn test_from_unit_falls_back_to_position() {
        let m = Marker::from_unit(&unit(4, None));
        assert_eq!(m, Marker::Position(4));

        // Empty id is as good as no id
        let m = Marker::from_unit(&unit(2, Some("")));
        assert_eq!(m, Marker::Position(2));
    }

    #[test]
    fn test_from_last() {
        assert_eq!(Marker::from_last(&[]), None);

        let units = vec![unit(0, None), unit(1, Some("mes-1"))];
        assert_eq!(
            Marker::from_last(&units),
            Some(Marker::Element("mes-1".to_string()))
        );
    }

    #[test]
    fn test_resolve_element_id() {
        let units = vec![unit(0, Some("a")), unit(1, Some("b")), unit(2, Some("c"))];
        assert_eq!(Marker::Element("b".to_string()).resolve(&units), Some(1));
        assert_eq!(Marker::Element("zz".to_string()).resolve(&units), None);
    }

    #[test]
    fn test_resolve_position_in_range() {
        let units = vec![unit(0, None), unit(1, None)];
        assert_eq!(Marker::Position(1).resolve(&units), Some(1));
    }

    #[test]
    fn test_resolve_position_stale_after_shrink() {
        // Surface reloaded with a shorter transcript: positional marker is
        // stale and must resolve to None, not clamp
        let units = vec![unit(0, None)];
        assert_eq!(Marker::Position(3).resolve(&units), None);
    }

    #[test]
    fn test_markers_compare_by_denoted_unit() {
        assert_eq!(
            Marker::Element("x".to_string()),
            Marker::Element("x".to_string())
        );
        assert_ne!(Marker::Element("x".to_string()), Marker::Position(0));
        assert_ne!(Marker::Position(0), Marker::Position(1));
    }
}
