//! "Exactly one of" strategy unions.
//!
//! Each strategy block of a `Rebalance` is a struct of optional members.
//! The populated member's name is the discriminant used to pick an
//! implementation from a registry.

use thiserror::Error;

use crate::types::{RebalanceMetrics, RebalancePolicy, RebalanceTarget};

/// A struct of optional members where exactly one should be populated.
pub trait Union {
    /// Family name for error messages ("policy", "target", "metrics").
    const FAMILY: &'static str;

    /// Discriminants of the populated members, in declaration order.
    fn populated(&self) -> Vec<&'static str>;

    /// The single populated discriminant.
    fn discriminant(&self) -> Result<&'static str, UnionError> {
        let populated = self.populated();
        match populated.as_slice() {
            [one] => Ok(*one),
            [] => Err(UnionError::Empty {
                family: Self::FAMILY,
            }),
            _ => Err(UnionError::Ambiguous {
                family: Self::FAMILY,
                found: populated.join(", "),
            }),
        }
    }
}

/// Why a union could not be narrowed to one member.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnionError {
    #[error("{family} must have exactly one member specified, found none")]
    Empty { family: &'static str },

    #[error("{family} must have exactly one member specified, found [{found}]")]
    Ambiguous { family: &'static str, found: String },
}

impl Union for RebalancePolicy {
    const FAMILY: &'static str = "policy";

    fn populated(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.target_tracking.is_some() {
            names.push(Self::TARGET_TRACKING);
        }
        names
    }
}

impl Union for RebalanceTarget {
    const FAMILY: &'static str = "target";

    fn populated(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.route53.is_some() {
            names.push(Self::ROUTE53);
        }
        names
    }
}

impl Union for RebalanceMetrics {
    const FAMILY: &'static str = "metrics";

    fn populated(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.prometheus.is_some() {
            names.push(Self::PROMETHEUS);
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    struct Pair {
        left: Option<u8>,
        right: Option<u8>,
    }

    impl Union for Pair {
        const FAMILY: &'static str = "pair";

        fn populated(&self) -> Vec<&'static str> {
            let mut names = Vec::new();
            if self.left.is_some() {
                names.push("left");
            }
            if self.right.is_some() {
                names.push("right");
            }
            names
        }
    }

    #[test]
    fn single_member_is_the_discriminant() {
        let p = Pair { left: None, right: Some(1) };
        assert_eq!(p.discriminant(), Ok("right"));
    }

    #[test]
    fn empty_union_is_rejected() {
        let p = Pair { left: None, right: None };
        assert_eq!(p.discriminant(), Err(UnionError::Empty { family: "pair" }));
    }

    #[test]
    fn two_members_are_rejected() {
        let p = Pair { left: Some(1), right: Some(2) };
        let err = p.discriminant().unwrap_err();
        assert!(err.to_string().contains("[left, right]"));
    }

    #[test]
    fn resource_unions() {
        let policy = RebalancePolicy {
            target_tracking: Some(TargetTrackingPolicy::default()),
        };
        assert_eq!(policy.discriminant(), Ok("targetTracking"));

        let target = RebalanceTarget {
            route53: Some(Route53Target::default()),
        };
        assert_eq!(target.discriminant(), Ok("route53"));

        assert!(RebalanceMetrics::default().discriminant().is_err());
    }
}
