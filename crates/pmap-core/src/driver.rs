//! Output seam toward hardware programming.
//!
//! The engine never touches hardware. Resolved plans are handed to a
//! [`PlanSink`], which a platform driver (or a test recorder) implements.

use std::convert::Infallible;

use crate::error::MappingError;
use crate::resolver::{PortProfileResolver, PortProgrammingPlan, ResolveRequest};

/// Consumer of resolved programming plans.
pub trait PlanSink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Programs one port.
    fn apply(&mut self, plan: &PortProgrammingPlan) -> Result<(), Self::Error>;
}

/// Collects plans in memory.
impl PlanSink for Vec<PortProgrammingPlan> {
    type Error = Infallible;

    fn apply(&mut self, plan: &PortProgrammingPlan) -> Result<(), Self::Error> {
        self.push(plan.clone());
        Ok(())
    }
}

/// Failure while resolving or applying a batch of plans.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError<E: std::error::Error + 'static> {
    #[error("Failed to resolve plan: {0}")]
    Resolve(#[from] MappingError),

    #[error("Failed to apply plan for port {port}: {source}")]
    Apply {
        port: pmap_types::PortId,
        #[source]
        source: E,
    },
}

/// Resolves every request and applies the plans in order.
///
/// All requests are resolved before any plan is applied, so a bad request
/// leaves the sink untouched. Returns the number of plans applied.
pub fn program_ports<S: PlanSink>(
    resolver: &PortProfileResolver,
    requests: &[ResolveRequest],
    sink: &mut S,
) -> Result<usize, ProgramError<S::Error>> {
    let plans = requests
        .iter()
        .map(|r| resolver.resolve_with(r))
        .collect::<Result<Vec<_>, _>>()?;
    for plan in &plans {
        sink.apply(plan).map_err(|source| ProgramError::Apply {
            port: plan.port,
            source,
        })?;
    }
    Ok(plans.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::snapshot::MappingSnapshot;
    use pmap_types::{PortId, ProfileId};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    #[error("port {0} is administratively locked")]
    struct Locked(PortId);

    struct LockingSink {
        locked: PortId,
        applied: Vec<PortId>,
    }

    impl PlanSink for LockingSink {
        type Error = Locked;

        fn apply(&mut self, plan: &PortProgrammingPlan) -> Result<(), Locked> {
            if plan.port == self.locked {
                return Err(Locked(plan.port));
            }
            self.applied.push(plan.port);
            Ok(())
        }
    }

    fn resolver() -> PortProfileResolver {
        let snapshot =
            MappingSnapshot::from_json_str(&pmap_test::sample_mapping_json(), &LoaderConfig::default())
                .unwrap();
        PortProfileResolver::new(Arc::new(snapshot))
    }

    #[test]
    fn test_program_ports_into_vec() {
        let mut sink: Vec<PortProgrammingPlan> = Vec::new();
        let n = program_ports(
            &resolver(),
            &[
                ResolveRequest::new(PortId(1), ProfileId(22)),
                ResolveRequest::new(PortId(5), ProfileId(22)),
            ],
            &mut sink,
        )
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(sink[1].port, PortId(5));
    }

    #[test]
    fn test_bad_request_applies_nothing() {
        let mut sink: Vec<PortProgrammingPlan> = Vec::new();
        let err = program_ports(
            &resolver(),
            &[
                ResolveRequest::new(PortId(1), ProfileId(22)),
                ResolveRequest::new(PortId(7), ProfileId(26)),
            ],
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, ProgramError::Resolve(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_sink_error_names_port() {
        let mut sink = LockingSink {
            locked: PortId(5),
            applied: Vec::new(),
        };
        let err = program_ports(
            &resolver(),
            &[
                ResolveRequest::new(PortId(1), ProfileId(22)),
                ResolveRequest::new(PortId(5), ProfileId(22)),
            ],
            &mut sink,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to apply plan for port 5: port 5 is administratively locked"
        );
        assert_eq!(sink.applied, vec![PortId(1)]);
    }
}
