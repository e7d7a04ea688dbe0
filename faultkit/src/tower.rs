//! Walking a fault and everything it embeds
//!
//! The tower of a fault is the chain obtained by following
//! [`Fault::embeds`](crate::Fault::embeds) until it runs out, ordered from the
//! innermost (root) cause to the fault that was asked about.

use crate::fault::FaultRef;
use crate::recover::raise;
use crate::standard::{MALFORMED_TOWER, REASON_KEY};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Why a tower could not be built
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TowerError {
    #[error("fault at depth {depth} already appears in its own tower")]
    Cycle { depth: usize },

    #[error("tower of embeds is deeper than {max} levels")]
    TooDeep { max: usize },
}

fn address(fault: &FaultRef) -> *const () {
    Arc::as_ptr(fault) as *const ()
}

/// Whether two handles point at the same fault instance
pub fn same_instance(a: &FaultRef, b: &FaultRef) -> bool {
    address(a) == address(b)
}

/// Lazy walk over a fault and everything it embeds, outermost first.
///
/// Yields `Err` once, and then stops, when a fault shows up twice or the
/// optional depth limit is exceeded.
pub struct Walk {
    current: Option<FaultRef>,
    seen: HashSet<*const ()>,
    // keeps visited faults alive so their addresses cannot be reused
    visited: Vec<FaultRef>,
    max_depth: Option<usize>,
}

impl Walk {
    /// Also stop with [`TowerError::TooDeep`] after `max` levels
    pub fn within(mut self, max: usize) -> Self {
        self.max_depth = Some(max);
        self
    }
}

impl Iterator for Walk {
    type Item = Result<FaultRef, TowerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let fault = self.current.take()?;
        let depth = self.visited.len();

        if let Some(max) = self.max_depth {
            if depth >= max {
                return Some(Err(TowerError::TooDeep { max }));
            }
        }
        if !self.seen.insert(address(&fault)) {
            return Some(Err(TowerError::Cycle { depth }));
        }

        self.current = fault.embeds();
        self.visited.push(Arc::clone(&fault));
        Some(Ok(fault))
    }
}

/// Walk `fault` and its embeds, outermost first. `None` yields nothing.
pub fn walk(fault: Option<&FaultRef>) -> Walk {
    Walk {
        current: fault.cloned(),
        seen: HashSet::new(),
        visited: Vec::new(),
        max_depth: None,
    }
}

fn malformed(err: TowerError) -> ! {
    tracing::error!(error = %err, "malformed tower of embeds");
    raise(
        MALFORMED_TOWER
            .instance()
            .with_context(REASON_KEY, err.to_string())
            .into_ref(),
    )
}

/// Like [`walk`], raising a [`MALFORMED_TOWER`] fault on a cycle
pub(crate) fn descend(fault: Option<&FaultRef>) -> impl Iterator<Item = FaultRef> {
    walk(fault).map(|step| step.unwrap_or_else(|err| malformed(err)))
}

/// Build the tower, reporting a cycle instead of looping.
///
/// `None` yields an empty tower.
pub fn checked_tower(fault: Option<&FaultRef>) -> Result<Vec<FaultRef>, TowerError> {
    let mut tower = walk(fault).collect::<Result<Vec<_>, _>>()?;
    tower.reverse();
    Ok(tower)
}

/// Like [`checked_tower`], also giving up after `max` levels.
///
/// Useful when the chain comes from a [`Fault`](crate::Fault) implementation
/// that may mint a new cause on every call.
pub fn checked_tower_within(
    fault: Option<&FaultRef>,
    max: usize,
) -> Result<Vec<FaultRef>, TowerError> {
    let mut tower = walk(fault).within(max).collect::<Result<Vec<_>, _>>()?;
    tower.reverse();
    Ok(tower)
}

/// The tower of `fault`, innermost cause first, `fault` itself last.
///
/// Chains of any depth are accepted.
///
/// # Panics
///
/// Raises a [`MALFORMED_TOWER`] fault if the chain is cyclic. Such a chain
/// can only come from a broken [`Fault`] implementation.
///
/// [`Fault`]: crate::Fault
pub fn tower_of_embeds(fault: Option<&FaultRef>) -> Vec<FaultRef> {
    let mut tower: Vec<FaultRef> = descend(fault).collect();
    tower.reverse();
    tower
}

/// What `fault` embeds, or `None` for a root or absent fault
pub fn embeds(fault: Option<&FaultRef>) -> Option<FaultRef> {
    let fault = fault?;
    let inner = fault.embeds()?;

    if same_instance(fault, &inner) {
        tracing::error!(fault = %fault, "fault embeds itself");
        raise(
            MALFORMED_TOWER
                .instance()
                .with_context(REASON_KEY, TowerError::Cycle { depth: 0 }.to_string())
                .into_ref(),
        );
    }

    Some(inner)
}

/// The root cause of `fault`
pub fn innermost(fault: Option<&FaultRef>) -> Option<FaultRef> {
    descend(fault).last()
}

/// Every fault's own lines, innermost cause first
pub fn info_lines(fault: Option<&FaultRef>) -> Vec<String> {
    tower_of_embeds(fault)
        .iter()
        .flat_map(|f| f.lines())
        .collect()
}

/// Whether `fault` is the same kind as `target` or anything `target` embeds.
///
/// Kinds match when both carry a code of the same code type with the same
/// value; messages are ignored. A fault without a code only matches by
/// identity. The search stops at the first match.
pub fn is(fault: Option<&FaultRef>, target: Option<&FaultRef>) -> bool {
    let (Some(fault), Some(target)) = (fault, target) else {
        return false;
    };

    if same_instance(fault, target) {
        return true;
    }

    let comparable = fault.as_comparable();

    descend(Some(target)).any(|candidate| {
        same_instance(fault, &candidate) || comparable.is_some_and(|c| c.is_fault(&*candidate))
    })
}
