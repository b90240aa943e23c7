//! Importance measures of basic events.
//!
//! Both measures reduce to asking an external solver for the CDF of the top
//! event of a (restricted or modified) fault tree. The solver sees a fresh
//! tree on every call.

use indexmap::IndexMap;
use log::{debug, trace};

use crate::error::{Error, Result};
use crate::fault::InternalFaultMode;
use crate::model::System;
use crate::reduce::{NodeChanger, TreeCutter};
use crate::tree::FaultTree;
use crate::types::ErrorModeId;

/// Computes the CDF of the top event of a fault tree over a fixed time grid.
pub trait CdfSolver {
    fn cdf(&mut self, tree: &FaultTree) -> Result<Vec<f64>>;
}

impl<F> CdfSolver for F
where
    F: FnMut(&FaultTree) -> Result<Vec<f64>>,
{
    fn cdf(&mut self, tree: &FaultTree) -> Result<Vec<f64>> {
        self(tree)
    }
}

/// Per-event measure over the solver's time grid, keyed by basic-event name.
pub type Measures = IndexMap<String, Vec<f64>>;

/// Fussell-Vesely importance: for each basic event, the mean CDF of the
/// minimal cut sets containing it. Events in no cut set measure zero.
pub fn fussell_vesely(system: &System, error_mode: ErrorModeId, solver: &mut dyn CdfSolver) -> Result<Measures> {
    let tree = system.fault_tree(error_mode)?;
    let cut_sets = tree.minimal_cut_sets()?;
    debug!("fussell-vesely over {} cut sets", cut_sets.len());

    let mut sums: IndexMap<String, (Vec<f64>, usize)> = tree
        .basic_events()
        .into_iter()
        .map(|id| (tree.name(id).to_string(), (Vec::new(), 0)))
        .collect();

    let mut grid = 0;
    for cut_set in &cut_sets {
        let names = cut_set.names(&tree);
        let mut restricted = system.fault_tree(error_mode)?;
        TreeCutter::new(names.iter().cloned()).reduce(&mut restricted);
        let cdf = solver.cdf(&restricted)?;
        trace!("cut set {} -> {:?}", cut_set.display(&tree), cdf);
        grid = cdf.len();

        for name in names {
            if let Some((sum, count)) = sums.get_mut(&name) {
                accumulate(sum, &cdf)?;
                *count += 1;
            }
        }
    }

    Ok(sums
        .into_iter()
        .map(|(name, (sum, count))| {
            let mean = if count == 0 {
                vec![0.0; grid]
            } else {
                sum.into_iter().map(|v| v / count as f64).collect()
            };
            (name, mean)
        })
        .collect())
}

/// Birnbaum importance: for each basic event, the CDF of the top event given
/// that the event has occurred at time zero, minus the CDF given that it
/// never occurs.
pub fn birnbaum(system: &System, error_mode: ErrorModeId, solver: &mut dyn CdfSolver) -> Result<Measures> {
    let reference = system.fault_tree(error_mode)?;
    let names: Vec<String> = reference
        .basic_events()
        .into_iter()
        .map(|id| reference.name(id).to_string())
        .collect();
    debug!("birnbaum over {} basic events", names.len());

    let mut measures = Measures::new();
    for name in &names {
        let mut forced = system.fault_tree(error_mode)?;
        let original = NodeChanger::substitute(&mut forced, name, InternalFaultMode::occurred(name.as_str()));
        let with_event = solver.cdf(&forced)?;
        if let Some(original) = original {
            NodeChanger::substitute(&mut forced, name, original);
        }

        let mut without = system.fault_tree(error_mode)?;
        let others = names.iter().filter(|&other| other != name).cloned();
        let without_event = if TreeCutter::new(others).reduce(&mut without) {
            solver.cdf(&without)?
        } else {
            // The top event needs this event.
            vec![0.0; with_event.len()]
        };
        if without_event.len() != with_event.len() {
            return Err(Error::Solver(format!(
                "CDF lengths differ for `{}`: {} and {}",
                name,
                with_event.len(),
                without_event.len()
            )));
        }

        let difference = with_event.iter().zip(&without_event).map(|(a, b)| a - b).collect();
        measures.insert(name.clone(), difference);
    }
    Ok(measures)
}

/// Adds `cdf` pointwise into `sum`, sizing `sum` on first use.
fn accumulate(sum: &mut Vec<f64>, cdf: &[f64]) -> Result<()> {
    if sum.is_empty() {
        sum.resize(cdf.len(), 0.0);
    }
    if sum.len() != cdf.len() {
        return Err(Error::Solver(format!(
            "CDF has {} points, expected {}",
            cdf.len(),
            sum.len()
        )));
    }
    for (s, v) in sum.iter_mut().zip(cdf) {
        *s += v;
    }
    Ok(())
}
