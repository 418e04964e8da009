//! Parametric sweep from mu = infinity down to mu = 0.
//!
//! `Sweep` is a resumable state machine: each call to `step` advances the
//! dictionary to the next breakpoint and yields the interval it just closed.
//! Between calls the dictionary is always consistent, so a caller may stop at
//! any point without corrupting anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use super::{Breakpoint, Frontier};
use crate::canon::{DegenerateStart, MadProblem};
use crate::error::{FrontierError, Result};
use crate::simplex::pivot::{apply, same_mu};
use crate::simplex::{next_pivot, Dictionary, PivotFailure, PivotOutcome, PivotStep, Tolerances};

/// Sweep settings.
#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Zero test for reduced costs, crossings and ratios.
    pub tolerance: f64,
    /// Smallest admissible pivot element.
    pub pivot_tolerance: f64,
    /// Allowed drift on the budget constraint and basic non-negativity.
    pub feasibility_tolerance: f64,
    /// Maximum number of pivots, including degenerate ones.
    pub max_pivots: usize,
    /// Re-derive the dictionary every this many pivots (0 = only on drift).
    pub refactor_interval: usize,
    /// Cooperative abort flag, checked once per pivot.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SweepSettings {
    fn default() -> Self {
        SweepSettings {
            tolerance: 1e-9,
            pivot_tolerance: 1e-11,
            feasibility_tolerance: 1e-8,
            max_pivots: 10_000,
            refactor_interval: 0,
            cancel: None,
        }
    }
}

impl SweepSettings {
    fn tolerances(&self) -> Tolerances {
        Tolerances {
            zero: self.tolerance,
            pivot: self.pivot_tolerance,
        }
    }
}

/// How a sweep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Reached mu = 0.
    Exhausted,
    Unbounded,
    MalformedInput,
    NumericalInstability,
    PivotLimit,
    Aborted,
}

impl Termination {
    fn from_error(err: &FrontierError) -> Self {
        match err {
            FrontierError::Unbounded { .. } => Termination::Unbounded,
            FrontierError::NumericalInstability { .. } => Termination::NumericalInstability,
            FrontierError::PivotLimit { .. } => Termination::PivotLimit,
            FrontierError::Aborted { .. } => Termination::Aborted,
            // Adapter errors are input problems too.
            FrontierError::MalformedInput(_)
            | FrontierError::SolverError(_)
            | FrontierError::Csv(_) => Termination::MalformedInput,
        }
    }
}

/// Sweep state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Initializing,
    Sweeping,
    Terminated(Termination),
}

/// Non-fatal event worth reporting alongside the frontier.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// j* is tied and the tie-break decided some zero-deviation periods.
    DegenerateStart(DegenerateStart),
    /// Pivots taken at mu = infinity before the first record.
    StartRepaired { pivots: usize },
    /// Several columns reached zero reduced cost at the same mu.
    TiedCrossing { mu: f64, columns: Vec<usize> },
    /// Several basic columns tied in the ratio test.
    TiedRatio {
        mu: f64,
        entering: usize,
        columns: Vec<usize>,
    },
    /// Dictionary re-derived from its basis after drift.
    Refactorized { mu: f64, reason: String },
}

/// The parametric controller.
#[derive(Debug)]
pub struct Sweep<'a> {
    problem: &'a MadProblem,
    settings: SweepSettings,
    state: SweepState,
    dict: Option<Dictionary>,
    mu_high: f64,
    pivots: usize,
    since_refactor: usize,
    start_pivots: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Sweep<'a> {
    pub fn new(problem: &'a MadProblem, settings: SweepSettings) -> Self {
        Sweep {
            problem,
            settings,
            state: SweepState::Initializing,
            dict: None,
            mu_high: f64::INFINITY,
            pivots: 0,
            since_refactor: 0,
            start_pivots: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    /// Upper end of the interval currently being explored.
    pub fn mu_high(&self) -> f64 {
        self.mu_high
    }

    /// Pivots performed so far.
    pub fn pivots(&self) -> usize {
        self.pivots
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Current dictionary, once initialised.
    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dict.as_ref()
    }

    /// Advance to the next breakpoint.
    ///
    /// Returns the interval closed by this step, or `None` once the sweep has
    /// terminated. A fatal error terminates the sweep.
    pub fn step(&mut self) -> Result<Option<Breakpoint>> {
        match self.try_step() {
            Ok(record) => Ok(record),
            Err(err) => {
                self.state = SweepState::Terminated(Termination::from_error(&err));
                warn!("sweep terminated: {}", err);
                Err(err)
            }
        }
    }

    /// Run the sweep to mu = 0.
    pub fn run(mut self) -> Result<Frontier> {
        let mut breakpoints = Vec::new();
        while let Some(record) = self.step()? {
            breakpoints.push(record);
        }
        Ok(Frontier {
            assets: self.problem.assets().to_vec(),
            breakpoints,
            diagnostics: self.diagnostics,
            pivots: self.pivots,
        })
    }

    fn try_step(&mut self) -> Result<Option<Breakpoint>> {
        match self.state {
            SweepState::Terminated(_) => return Ok(None),
            SweepState::Initializing => self.initialize()?,
            SweepState::Sweeping => {}
        }

        loop {
            self.check_cancel()?;
            let step = match self.plan()? {
                PivotOutcome::NoMoreBreakpoints => {
                    let record = self.record(0.0, None)?;
                    self.state = SweepState::Terminated(Termination::Exhausted);
                    info!(
                        "sweep finished after {} pivots, final interval (0, {}]",
                        self.pivots, self.mu_high
                    );
                    return Ok(Some(record));
                }
                PivotOutcome::Pivot(step) => step,
            };
            self.note_ties(&step);

            if same_mu(step.mu, self.mu_high, self.settings.tolerance) {
                debug!(
                    "degenerate breakpoint at mu = {}: {} enters, {} leaves",
                    step.mu,
                    self.problem.layout().label(step.entering),
                    self.problem.layout().label(step.leaving)
                );
                self.pivot(&step)?;
                if self.mu_high.is_infinite() {
                    self.start_pivots += 1;
                }
                continue;
            }

            let record = self.record(step.mu, Some(&step))?;
            self.pivot(&step)?;
            self.mu_high = step.mu;
            return Ok(Some(record));
        }
    }

    fn initialize(&mut self) -> Result<()> {
        let problem = self.problem;
        info!(
            "starting sweep: {} assets, {} periods, best asset '{}'",
            problem.num_assets(),
            problem.num_periods(),
            problem.assets()[problem.best_asset()]
        );
        if let Some(degenerate) = problem.degenerate_start() {
            warn!(
                "best asset {} ties with {:?}; periods {:?} assigned to T+",
                degenerate.best_asset, degenerate.tied_assets, degenerate.affected_periods
            );
            self.diagnostics.push(Diagnostic::DegenerateStart(degenerate));
        }

        let dict = Dictionary::from_basis(problem, problem.initial_basis())
            .map_err(|e| e.at_mu(f64::INFINITY, f64::INFINITY))?;
        self.dict = Some(dict);
        self.state = SweepState::Sweeping;
        Ok(())
    }

    fn current(&self) -> Result<&Dictionary> {
        self.dict
            .as_ref()
            .ok_or_else(|| FrontierError::NumericalInstability {
                mu: self.mu_high,
                last_breakpoint: self.mu_high,
                detail: "sweep has no dictionary".into(),
            })
    }

    fn check_cancel(&self) -> Result<()> {
        match &self.settings.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(FrontierError::Aborted {
                last_breakpoint: self.mu_high,
            }),
            _ => Ok(()),
        }
    }

    /// Ask the pivot engine for the next breakpoint, refactorising once if
    /// only tiny pivot elements are available.
    fn plan(&mut self) -> Result<PivotOutcome> {
        let tolerances = self.settings.tolerances();
        match next_pivot(self.current()?, self.mu_high, tolerances) {
            Ok(outcome) => return Ok(outcome),
            Err(PivotFailure::Unbounded { entering, mu }) => {
                return Err(self.unbounded(entering, mu))
            }
            Err(PivotFailure::SmallPivot { mu, element, .. }) => {
                self.refactor(mu, format!("pivot element {:e} below tolerance", element))?;
            }
        }

        match next_pivot(self.current()?, self.mu_high, tolerances) {
            Ok(outcome) => Ok(outcome),
            Err(PivotFailure::Unbounded { entering, mu }) => Err(self.unbounded(entering, mu)),
            Err(PivotFailure::SmallPivot { mu, element, .. }) => {
                Err(FrontierError::NumericalInstability {
                    mu,
                    last_breakpoint: self.mu_high,
                    detail: format!("pivot element {:e} below tolerance after refactorisation", element),
                })
            }
        }
    }

    fn unbounded(&self, entering: usize, mu: f64) -> FrontierError {
        FrontierError::Unbounded {
            entering: self.problem.layout().label(entering),
            mu,
            last_breakpoint: self.mu_high,
        }
    }

    fn note_ties(&mut self, step: &PivotStep) {
        if step.tied_entering.len() > 1 {
            debug!(
                "crossing tie at mu = {} among columns {:?}",
                step.mu, step.tied_entering
            );
            self.diagnostics.push(Diagnostic::TiedCrossing {
                mu: step.mu,
                columns: step.tied_entering.clone(),
            });
        }
        if step.tied_leaving.len() > 1 {
            debug!(
                "ratio tie at mu = {} for entering column {} among {:?}",
                step.mu, step.entering, step.tied_leaving
            );
            self.diagnostics.push(Diagnostic::TiedRatio {
                mu: step.mu,
                entering: step.entering,
                columns: step.tied_leaving.clone(),
            });
        }
    }

    fn pivot(&mut self, step: &PivotStep) -> Result<()> {
        if self.pivots >= self.settings.max_pivots {
            return Err(FrontierError::PivotLimit {
                limit: self.settings.max_pivots,
                last_breakpoint: self.mu_high,
            });
        }

        let feasibility = self.settings.feasibility_tolerance;
        let drift = {
            let dict = self
                .dict
                .as_mut()
                .ok_or_else(|| FrontierError::NumericalInstability {
                    mu: step.mu,
                    last_breakpoint: step.mu,
                    detail: "sweep has no dictionary".into(),
                })?;
            apply(dict, step);
            dict.check_invariants(feasibility).err()
        };
        self.pivots += 1;
        self.since_refactor += 1;
        debug!(
            "pivot {} at mu = {}: {} enters, {} leaves",
            self.pivots,
            step.mu,
            self.problem.layout().label(step.entering),
            self.problem.layout().label(step.leaving)
        );

        if let Some(violation) = drift {
            self.refactor(step.mu, violation.to_string())?;
        } else if self.settings.refactor_interval > 0
            && self.since_refactor >= self.settings.refactor_interval
        {
            let basis = self.current()?.basis().to_vec();
            let fresh = Dictionary::from_basis(self.problem, basis)
                .map_err(|e| e.at_mu(step.mu, self.mu_high))?;
            self.dict = Some(fresh);
            self.since_refactor = 0;
        }
        Ok(())
    }

    /// Re-derive the dictionary from its basis. Fatal if the fresh dictionary
    /// still violates the invariants.
    fn refactor(&mut self, mu: f64, reason: String) -> Result<()> {
        warn!("refactorising dictionary at mu = {}: {}", mu, reason);
        let basis = self.current()?.basis().to_vec();
        let fresh = Dictionary::from_basis(self.problem, basis)
            .map_err(|e| e.at_mu(mu, self.mu_high))?;
        if let Err(violation) = fresh.check_invariants(self.settings.feasibility_tolerance) {
            return Err(FrontierError::NumericalInstability {
                mu,
                last_breakpoint: self.mu_high,
                detail: violation.to_string(),
            });
        }
        self.dict = Some(fresh);
        self.since_refactor = 0;
        self.diagnostics.push(Diagnostic::Refactorized { mu, reason });
        Ok(())
    }

    /// Record the interval (mu_low, mu_high] for the current basis.
    fn record(&mut self, mu_low: f64, step: Option<&PivotStep>) -> Result<Breakpoint> {
        if self.mu_high.is_infinite() && self.start_pivots > 0 {
            warn!(
                "{} pivots needed at mu = infinity to reach the first optimal basis",
                self.start_pivots
            );
            self.diagnostics.push(Diagnostic::StartRepaired {
                pivots: self.start_pivots,
            });
            self.start_pivots = 0;
        }

        let dict = self.current()?;
        let layout = self.problem.layout();
        let tol = self.settings.feasibility_tolerance;
        let mut weights: Vec<f64> = dict
            .allocation()
            .into_iter()
            .map(|w| if w.abs() <= tol { 0.0 } else { w.clamp(0.0, 1.0) })
            .collect();
        // Drift below the feasibility tolerance still has to sum to one.
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter_mut().for_each(|w| *w /= total);
        }

        Ok(Breakpoint {
            mu_low,
            mu_high: self.mu_high,
            basis: dict
                .sorted_basis()
                .into_iter()
                .filter_map(|col| layout.variable(col))
                .collect(),
            weights,
            reward: dict.reward(),
            risk: dict.risk().max(0.0),
            entering: step.and_then(|s| layout.variable(s.entering)),
            leaving: step.and_then(|s| layout.variable(s.leaving)),
        })
    }
}

impl Iterator for Sweep<'_> {
    type Item = Result<Breakpoint>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().transpose()
    }
}
