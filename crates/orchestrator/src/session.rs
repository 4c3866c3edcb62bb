use crate::call::{CallName, CallOutcome};
use crate::display::DisplayState;
use crate::error::SessionError;
use crate::RequestOrchestrator;
use api_client::AnalysisApi;
use chrono::NaiveDate;
use configuration::{DateSettings, settings::Config};
use core_types::{Action, AnalysisRequest, DateRange, Instrument};
use selection::error::SelectionError;
use selection::{Availability, SelectionSet};
use std::sync::Arc;
use validator::RangePolicy;

/// What happened to an outcome handed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The call's region now shows its result.
    Rendered { sequence: u64, call: CallName },
    /// The call failed; its region stays empty.
    Failed { sequence: u64, call: CallName },
    /// The outcome belongs to an older submission and was dropped.
    Stale { sequence: u64, call: CallName },
}

/// One user's working session: the selection, the last validated window and
/// the display of the latest submission, all behind one handle.
pub struct Session {
    selection: SelectionSet,
    dates: DateSettings,
    date_range: Option<DateRange>,
    orchestrator: RequestOrchestrator,
    display: DisplayState,
    pending: usize,
}

impl Session {
    pub fn new(config: &Config, api: Arc<dyn AnalysisApi>) -> Self {
        let orchestrator = RequestOrchestrator::new(
            api,
            config.orchestrator,
            config.table.rows.clone(),
            config.service.call_timeout,
        );
        Self {
            selection: SelectionSet::new(config.selection, config.catalog.iter().cloned()),
            dates: config.dates,
            date_range: None,
            orchestrator,
            display: DisplayState::default(),
            pending: 0,
        }
    }

    pub fn add(&mut self, instrument: Instrument) -> Result<Availability, SelectionError> {
        self.selection.add(instrument)
    }

    pub fn add_by_identifier(&mut self, identifier: &str) -> Result<Availability, SelectionError> {
        self.selection.add_by_identifier(identifier)
    }

    pub fn remove(&mut self, identifier: &str) -> Availability {
        self.selection.remove(identifier)
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// The window of the last accepted submission.
    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Calls of the current submission that have not reported yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn current_sequence(&self) -> u64 {
        self.orchestrator.current_sequence()
    }

    /// Validates and submits against today's local date.
    pub fn submit(&mut self, start: NaiveDate, end: NaiveDate, action: Action) -> Result<u64, SessionError> {
        let today = chrono::Local::now().date_naive();
        self.submit_as_of(today, start, end, action)
    }

    /// Validates the selection and the window, then dispatches a fresh request.
    ///
    /// On any error nothing is sent and the current display is left as it was.
    pub fn submit_as_of(
        &mut self,
        today: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
        action: Action,
    ) -> Result<u64, SessionError> {
        self.check_selection(action)?;
        let policy = RangePolicy::from_settings(&self.dates, today);
        let date_range = validator::validate(start, end, &policy)?;

        let request = AnalysisRequest {
            tickers: self.selection.identifiers(),
            date_range,
            action,
        };
        let dispatch = self.orchestrator.submit(&request);

        self.date_range = Some(date_range);
        self.display =
            DisplayState::for_submission(dispatch.sequence, &request, self.orchestrator.table_rows());
        self.pending = dispatch.calls.len();
        Ok(dispatch.sequence)
    }

    fn check_selection(&self, action: Action) -> Result<(), SessionError> {
        let availability = self.selection.availability();
        if action.requires_optimization() {
            if !availability.actionable {
                let policy = self.selection.policy();
                let required = match policy.max_instruments {
                    Some(max) => format!("between {} and {}", policy.min_instruments, max),
                    None => format!("at least {}", policy.min_instruments),
                };
                return Err(SessionError::NotActionable {
                    size: availability.size,
                    required,
                });
            }
        } else if self.selection.is_empty() {
            return Err(SessionError::EmptySelection);
        }
        Ok(())
    }

    /// Applies an outcome to the display if it belongs to the current submission.
    pub fn apply(&mut self, outcome: CallOutcome) -> Applied {
        let current = self.orchestrator.is_current(&outcome);
        let CallOutcome { sequence, call, result } = outcome;
        if !current {
            tracing::debug!(
                sequence,
                current = self.orchestrator.current_sequence(),
                %call,
                "Discarding stale outcome."
            );
            return Applied::Stale { sequence, call };
        }

        self.pending = self.pending.saturating_sub(1);
        match result {
            Ok(contribution) => {
                tracing::info!(sequence, %call, "Result rendered.");
                self.display.apply(contribution);
                Applied::Rendered { sequence, call }
            }
            Err(e) => {
                tracing::error!(sequence, %call, error = %e, "Result region left empty.");
                self.display.record_failure(call, &e);
                Applied::Failed { sequence, call }
            }
        }
    }

    /// Waits for the next outcome of any submission and applies or discards it.
    pub async fn next_event(&mut self) -> Option<Applied> {
        let outcome = self.orchestrator.next_outcome().await?;
        Some(self.apply(outcome))
    }

    /// Drives events until every call of the current submission has reported.
    pub async fn settle(&mut self) {
        while self.pending > 0 {
            if self.next_event().await.is_none() {
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
