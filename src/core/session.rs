// src/core/session.rs — Per-process governor session state

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{CorrectionMode, LastOutcome, PromptLogEntry, SequenceId};

/// The single session this process governs. Created at startup, never
/// persisted.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub session_start: DateTime<Utc>,
    pub turn_count: u32,
    pub last_delivery_at: Option<DateTime<Utc>>,
    pub budget_spent_estimate: f64,
    /// Sequence currently holding the terminal.
    pub in_flight: Option<SequenceId>,
    /// Set by the first tool call.
    pub activated: bool,
    pub last_outcome: Option<LastOutcome>,
    prompts_log: VecDeque<PromptLogEntry>,
    prompts_log_cap: usize,
}

impl SessionState {
    pub fn new(now: DateTime<Utc>, prompts_log_cap: usize) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            session_start: now,
            turn_count: 0,
            last_delivery_at: None,
            budget_spent_estimate: 0.0,
            in_flight: None,
            activated: false,
            last_outcome: None,
            prompts_log: VecDeque::with_capacity(prompts_log_cap),
            prompts_log_cap,
        }
    }

    /// A primary delivery landed: one turn consumed.
    pub fn record_delivery(&mut self, at: DateTime<Utc>, entry: PromptLogEntry) {
        self.turn_count += 1;
        self.last_delivery_at = Some(at);
        if self.prompts_log_cap == 0 {
            return;
        }
        if self.prompts_log.len() == self.prompts_log_cap {
            self.prompts_log.pop_front();
        }
        self.prompts_log.push_back(entry);
    }

    pub fn begin(&mut self, id: SequenceId) {
        self.in_flight = Some(id);
    }

    /// Release the terminal if `id` still holds it.
    pub fn finish(&mut self, id: SequenceId) {
        if self.in_flight == Some(id) {
            self.in_flight = None;
        }
    }

    pub fn charge(&mut self, usd: f64) {
        self.budget_spent_estimate += usd;
    }

    pub fn refund(&mut self, usd: f64) {
        self.budget_spent_estimate = (self.budget_spent_estimate - usd).max(0.0);
    }

    /// Reconcile the running estimate with an externally observed cost.
    /// Returns the previous estimate.
    pub fn apply_correction(&mut self, mode: CorrectionMode, usd: f64) -> f64 {
        let previous = self.budget_spent_estimate;
        self.budget_spent_estimate = match mode {
            CorrectionMode::Replace => usd,
            CorrectionMode::Adjust => previous + usd,
        }
        .max(0.0);
        previous
    }

    /// Remaining budget, or `None` when no budget is enforced.
    pub fn budget_remaining(&self, budget_usd: f64) -> Option<f64> {
        if budget_usd <= 0.0 {
            return None;
        }
        Some((budget_usd - self.budget_spent_estimate).max(0.0))
    }

    pub fn prompts_log(&self) -> Vec<PromptLogEntry> {
        self.prompts_log.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn entry(turn: u32) -> PromptLogEntry {
        PromptLogEntry {
            turn,
            sequence_id: SequenceId(turn as u64),
            tool: "velle_prompt".into(),
            text_preview: format!("step {turn}"),
            reason: None,
            timestamp: t0(),
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let s = SessionState::new(t0(), 10);
        assert_eq!(s.turn_count, 0);
        assert!(s.last_delivery_at.is_none());
        assert!(s.in_flight.is_none());
        assert!(!s.activated);
        assert!(!s.session_id.is_empty());
    }

    #[test]
    fn test_record_delivery_advances_turn_and_timestamp() {
        let mut s = SessionState::new(t0(), 10);
        s.record_delivery(t0(), entry(1));
        assert_eq!(s.turn_count, 1);
        assert_eq!(s.last_delivery_at, Some(t0()));
        assert_eq!(s.prompts_log().len(), 1);
    }

    #[test]
    fn test_prompts_log_is_bounded() {
        let mut s = SessionState::new(t0(), 3);
        for turn in 1..=5 {
            s.record_delivery(t0(), entry(turn));
        }
        let log = s.prompts_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].turn, 3);
        assert_eq!(log[2].turn, 5);
        assert_eq!(s.turn_count, 5);
    }

    #[test]
    fn test_finish_only_releases_matching_sequence() {
        let mut s = SessionState::new(t0(), 10);
        s.begin(SequenceId(7));
        s.finish(SequenceId(6));
        assert_eq!(s.in_flight, Some(SequenceId(7)));
        s.finish(SequenceId(7));
        assert!(s.in_flight.is_none());
    }

    #[test]
    fn test_refund_never_goes_negative() {
        let mut s = SessionState::new(t0(), 10);
        s.charge(0.15);
        s.refund(0.30);
        assert_eq!(s.budget_spent_estimate, 0.0);
    }

    #[test]
    fn test_correction_replace_and_adjust() {
        let mut s = SessionState::new(t0(), 10);
        s.charge(0.45);
        let prev = s.apply_correction(CorrectionMode::Replace, 1.20);
        assert!((prev - 0.45).abs() < 1e-9);
        assert!((s.budget_spent_estimate - 1.20).abs() < 1e-9);

        s.apply_correction(CorrectionMode::Adjust, -0.20);
        assert!((s.budget_spent_estimate - 1.00).abs() < 1e-9);

        s.apply_correction(CorrectionMode::Adjust, -5.0);
        assert_eq!(s.budget_spent_estimate, 0.0);
    }

    #[test]
    fn test_budget_remaining_disabled_when_zero_budget() {
        let s = SessionState::new(t0(), 10);
        assert_eq!(s.budget_remaining(0.0), None);
        assert_eq!(s.budget_remaining(5.0), Some(5.0));
    }
}
