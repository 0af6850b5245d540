// src/core/guardrails.rs — Turn limit, cooldown and budget checks

use chrono::{DateTime, Utc};

use super::session::SessionState;
use super::types::{DenyReason, SequenceId};
use crate::infra::config::LimitsConfig;

/// Outcome of a guardrail evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Permit,
    Deny(DenyReason),
}

/// Evaluates a requested delivery against the session and the startup limits.
/// Checks run cheapest first and stop at the first failure.
#[derive(Debug, Clone)]
pub struct GuardrailEngine {
    pub turn_limit: u32,
    pub cooldown_ms: u64,
    pub budget_usd: f64,
    pub cost_per_turn_usd: f64,
}

impl GuardrailEngine {
    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self {
            turn_limit: limits.turn_limit,
            cooldown_ms: limits.cooldown_ms,
            budget_usd: limits.budget_usd,
            cost_per_turn_usd: limits.cost_per_turn_usd,
        }
    }

    /// Pure evaluation; never mutates the session.
    pub fn evaluate(&self, session: &SessionState, now: DateTime<Utc>) -> Verdict {
        match self.run_checks(session, now) {
            Ok(()) => Verdict::Permit,
            Err(reason) => Verdict::Deny(reason),
        }
    }

    fn run_checks(&self, session: &SessionState, now: DateTime<Utc>) -> Result<(), DenyReason> {
        self.check_turn_limit(session)?;
        self.check_cooldown(session, now)?;
        self.check_budget(session)
    }

    /// Evaluate and, on permit, reserve the terminal for `id` and charge the
    /// per-turn estimate. A denial leaves the session untouched.
    pub fn admit(
        &self,
        session: &mut SessionState,
        now: DateTime<Utc>,
        id: SequenceId,
    ) -> Result<(), DenyReason> {
        if let Verdict::Deny(reason) = self.evaluate(session, now) {
            return Err(reason);
        }
        session.begin(id);
        session.charge(self.cost_per_turn_usd);
        Ok(())
    }

    pub fn check_turn_limit(&self, session: &SessionState) -> Result<(), DenyReason> {
        if session.turn_count >= self.turn_limit {
            return Err(DenyReason::TurnLimitReached {
                turn_count: session.turn_count,
                turn_limit: self.turn_limit,
            });
        }
        Ok(())
    }

    pub fn check_cooldown(
        &self,
        session: &SessionState,
        now: DateTime<Utc>,
    ) -> Result<(), DenyReason> {
        if let Some(sequence) = session.in_flight {
            return Err(DenyReason::SequenceInFlight { sequence });
        }
        let Some(last) = session.last_delivery_at else {
            return Ok(());
        };
        let elapsed_ms = (now - last).num_milliseconds();
        let cooldown_ms = i64::try_from(self.cooldown_ms).unwrap_or(i64::MAX);
        if elapsed_ms < cooldown_ms {
            return Err(DenyReason::CooldownActive {
                cooldown_ms: self.cooldown_ms,
                remaining_ms: (cooldown_ms - elapsed_ms.max(0)) as u64,
            });
        }
        Ok(())
    }

    pub fn check_budget(&self, session: &SessionState) -> Result<(), DenyReason> {
        if self.budget_usd <= 0.0 {
            return Ok(());
        }
        if session.budget_spent_estimate >= self.budget_usd {
            return Err(DenyReason::BudgetExceeded {
                spent: session.budget_spent_estimate,
                budget: self.budget_usd,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PromptLogEntry;
    use chrono::{Duration, TimeZone};

    fn engine() -> GuardrailEngine {
        GuardrailEngine {
            turn_limit: 2,
            cooldown_ms: 1000,
            budget_usd: 1.0,
            cost_per_turn_usd: 0.15,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn delivered(session: &mut SessionState, at: DateTime<Utc>) {
        let turn = session.turn_count + 1;
        session.record_delivery(
            at,
            PromptLogEntry {
                turn,
                sequence_id: SequenceId(turn as u64),
                tool: "velle_prompt".into(),
                text_preview: String::new(),
                reason: None,
                timestamp: at,
            },
        );
    }

    #[test]
    fn test_fresh_session_permitted() {
        let s = SessionState::new(t0(), 10);
        assert_eq!(engine().evaluate(&s, t0()), Verdict::Permit);
    }

    #[test]
    fn test_turn_limit_checked_first() {
        let mut s = SessionState::new(t0(), 10);
        delivered(&mut s, t0());
        delivered(&mut s, t0());
        s.budget_spent_estimate = 10.0;
        // Cooldown and budget would also fail; turn limit wins.
        match engine().evaluate(&s, t0()) {
            Verdict::Deny(reason) => assert_eq!(reason.code(), "TURN_LIMIT_REACHED"),
            Verdict::Permit => panic!("expected deny"),
        }
    }

    #[test]
    fn test_cooldown_boundary() {
        let mut s = SessionState::new(t0(), 10);
        delivered(&mut s, t0());
        let e = engine();

        match e.evaluate(&s, t0() + Duration::milliseconds(100)) {
            Verdict::Deny(DenyReason::CooldownActive { remaining_ms, .. }) => {
                assert_eq!(remaining_ms, 900)
            }
            other => panic!("expected cooldown, got {other:?}"),
        }
        assert_eq!(
            e.evaluate(&s, t0() + Duration::milliseconds(1000)),
            Verdict::Permit
        );
    }

    #[test]
    fn test_clock_going_backwards_stays_in_cooldown() {
        let mut s = SessionState::new(t0(), 10);
        delivered(&mut s, t0());
        let verdict = engine().evaluate(&s, t0() - Duration::seconds(5));
        assert!(matches!(
            verdict,
            Verdict::Deny(DenyReason::CooldownActive { .. })
        ));
    }

    #[test]
    fn test_in_flight_sequence_rejected_via_cooldown() {
        let mut s = SessionState::new(t0(), 10);
        s.begin(SequenceId(1));
        match engine().evaluate(&s, t0()) {
            Verdict::Deny(reason) => assert_eq!(reason.code(), "COOLDOWN_ACTIVE"),
            Verdict::Permit => panic!("expected deny"),
        }
    }

    #[test]
    fn test_budget_exceeded() {
        let mut s = SessionState::new(t0(), 10);
        s.budget_spent_estimate = 1.0;
        match engine().evaluate(&s, t0()) {
            Verdict::Deny(reason) => assert_eq!(reason.code(), "BUDGET_EXCEEDED"),
            Verdict::Permit => panic!("expected deny"),
        }
    }

    #[test]
    fn test_zero_budget_disables_check() {
        let mut e = engine();
        e.budget_usd = 0.0;
        let mut s = SessionState::new(t0(), 10);
        s.budget_spent_estimate = 99.0;
        assert_eq!(e.evaluate(&s, t0()), Verdict::Permit);
    }

    #[test]
    fn test_admit_reserves_and_charges() {
        let e = engine();
        let mut s = SessionState::new(t0(), 10);
        e.admit(&mut s, t0(), SequenceId(1)).unwrap();
        assert_eq!(s.in_flight, Some(SequenceId(1)));
        assert!((s.budget_spent_estimate - 0.15).abs() < 1e-9);
        assert_eq!(s.turn_count, 0);
    }

    #[test]
    fn test_denied_admit_has_no_side_effects() {
        let e = engine();
        let mut s = SessionState::new(t0(), 10);
        s.begin(SequenceId(1));
        let before = (s.turn_count, s.last_delivery_at, s.budget_spent_estimate);
        assert!(e.admit(&mut s, t0(), SequenceId(2)).is_err());
        assert_eq!(
            (s.turn_count, s.last_delivery_at, s.budget_spent_estimate),
            before
        );
        assert_eq!(s.in_flight, Some(SequenceId(1)));
    }
}
