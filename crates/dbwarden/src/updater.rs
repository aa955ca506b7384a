//! Access window updater.
//!
//! Turns parsed rules into persisted expiry dates. Rules are applied one at a
//! time in the order they were parsed, so a later rule for the same resource
//! and field overwrites an earlier one. A failing rule is recorded and the
//! rest still run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dbwarden_abac::{DurationSpec, Effect, Rule};
use dbwarden_store::{AccessWindowStore, DEFAULT_TIMEOUT};
use dbwarden_types::{AccessDate, ResourceName, SubjectId, WindowField};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::ApplyError;

// ============================================================================
// Report
// ============================================================================

/// A rule that reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRule {
    pub resource: ResourceName,
    pub effect: Effect,
    pub duration: DurationSpec,
    pub field: WindowField,
    /// Value of `field` before this rule, if the row had one.
    pub previous: Option<AccessDate>,
    pub new: AccessDate,
    pub rows_affected: u64,
}

/// A rule the store could not persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRule {
    pub resource: ResourceName,
    pub effect: Effect,
    pub error: ApplyError,
}

/// Result of applying one subject's rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub subject: SubjectId,
    /// The calendar day every expiry was computed from.
    pub today: AccessDate,
    pub applied: Vec<AppliedRule>,
    pub failed: Vec<FailedRule>,
}

impl ApplyReport {
    fn new(subject: SubjectId, today: AccessDate) -> Self {
        Self {
            subject,
            today,
            applied: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// True when no rule failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total rules attempted.
    pub fn attempted(&self) -> usize {
        self.applied.len() + self.failed.len()
    }
}

// ============================================================================
// Updater
// ============================================================================

/// Applies rules to an injected [`AccessWindowStore`].
#[derive(Clone)]
pub struct AccessWindowUpdater {
    store: Arc<dyn AccessWindowStore>,
    timeout: Duration,
}

impl std::fmt::Debug for AccessWindowUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessWindowUpdater")
            .field("store", &self.store.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AccessWindowUpdater {
    pub fn new(store: Arc<dyn AccessWindowStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the bound passed to every store call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn AccessWindowStore> {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Applies `rules` for `subject`, using the UTC day of `now` as today.
    #[instrument(skip(self, rules), fields(subject = %subject, rules = rules.len()))]
    pub fn apply(&self, subject: &SubjectId, rules: &[Rule], now: DateTime<Utc>) -> ApplyReport {
        let today = AccessDate::today(now);
        let mut report = ApplyReport::new(subject.clone(), today);

        for rule in rules {
            match self.apply_rule(subject, rule, today) {
                Ok(applied) => report.applied.push(applied),
                Err(error) => {
                    warn!(resource = %rule.resource, %error, "rule not applied");
                    report.failed.push(FailedRule {
                        resource: rule.resource.clone(),
                        effect: rule.effect,
                        error,
                    });
                }
            }
        }

        info!(
            attempted = report.attempted(),
            applied = report.applied.len(),
            failed = report.failed.len(),
            %today,
            "claim rules applied"
        );
        report
    }

    fn apply_rule(
        &self,
        subject: &SubjectId,
        rule: &Rule,
        today: AccessDate,
    ) -> Result<AppliedRule, ApplyError> {
        let field = rule.field();

        let previous = self
            .store
            .find(subject, &rule.resource, self.timeout)
            .map_err(|e| ApplyError::persistence(&rule.resource, field, e))?
            .and_then(|window| window.get(field));

        let new = rule.duration.expiry_from(today);

        let rows_affected = self
            .store
            .write_field(subject, &rule.resource, field, new, self.timeout)
            .map_err(|e| ApplyError::persistence(&rule.resource, field, e))?;
        if rows_affected == 0 {
            return Err(ApplyError::persistence(
                &rule.resource,
                field,
                "no row was written",
            ));
        }

        debug!(
            resource = %rule.resource,
            %field,
            previous = ?previous,
            %new,
            "access window updated"
        );

        Ok(AppliedRule {
            resource: rule.resource.clone(),
            effect: rule.effect,
            duration: rule.duration,
            field,
            previous,
            new,
            rows_affected,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use dbwarden_abac::parse;
    use dbwarden_store::{MemoryStore, StoreError, StoreResult};
    use dbwarden_types::AccessWindow;
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> AccessDate {
        AccessDate::from_ymd(y, m, d).unwrap()
    }

    fn subject() -> SubjectId {
        SubjectId::new("u1")
    }

    fn updater_over(store: Arc<dyn AccessWindowStore>) -> AccessWindowUpdater {
        AccessWindowUpdater::new(store).with_timeout(Duration::from_millis(50))
    }

    fn window(store: &MemoryStore, resource: &str) -> AccessWindow {
        store
            .read(&subject(), &ResourceName::new(resource), DEFAULT_TIMEOUT)
            .unwrap()
    }

    /// Fails every call that touches `broken`, delegating the rest.
    struct FlakyStore {
        inner: MemoryStore,
        broken: ResourceName,
        calls: AtomicUsize,
    }

    impl FlakyStore {
        fn new(broken: &str) -> Self {
            Self {
                inner: MemoryStore::new(),
                broken: ResourceName::new(broken),
                calls: AtomicUsize::new(0),
            }
        }

        fn check(&self, resource: &ResourceName) -> StoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *resource == self.broken {
                Err(StoreError::Backend("disk full".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl AccessWindowStore for FlakyStore {
        fn read(
            &self,
            subject: &SubjectId,
            resource: &ResourceName,
            timeout: Duration,
        ) -> StoreResult<AccessWindow> {
            self.check(resource)?;
            self.inner.read(subject, resource, timeout)
        }

        fn write_access_until(
            &self,
            subject: &SubjectId,
            resource: &ResourceName,
            date: AccessDate,
            timeout: Duration,
        ) -> StoreResult<u64> {
            self.check(resource)?;
            self.inner.write_access_until(subject, resource, date, timeout)
        }

        fn write_deny_until(
            &self,
            subject: &SubjectId,
            resource: &ResourceName,
            date: AccessDate,
            timeout: Duration,
        ) -> StoreResult<u64> {
            self.check(resource)?;
            self.inner.write_deny_until(subject, resource, date, timeout)
        }

        fn put(&self, window: &AccessWindow, timeout: Duration) -> StoreResult<u64> {
            self.inner.put(window, timeout)
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    /// Every call times out.
    struct StalledStore;

    impl AccessWindowStore for StalledStore {
        fn read(
            &self,
            _: &SubjectId,
            _: &ResourceName,
            timeout: Duration,
        ) -> StoreResult<AccessWindow> {
            Err(StoreError::Timeout(timeout))
        }

        fn write_access_until(
            &self,
            _: &SubjectId,
            _: &ResourceName,
            _: AccessDate,
            timeout: Duration,
        ) -> StoreResult<u64> {
            Err(StoreError::Timeout(timeout))
        }

        fn write_deny_until(
            &self,
            _: &SubjectId,
            _: &ResourceName,
            _: AccessDate,
            timeout: Duration,
        ) -> StoreResult<u64> {
            Err(StoreError::Timeout(timeout))
        }

        fn put(&self, _: &AccessWindow, timeout: Duration) -> StoreResult<u64> {
            Err(StoreError::Timeout(timeout))
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[test]
    fn test_allow_then_deny_on_same_resource() {
        let store = Arc::new(MemoryStore::new());
        let parsed = parse("accounts:allow:30days,accounts:deny:once");
        let report = updater_over(store.clone()).apply(&subject(), &parsed.rules, now());

        assert!(report.is_complete());
        assert_eq!(report.applied.len(), 2);
        let w = window(&store, "accounts");
        assert_eq!(w.access_until, Some(day(2025, 2, 7)));
        assert_eq!(w.deny_until, Some(day(2025, 1, 8)));
    }

    #[test]
    fn test_deny_without_duration_expires_today() {
        let store = Arc::new(MemoryStore::new());
        let parsed = parse("logs:deny");
        assert_eq!(parsed.warnings.len(), 1);

        updater_over(store.clone()).apply(&subject(), &parsed.rules, now());
        let w = window(&store, "logs");
        assert_eq!(w.deny_until, Some(day(2025, 1, 8)));
        assert_eq!(w.access_until, None);
    }

    #[test]
    fn test_bad_entry_does_not_block_always() {
        let store = Arc::new(MemoryStore::new());
        let parsed = parse("badentry,accounts:allow:always");
        assert_eq!(parsed.errors.len(), 1);

        let report = updater_over(store.clone()).apply(&subject(), &parsed.rules, now());
        assert_eq!(report.applied.len(), 1);
        assert_eq!(
            window(&store, "accounts").access_until,
            Some(AccessDate::far_future())
        );
    }

    #[test]
    fn test_same_day_reapplication_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let updater = updater_over(store.clone());
        let rules = parse("accounts:allow:30days,logs:deny:7").rules;

        updater.apply(&subject(), &rules, now());
        let first = (window(&store, "accounts"), window(&store, "logs"));

        let later = Utc.with_ymd_and_hms(2025, 1, 8, 23, 59, 0).unwrap();
        let report = updater.apply(&subject(), &rules, later);
        let second = (window(&store, "accounts"), window(&store, "logs"));

        assert_eq!(first, second);
        assert_eq!(report.applied[0].previous, Some(day(2025, 2, 7)));
        assert_eq!(report.applied[0].new, day(2025, 2, 7));
    }

    #[test]
    fn test_next_day_rolls_window_forward() {
        let store = Arc::new(MemoryStore::new());
        let updater = updater_over(store.clone());
        let rules = parse("accounts:allow:30").rules;

        updater.apply(&subject(), &rules, now());
        let tomorrow = Utc.with_ymd_and_hms(2025, 1, 9, 1, 0, 0).unwrap();
        updater.apply(&subject(), &rules, tomorrow);

        assert_eq!(window(&store, "accounts").access_until, Some(day(2025, 2, 8)));
    }

    #[test]
    fn test_last_rule_wins_per_field() {
        let store = Arc::new(MemoryStore::new());
        let rules = parse("accounts:allow:90,accounts:allow:1").rules;
        updater_over(store.clone()).apply(&subject(), &rules, now());
        assert_eq!(window(&store, "accounts").access_until, Some(day(2025, 1, 9)));
    }

    #[test]
    fn test_allow_leaves_existing_deny_untouched() {
        let seeded = AccessWindow {
            subject: subject(),
            resource: ResourceName::new("accounts"),
            access_until: None,
            deny_until: Some(day(2025, 3, 1)),
        };
        let store = Arc::new(MemoryStore::new().with_windows([seeded]));
        let rules = parse("accounts:allow:once").rules;
        updater_over(store.clone()).apply(&subject(), &rules, now());

        let w = window(&store, "accounts");
        assert_eq!(w.deny_until, Some(day(2025, 3, 1)));
        assert_eq!(w.access_until, Some(day(2025, 1, 8)));
    }

    #[test]
    fn test_failure_is_isolated_to_its_rule() {
        let store = Arc::new(FlakyStore::new("logs"));
        let rules = parse("accounts:allow:30,logs:deny:once,audit:allow:always").rules;
        let report = updater_over(store.clone()).apply(&subject(), &rules, now());

        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.attempted(), 3);
        assert!(!report.is_complete());

        let failed = &report.failed[0];
        assert_eq!(failed.resource.as_str(), "logs");
        let ApplyError::PersistenceFailure { field, reason, .. } = &failed.error;
        assert_eq!(*field, WindowField::DenyUntil);
        assert!(reason.contains("disk full"));

        let audit = store
            .inner
            .read(&subject(), &ResourceName::new("audit"), DEFAULT_TIMEOUT)
            .unwrap();
        assert_eq!(audit.access_until, Some(AccessDate::far_future()));
    }

    #[test]
    fn test_timeout_is_reported_as_persistence_failure() {
        let report = updater_over(Arc::new(StalledStore)).apply(
            &subject(),
            &parse("accounts:allow:1").rules,
            now(),
        );
        assert!(report.applied.is_empty());
        let ApplyError::PersistenceFailure { reason, .. } = &report.failed[0].error;
        assert!(reason.contains("timed out"));
    }

    #[test]
    fn test_zero_rows_is_a_failure() {
        let store = Arc::new(MemoryStore::update_only());
        let report = updater_over(store).apply(&subject(), &parse("accounts:deny:1").rules, now());
        assert_eq!(report.failed.len(), 1);
    }

    #[test]
    fn test_empty_rule_set_touches_nothing() {
        let store = Arc::new(FlakyStore::new("none"));
        let report = updater_over(store.clone()).apply(&subject(), &[], now());
        assert_eq!(report.attempted(), 0);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_report_serializes_dates_as_iso_days() {
        let store = Arc::new(MemoryStore::new());
        let report =
            updater_over(store).apply(&subject(), &parse("accounts:allow:always").rules, now());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["today"], "2025-01-08");
        assert_eq!(json["applied"][0]["new"], "9999-12-31");
        assert_eq!(json["applied"][0]["field"], "access_until");
    }

    #[test_case("accounts:allow:once", WindowField::AccessUntil, day(2025, 1, 8); "once")]
    #[test_case("accounts:allow:1", WindowField::AccessUntil, day(2025, 1, 9); "one day")]
    #[test_case("accounts:deny:365", WindowField::DenyUntil, day(2026, 1, 8); "a year")]
    #[test_case("accounts:deny:always", WindowField::DenyUntil, AccessDate::far_future(); "always")]
    #[test_case("accounts:allow:soon", WindowField::AccessUntil, day(2025, 1, 8); "unresolved")]
    fn test_single_rule_expiry(dbauth: &str, field: WindowField, expected: AccessDate) {
        let store = Arc::new(MemoryStore::new());
        let report = updater_over(store.clone()).apply(&subject(), &parse(dbauth).rules, now());

        assert_eq!(report.applied[0].field, field);
        assert_eq!(window(&store, "accounts").get(field), Some(expected));
    }

    proptest! {
        #[test]
        fn prop_same_day_apply_is_idempotent(days in 0u32..5000, deny in any::<bool>()) {
            let effect = if deny { "deny" } else { "allow" };
            let rules = parse(&format!("accounts:{effect}:{days}")).rules;
            let store = Arc::new(MemoryStore::new());
            let updater = updater_over(store.clone());

            updater.apply(&subject(), &rules, now());
            let first = window(&store, "accounts");
            updater.apply(&subject(), &rules, now());
            let second = window(&store, "accounts");

            prop_assert_eq!(&first, &second);
            let field = rules[0].effect.target_field();
            prop_assert_eq!(
                first.get(field),
                Some(day(2025, 1, 8).saturating_add_days(u64::from(days)))
            );
        }
    }
}
