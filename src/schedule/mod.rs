//! Account due-time matching
//!
//! An account is due when its activation flag is set and the current hour
//! and minute are both members of its configured clock sets. The check is
//! instantaneous: a tick that does not match is skipped for good, there is
//! no catch-up for missed minutes.

pub mod civil;

use chrono::Timelike;

use crate::models::Account;

/// Check whether an account is due at the given wall-clock instant.
///
/// Pure membership test; never fails on well-formed input. An account with
/// an empty hour or minute set never activates.
pub fn is_due<T: Timelike>(now: &T, account: &Account) -> bool {
    if !account.active {
        return false;
    }

    let hour = now.hour() as u8;
    let minute = now.minute() as u8;

    account.hours.contains(&hour) && account.minutes.contains(&minute)
}

/// Filter a roster down to the accounts due at `now`.
pub fn due_accounts<'a, T: Timelike>(now: &T, roster: &'a [Account]) -> Vec<&'a Account> {
    let mut due = Vec::new();

    for account in roster {
        if !account.active {
            tracing::debug!(account = %account.id, "inactive account skipped");
            continue;
        }
        if is_due(now, account) {
            due.push(account);
        }
    }

    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credentials;
    use chrono::NaiveDate;

    fn account(active: bool, hours: Vec<u8>, minutes: Vec<u8>) -> Account {
        Account {
            id: "alpha".to_string(),
            name: "Alpha".to_string(),
            active,
            hours,
            minutes,
            term_days: None,
            backlog_ref: "alpha.json".to_string(),
            credentials: Credentials::default(),
        }
    }

    fn at(hour: u32, minute: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_due_requires_both_sets_to_match() {
        let account = account(true, vec![9, 21], vec![0, 30]);

        assert!(is_due(&at(9, 30), &account));
        assert!(is_due(&at(21, 0), &account));
        assert!(!is_due(&at(9, 31), &account));
        assert!(!is_due(&at(10, 30), &account));
    }

    #[test]
    fn test_inactive_account_never_due() {
        let account = account(false, vec![9], vec![0]);
        assert!(!is_due(&at(9, 0), &account));
    }

    #[test]
    fn test_empty_hour_set_never_activates() {
        let account = account(true, vec![], vec![0, 15, 30, 45]);

        for hour in 0..24 {
            assert!(!is_due(&at(hour, 0), &account));
            assert!(!is_due(&at(hour, 30), &account));
        }
    }

    #[test]
    fn test_empty_minute_set_never_activates() {
        let account = account(true, vec![9], vec![]);
        assert!(!is_due(&at(9, 0), &account));
    }

    #[test]
    fn test_due_accounts_filters_roster() {
        let roster = vec![
            account(true, vec![9], vec![0]),
            account(false, vec![9], vec![0]),
            account(true, vec![12], vec![0]),
        ];

        let due = due_accounts(&at(9, 0), &roster);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].hours, vec![9]);
    }
}
