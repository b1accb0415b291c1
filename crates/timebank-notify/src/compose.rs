// SPDX-License-Identifier: Apache-2.0

//! Message composition. Pure text builders: the write path composes drafts
//! before committing so they can be queued in the same transaction as the
//! change that caused them.

use chrono::NaiveDate;
use timebank_ledger::{crossed_signal, AllocationPlan, DepletionSignal};
use timebank_model::{
    Client, EmailAddress, Hours, Invitation, NotificationDraft, NotificationKind, PersonName,
    Timebank,
};

/// Dedupe key for balance signals: one live message per bank and signal
/// level, so repeated logs below the same threshold stay quiet.
fn depletion_key(bank: &Timebank, signal: DepletionSignal) -> String {
    format!("depletion:{}:{}", bank.id, signal.as_str())
}

#[must_use]
pub fn depletion_draft(
    client_name: &str,
    contact: &EmailAddress,
    bank: &Timebank,
    signal: DepletionSignal,
) -> NotificationDraft {
    let (kind, subject, detail) = match signal {
        DepletionSignal::Warning => (
            NotificationKind::DepletionWarning,
            format!("Timebank \"{}\" is running low", bank.name),
            format!(
                "{} of {} purchased hours remain.",
                bank.remaining_hours, bank.purchased_hours
            ),
        ),
        DepletionSignal::Exhausted => (
            NotificationKind::Exhausted,
            format!("Timebank \"{}\" is exhausted", bank.name),
            format!(
                "All {} purchased hours have been used.",
                bank.purchased_hours
            ),
        ),
        DepletionSignal::Overdrawn => (
            NotificationKind::Overdrawn,
            format!("Timebank \"{}\" is overdrawn", bank.name),
            format!(
                "The balance is {} hours; purchased pool was {}.",
                bank.remaining_hours, bank.purchased_hours
            ),
        ),
    };
    NotificationDraft {
        kind,
        dedupe_key: depletion_key(bank, signal),
        recipient: contact.clone(),
        subject,
        body: format!("Client {client_name}: {detail}"),
    }
}

/// Depletion drafts for every threshold an allocation plan crosses.
/// `banks_after` is the post-allocation state of the touched banks, as the
/// store returns it (or as the plan predicts it before commit).
#[must_use]
pub fn slice_drafts_for_allocation(
    client: &Client,
    plan: &AllocationPlan,
    banks_after: &[Timebank],
) -> Vec<NotificationDraft> {
    let mut drafts = Vec::new();
    for slice in &plan.slices {
        let Some(bank) = banks_after.iter().find(|b| b.id == slice.bank_id) else {
            continue;
        };
        if let Some(signal) = crossed_signal(
            bank.purchased_hours,
            slice.remaining_before,
            slice.remaining_after,
            client.warn_threshold_pct,
        ) {
            drafts.push(depletion_draft(
                client.name.as_str(),
                &client.contact_email,
                bank,
                signal,
            ));
        }
    }
    drafts
}

/// Echo of a logged entry to the client contact. Only composed when the
/// client has `notify_on_entry` set.
#[must_use]
pub fn entry_logged_draft(
    client: &Client,
    project_name: &str,
    person_name: &str,
    work_date: NaiveDate,
    total: Hours,
) -> NotificationDraft {
    NotificationDraft {
        kind: NotificationKind::EntryLogged,
        dedupe_key: format!(
            "entry:{}:{}:{}:{}",
            client.id, project_name, work_date, total
        ),
        recipient: client.contact_email.clone(),
        subject: format!("{total} hours logged on {project_name}"),
        body: format!(
            "{person_name} logged {total} hours against {project_name} for {work_date}."
        ),
    }
}

#[must_use]
pub fn invite_created_draft(invite: &Invitation, client_name: Option<&str>) -> NotificationDraft {
    let scope = match client_name {
        Some(name) => format!("{} at {name}", invite.role),
        None => invite.role.to_string(),
    };
    NotificationDraft {
        kind: NotificationKind::InviteCreated,
        dedupe_key: format!("invite:{}:created", invite.id),
        recipient: invite.email.clone(),
        subject: "You have been invited to the timebank".to_string(),
        body: format!(
            "You were invited as {scope}. The invitation expires {}.",
            invite.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
    }
}

/// Told to the inviter, not the new user.
#[must_use]
pub fn invite_accepted_draft(
    inviter: &EmailAddress,
    invite: &Invitation,
    accepted_name: &PersonName,
) -> NotificationDraft {
    NotificationDraft {
        kind: NotificationKind::InviteAccepted,
        dedupe_key: format!("invite:{}:accepted", invite.id),
        recipient: inviter.clone(),
        subject: format!("{accepted_name} accepted their invitation"),
        body: format!(
            "{accepted_name} <{}> joined as {}.",
            invite.email, invite.role
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use timebank_ledger::{plan_allocation, BankSnapshot};
    use timebank_model::{
        ClientId, ClientName, TimebankId, TimebankName, TimebankStatus,
    };

    fn client(threshold: u8) -> Client {
        Client {
            id: ClientId::new(),
            name: ClientName::parse("Acme").expect("name"),
            contact_email: EmailAddress::parse("ops@acme.example").expect("email"),
            warn_threshold_pct: threshold,
            notify_on_entry: false,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn bank_after(id: TimebankId, purchased: &str, remaining: &str) -> Timebank {
        let purchased = Hours::parse(purchased).expect("purchased");
        let remaining = Hours::parse(remaining).expect("remaining");
        Timebank {
            id,
            client_id: ClientId::new(),
            name: TimebankName::parse("Retainer").expect("name"),
            purchased_hours: purchased,
            used_hours: purchased - remaining,
            remaining_hours: remaining,
            status: if remaining.is_positive() {
                TimebankStatus::Active
            } else {
                TimebankStatus::Exhausted
            },
            purchased_at: NaiveDate::from_ymd_opt(2026, 1, 5).expect("date"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn crossing_the_warn_line_composes_one_draft() {
        let id = TimebankId::new();
        let snapshot = BankSnapshot {
            id,
            remaining: Hours::parse("9.00").expect("hours"),
            purchased_at: NaiveDate::from_ymd_opt(2026, 1, 5).expect("date"),
        };
        let plan =
            plan_allocation(Hours::parse("2.00").expect("hours"), &[snapshot]).expect("plan");
        let after = bank_after(id, "40.00", "7.00");

        let drafts = slice_drafts_for_allocation(&client(20), &plan, &[after]);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].kind, NotificationKind::DepletionWarning);
        assert_eq!(drafts[0].dedupe_key, format!("depletion:{id}:warning"));
        assert!(drafts[0].body.contains("7.00"));
    }

    #[test]
    fn overdraw_composes_the_strongest_signal_only() {
        let id = TimebankId::new();
        let snapshot = BankSnapshot {
            id,
            remaining: Hours::parse("1.00").expect("hours"),
            purchased_at: NaiveDate::from_ymd_opt(2026, 1, 5).expect("date"),
        };
        let plan =
            plan_allocation(Hours::parse("3.00").expect("hours"), &[snapshot]).expect("plan");
        let after = bank_after(id, "40.00", "-2.00");

        let drafts = slice_drafts_for_allocation(&client(20), &plan, &[after]);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].kind, NotificationKind::Overdrawn);
    }

    #[test]
    fn quiet_allocation_composes_nothing() {
        let id = TimebankId::new();
        let snapshot = BankSnapshot {
            id,
            remaining: Hours::parse("35.00").expect("hours"),
            purchased_at: NaiveDate::from_ymd_opt(2026, 1, 5).expect("date"),
        };
        let plan =
            plan_allocation(Hours::parse("2.00").expect("hours"), &[snapshot]).expect("plan");
        let after = bank_after(id, "40.00", "33.00");
        assert!(slice_drafts_for_allocation(&client(20), &plan, &[after]).is_empty());
    }
}
