//! Audit record shapes.
//!
//! Records are formatted once and handed to a log sink; nothing reads them back.
//! Each renders as one comma-separated line (without the trailing newline).
//! Free-text fields are percent-encoded so a record always keeps its field count.

use chrono::{Local, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Kind of accepted mutation, as written to the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Set,
    Spend,
    BudgetChange,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Set => "SET",
            Action::Spend => "SPEND",
            Action::BudgetChange => "BUDGET_CHANGE",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes `%`, `,`, `\r` and `\n` as `%25`, `%2C`, `%0D` and `%0A`.
struct Field<'a>(&'a str);

impl core::fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut rest = self.0;
        while let Some(idx) = rest.find(['%', ',', '\r', '\n']) {
            f.write_str(&rest[..idx])?;
            let escaped = match rest.as_bytes()[idx] {
                b'%' => "%25",
                b',' => "%2C",
                b'\r' => "%0D",
                _ => "%0A",
            };
            f.write_str(escaped)?;
            rest = &rest[idx + 1..];
        }
        f.write_str(rest)
    }
}

/// `date,time,user,ACTION,amount`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub at: NaiveDateTime,
    pub user: String,
    pub action: Action,
    pub amount: i32,
}

impl TransactionRecord {
    /// Stamp a record with the process-local wall clock.
    pub fn now(user: impl Into<String>, action: Action, amount: i32) -> Self {
        Self {
            at: Local::now().naive_local(),
            user: user.into(),
            action,
            amount,
        }
    }
}

impl core::fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.at.format(DATE_FORMAT),
            self.at.format(TIME_FORMAT),
            Field(&self.user),
            self.action,
            self.amount
        )
    }
}

/// `date,time,user,remoteAddress` — `user` is empty when no credential was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedRecord {
    pub at: NaiveDateTime,
    pub user: String,
    pub remote_addr: String,
}

impl UnauthorizedRecord {
    pub fn now(user: impl Into<String>, remote_addr: impl Into<String>) -> Self {
        Self {
            at: Local::now().naive_local(),
            user: user.into(),
            remote_addr: remote_addr.into(),
        }
    }
}

impl core::fmt::Display for UnauthorizedRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.at.format(DATE_FORMAT),
            self.at.format(TIME_FORMAT),
            Field(&self.user),
            Field(&self.remote_addr)
        )
    }
}
