//! Bounded in-memory audit log.
//!
//! Entries are appended by the security middleware and inspected through the
//! admin API. The log is capped: once `max_logs` is exceeded the oldest
//! entries are evicted. Nothing is persisted across restarts.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::metrics;
use crate::security::clock::{system_clock, Clock};

/// How much attention an audit entry deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// An event before the logger stamps it with an id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub action: String,
    pub resource: String,
    pub details: serde_json::Value,
    pub ip_address: String,
    pub user_agent: String,
    pub severity: Severity,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    /// A successful, low-severity event with empty details.
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            user_id: None,
            session_id: None,
            action: action.into(),
            resource: resource.into(),
            details: serde_json::Value::Null,
            ip_address: String::new(),
            user_agent: String::new(),
            severity: Severity::Low,
            success: true,
            error: None,
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn client(mut self, ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.ip_address = ip_address.into();
        self.user_agent = user_agent.into();
        self
    }

    pub fn session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Mark the event as failed with a reason.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// A stored audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    /// Epoch milliseconds.
    pub timestamp: u64,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditLogEntry {
    /// High/critical severity or a failed action.
    pub fn is_security_event(&self) -> bool {
        matches!(self.event.severity, Severity::High | Severity::Critical) || !self.event.success
    }
}

/// Field-equality filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        let event = &entry.event;
        optional_matches(&self.user_id, &event.user_id)
            && optional_matches(&self.session_id, &event.session_id)
            && field_matches(&self.action, &event.action)
            && field_matches(&self.resource, &event.resource)
            && field_matches(&self.ip_address, &event.ip_address)
            && field_matches(&self.severity, &event.severity)
            && field_matches(&self.success, &event.success)
    }
}

fn field_matches<T: PartialEq>(wanted: &Option<T>, actual: &T) -> bool {
    wanted.as_ref().map_or(true, |w| w == actual)
}

fn optional_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    wanted.as_ref().map_or(true, |w| actual.as_ref() == Some(w))
}

/// Capped, append-only audit log.
#[derive(Debug)]
pub struct AuditLogger {
    entries: Mutex<VecDeque<AuditLogEntry>>,
    max_logs: usize,
    clock: Arc<dyn Clock>,
}

impl AuditLogger {
    pub fn new(max_logs: usize) -> Self {
        Self::with_clock(max_logs, system_clock())
    }

    pub fn with_clock(max_logs: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_logs.min(1024))),
            max_logs,
            clock,
        }
    }

    pub fn max_logs(&self) -> usize {
        self.max_logs
    }

    /// Stamp and append an event, evicting the oldest entries past the cap.
    pub fn log(&self, event: AuditEvent) -> AuditLogEntry {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            timestamp: self.clock.now_ms(),
            event,
        };

        match entry.event.severity {
            Severity::High | Severity::Critical => tracing::warn!(
                audit_id = %entry.id,
                action = %entry.event.action,
                resource = %entry.event.resource,
                ip = %entry.event.ip_address,
                severity = ?entry.event.severity,
                success = entry.event.success,
                error = ?entry.event.error,
                "Security event"
            ),
            _ => tracing::debug!(
                audit_id = %entry.id,
                action = %entry.event.action,
                resource = %entry.event.resource,
                ip = %entry.event.ip_address,
                severity = ?entry.event.severity,
                success = entry.event.success,
                "Audit event"
            ),
        }

        let len = {
            let mut entries = self.lock();
            entries.push_back(entry.clone());
            while entries.len() > self.max_logs {
                entries.pop_front();
            }
            entries.len()
        };
        metrics::record_audit_log_size(len);

        entry
    }

    /// Entries matching every set field of `filter`, oldest first.
    pub fn logs(&self, filter: &AuditFilter) -> Vec<AuditLogEntry> {
        self.lock()
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }

    /// Every entry, oldest first.
    pub fn all(&self) -> Vec<AuditLogEntry> {
        self.logs(&AuditFilter::default())
    }

    /// Entries with high/critical severity or a failed outcome.
    pub fn security_events(&self) -> Vec<AuditLogEntry> {
        self.lock()
            .iter()
            .filter(|entry| entry.is_security_event())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
        metrics::record_audit_log_size(0);
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AuditLogEntry>> {
        self.entries.lock().expect("audit log mutex poisoned")
    }
}
