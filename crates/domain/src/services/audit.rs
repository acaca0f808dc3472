//! Audit entry construction for business handlers.
//!
//! Handlers capture an [`AuditContext`] per request and use the helpers in
//! [`audit_helpers`] to build entries, which they hand to an [`AuditWriter`].
//! Writing never fails from the caller's point of view.

use crate::models::{AuditAction, NewAuditEntry};
use serde_json::{json, Value as JsonValue};

/// Entity id recorded when a mutation did not expose one.
pub const UNKNOWN_ENTITY_ID: &str = "unknown";

/// Request provenance attached to audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub correlation_id: Option<String>,
    pub ip_address: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
}

impl AuditContext {
    /// Context for work not triggered by a request (jobs, startup).
    pub fn system() -> Self {
        Self::default()
    }

    /// Fill the provenance fields of `entry` that are still empty.
    pub fn apply(&self, mut entry: NewAuditEntry) -> NewAuditEntry {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }

        fill(&mut entry.correlation_id, &self.correlation_id);
        fill(&mut entry.user_id, &self.user_id);
        fill(&mut entry.user_email, &self.user_email);
        fill(&mut entry.ip_address, &self.ip_address);
        fill(&mut entry.method, &self.method);
        fill(&mut entry.path, &self.path);
        entry
    }
}

/// Map an ORM-style write operation to its audit action.
///
/// Returns `None` for reads and other operations that are not audited.
pub fn action_for_operation(operation: &str) -> Option<AuditAction> {
    match operation {
        "create" => Some(AuditAction::Create),
        "update" | "updateMany" => Some(AuditAction::Update),
        "delete" | "deleteMany" => Some(AuditAction::Delete),
        _ => None,
    }
}

/// Sink for audit entries.
///
/// Implementations must swallow their own failures; the business operation
/// that produced the entry has already succeeded.
#[async_trait::async_trait]
pub trait AuditWriter: Send + Sync {
    /// Persist an entry, waiting for the attempt to finish.
    async fn write(&self, entry: NewAuditEntry);

    /// Persist an entry without waiting.
    fn write_detached(&self, entry: NewAuditEntry);
}

/// Convenience functions for common audit entry patterns.
pub mod audit_helpers {
    use super::*;

    fn mutation(
        ctx: &AuditContext,
        operation: &str,
        action: AuditAction,
        entity_type: &str,
        entity_id: Option<&str>,
    ) -> NewAuditEntry {
        let entry = NewAuditEntry::new(
            entity_type,
            entity_id.unwrap_or(UNKNOWN_ENTITY_ID),
            action.as_str(),
        )
        .with_metadata(json!({ "operation": operation }));
        ctx.apply(entry)
    }

    /// Entry for a newly created entity.
    pub fn entity_created(
        ctx: &AuditContext,
        entity_type: &str,
        entity_id: Option<&str>,
        after: JsonValue,
    ) -> NewAuditEntry {
        mutation(ctx, "create", AuditAction::Create, entity_type, entity_id).with_after(after)
    }

    /// Entry for an updated entity, capturing both states.
    pub fn entity_updated(
        ctx: &AuditContext,
        entity_type: &str,
        entity_id: &str,
        before: Option<JsonValue>,
        after: JsonValue,
    ) -> NewAuditEntry {
        let mut entry = mutation(ctx, "update", AuditAction::Update, entity_type, Some(entity_id))
            .with_after(after);
        entry.before = before;
        entry
    }

    /// Entry for a deleted entity. `after` is always null.
    pub fn entity_deleted(
        ctx: &AuditContext,
        entity_type: &str,
        entity_id: &str,
        before: Option<JsonValue>,
    ) -> NewAuditEntry {
        let mut entry = mutation(ctx, "delete", AuditAction::Delete, entity_type, Some(entity_id));
        entry.before = before;
        entry
    }

    /// Entry for a bulk or otherwise generic write operation.
    ///
    /// Returns `None` when `operation` is not an audited write.
    pub fn entity_operation(
        ctx: &AuditContext,
        operation: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        args: JsonValue,
    ) -> Option<NewAuditEntry> {
        let action = action_for_operation(operation)?;
        let entry = mutation(ctx, operation, action, entity_type, entity_id)
            .with_metadata(json!({ "operation": operation, "args": args }));
        Some(entry)
    }

    /// Entry for a named domain event (e.g. a stock dispatch) on an entity.
    pub fn domain_event(
        ctx: &AuditContext,
        entity_type: &str,
        entity_id: &str,
        event: &str,
        payload: JsonValue,
    ) -> NewAuditEntry {
        let entry = NewAuditEntry::new(entity_type, entity_id, AuditAction::DomainEvent.as_str())
            .with_metadata(json!({ "event": event, "payload": payload }));
        ctx.apply(entry)
    }
}
