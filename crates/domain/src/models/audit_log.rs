//! Audit log domain models.
//!
//! An audit entry records one state-changing (or domain) event together with
//! the before/after state of the affected entity. Entries are immutable once
//! written and only disappear through the retention window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use shared::pagination::{self, Paginated};
use shared::validation::{non_blank, parse_iso_timestamp};
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Retention window for audit entries, in seconds (180 days).
pub const AUDIT_RETENTION_SECS: u64 = 15_552_000;

/// Retention window for audit entries, in days.
pub const AUDIT_RETENTION_DAYS: u64 = AUDIT_RETENTION_SECS / 86_400;

/// Documented audit actions.
///
/// Entries store the action as a plain string, so values outside this set are
/// accepted and kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    DomainEvent,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::DomainEvent => "DOMAIN_EVENT",
        }
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(AuditAction::Create),
            "UPDATE" => Ok(AuditAction::Update),
            "DELETE" => Ok(AuditAction::Delete),
            "DOMAIN_EVENT" => Ok(AuditAction::DomainEvent),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity types covered by structured audits.
///
/// This list is advisory: the store accepts any entity type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditedEntity {
    Product,
    ProductBatch,
    ProductCategory,
    Inventory,
    Warehouse,
    Location,
    StockMovement,
}

impl AuditedEntity {
    pub const ALL: [AuditedEntity; 7] = [
        AuditedEntity::Product,
        AuditedEntity::ProductBatch,
        AuditedEntity::ProductCategory,
        AuditedEntity::Inventory,
        AuditedEntity::Warehouse,
        AuditedEntity::Location,
        AuditedEntity::StockMovement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditedEntity::Product => "Product",
            AuditedEntity::ProductBatch => "ProductBatch",
            AuditedEntity::ProductCategory => "ProductCategory",
            AuditedEntity::Inventory => "Inventory",
            AuditedEntity::Warehouse => "Warehouse",
            AuditedEntity::Location => "Location",
            AuditedEntity::StockMovement => "StockMovement",
        }
    }

    /// Whether `entity_type` names one of the documented audited entities.
    pub fn is_known(entity_type: &str) -> bool {
        entity_type.parse::<AuditedEntity>().is_ok()
    }
}

impl FromStr for AuditedEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditedEntity::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("Unknown audited entity: {}", s))
    }
}

impl std::fmt::Display for AuditedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub ip_address: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub before: Option<JsonValue>,
    pub after: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
}

/// Input for writing a new audit entry.
///
/// `timestamp` is stamped with the write time when left empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub correlation_id: Option<String>,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub ip_address: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub before: Option<JsonValue>,
    pub after: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
}

impl NewAuditEntry {
    /// Create a new entry for the given entity and action.
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the acting user.
    pub fn with_user(mut self, user_id: impl Into<String>, email: Option<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.user_email = email;
        self
    }

    /// Set request provenance.
    pub fn with_request(
        mut self,
        ip_address: Option<String>,
        method: Option<String>,
        path: Option<String>,
    ) -> Self {
        self.ip_address = ip_address;
        self.method = method;
        self.path = path;
        self
    }

    pub fn with_before(mut self, before: JsonValue) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_after(mut self, after: JsonValue) -> Self {
        self.after = Some(after);
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Materialize the stored form under the given id and timestamp.
    pub fn into_entry(self, id: Uuid, timestamp: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            id,
            timestamp,
            correlation_id: self.correlation_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action: self.action,
            user_id: self.user_id,
            user_email: self.user_email,
            ip_address: self.ip_address,
            method: self.method,
            path: self.path,
            before: self.before,
            after: self.after,
            metadata: self.metadata,
        }
    }
}

/// Normalized audit log query.
///
/// All filters are conjunctive. `page` is 1-based and `limit` lies in 1..=200.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for AuditLogQuery {
    fn default() -> Self {
        Self {
            entity_type: None,
            entity_id: None,
            action: None,
            user_id: None,
            start_date: None,
            end_date: None,
            search: None,
            page: pagination::DEFAULT_PAGE,
            limit: pagination::DEFAULT_LIMIT,
        }
    }
}

impl AuditLogQuery {
    pub fn with_entity(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Inclusive timestamp bounds; either side may be open.
    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Set pagination, clamping into the accepted ranges.
    pub fn paged(mut self, page: u32, limit: u32) -> Self {
        self.page = pagination::normalize_page(Some(page));
        self.limit = pagination::normalize_limit(Some(limit));
        self
    }

    /// Rows to skip for the requested page.
    pub fn offset(&self) -> i64 {
        pagination::offset(self.page, self.limit)
    }
}

/// Query parameters for `GET /audit-logs`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListAuditLogsParams {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 200, message = "Limit must be between 1 and 200"))]
    pub limit: Option<u32>,
    pub search: Option<String>,
}

impl ListAuditLogsParams {
    /// Validate the raw parameters and convert them into an [`AuditLogQuery`].
    ///
    /// Blank filters are dropped; dates must parse as ISO-8601.
    pub fn into_query(self) -> Result<AuditLogQuery, ValidationErrors> {
        self.validate()?;

        let mut errors = ValidationErrors::new();
        let start_date = parse_bound(self.start_date, "startDate", &mut errors);
        let end_date = parse_bound(self.end_date, "endDate", &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(AuditLogQuery {
            entity_type: non_blank(self.entity_type),
            entity_id: non_blank(self.entity_id),
            action: non_blank(self.action),
            user_id: non_blank(self.user_id),
            start_date,
            end_date,
            search: non_blank(self.search),
            page: pagination::normalize_page(self.page),
            limit: pagination::normalize_limit(self.limit),
        })
    }
}

fn parse_bound(
    raw: Option<String>,
    field: &'static str,
    errors: &mut ValidationErrors,
) -> Option<DateTime<Utc>> {
    let raw = non_blank(raw)?;
    match parse_iso_timestamp(&raw) {
        Ok(ts) => Some(ts),
        Err(e) => {
            errors.add(field, e);
            None
        }
    }
}

/// Paginated audit log listing.
pub type AuditLogPage = Paginated<AuditEntry>;
