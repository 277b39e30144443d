//! Versioned table vocabulary.
//!
//! The rewriter and the purge orchestrator only ever touch tables named
//! here. The lists are versioned so a schema change produces a new list
//! instead of silently altering the blast radius of a merge or a purge.

/// A dependent table and the foreign-key column it carries
#[derive(Debug, Clone, Copy)]
pub struct DependentTable {
    pub table: &'static str,
    pub fk_column: &'static str,
}

/// A table probed by the consistency validator, with every column that
/// may hold the identifier under scan
#[derive(Debug, Clone, Copy)]
pub struct ProbeTable {
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

pub const TENANTS: &str = "tenants";
pub const USER_PROFILES: &str = "user_profiles";
pub const DELETION_RECORDS: &str = "deletion_records";

/// Tables rewritten when a duplicate tenant is folded into its keeper.
pub const TENANT_DEPENDENTS_V1: &[DependentTable] = &[
    DependentTable {
        table: "tenant_memberships",
        fk_column: "tenant_id",
    },
    DependentTable {
        table: "app_settings",
        fk_column: "tenant_id",
    },
    DependentTable {
        table: "subscriptions",
        fk_column: "tenant_id",
    },
    DependentTable {
        table: "user_profiles",
        fk_column: "tenant_id",
    },
];

/// Tables cleared when a user account is purged, in dependency order:
/// rows with foreign keys into the profile row go first, the profile row
/// itself goes last.
pub const USER_OWNED_V1: &[DependentTable] = &[
    DependentTable {
        table: "subscriptions",
        fk_column: "user_id",
    },
    DependentTable {
        table: "promotions",
        fk_column: "created_by",
    },
    DependentTable {
        table: "tenant_memberships",
        fk_column: "user_id",
    },
    DependentTable {
        table: "user_profiles",
        fk_column: "id",
    },
];

/// Tables the consistency validator probes for residual user references.
pub const USER_REFERENCE_PROBES_V1: &[ProbeTable] = &[
    ProbeTable {
        table: "user_profiles",
        columns: &["id"],
    },
    ProbeTable {
        table: "tenant_memberships",
        columns: &["user_id"],
    },
    ProbeTable {
        table: "subscriptions",
        columns: &["user_id", "created_by"],
    },
    ProbeTable {
        table: "promotions",
        columns: &["created_by"],
    },
    ProbeTable {
        table: "sales",
        columns: &["user_id", "created_by"],
    },
    ProbeTable {
        table: "expenses",
        columns: &["user_id", "created_by"],
    },
    ProbeTable {
        table: "locations",
        columns: &["created_by"],
    },
];

/// Tables the consistency validator probes for residual tenant references.
pub const TENANT_REFERENCE_PROBES_V1: &[ProbeTable] = &[
    ProbeTable {
        table: "tenant_memberships",
        columns: &["tenant_id"],
    },
    ProbeTable {
        table: "app_settings",
        columns: &["tenant_id"],
    },
    ProbeTable {
        table: "subscriptions",
        columns: &["tenant_id"],
    },
    ProbeTable {
        table: "user_profiles",
        columns: &["tenant_id"],
    },
];
