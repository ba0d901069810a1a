//! Central registry for all user-facing message templates.
//!
//! Naming Convention:
//! - `common_*` - Shared/reusable messages across commands
//! - `{command}_{component}` - Command-specific messages (e.g., cluster_create_*, migrate_*)
//!
//! Templates use `{variable}` syntax for runtime values, which are
//! substituted by the `MessageBuilder` / `msg!` macro.

pub struct Messages {
    // ============================================================================
    // Common Messages
    // ============================================================================
    pub common_config_loaded: &'static str,
    pub common_config_not_found_hint: &'static str,
    pub common_error: &'static str,

    // ============================================================================
    // Cluster Messages
    // ============================================================================
    pub cluster_create_failed: &'static str,
    pub cluster_create_starting: &'static str,
    pub cluster_create_success: &'static str,
    pub cluster_delete_failed: &'static str,
    pub cluster_delete_starting: &'static str,
    pub cluster_delete_success: &'static str,
    pub cluster_describe_header: &'static str,
    pub cluster_status_empty: &'static str,
    pub cluster_status_failed: &'static str,
    pub cluster_status_header: &'static str,

    // ============================================================================
    // Metrics Messages
    // ============================================================================
    pub metrics_empty: &'static str,
    pub metrics_failed: &'static str,
    pub metrics_header: &'static str,

    // ============================================================================
    // vCenter Messages
    // ============================================================================
    pub vms_empty: &'static str,
    pub vms_failed: &'static str,
    pub vms_header: &'static str,

    // ============================================================================
    // Migration Messages
    // ============================================================================
    pub migrate_failed: &'static str,
    pub migrate_migrated_vm: &'static str,
    pub migrate_rollback_hint: &'static str,
    pub migrate_snapshot: &'static str,
    pub migrate_starting: &'static str,
    pub migrate_success: &'static str,

    // ============================================================================
    // Rollback Messages
    // ============================================================================
    pub rollback_failed: &'static str,
    pub rollback_starting: &'static str,
    pub rollback_success: &'static str,
}

pub const MESSAGES: Messages = Messages {
    // Common
    common_config_loaded: "Loaded configuration from {path}",
    common_config_not_found_hint: "Create {path} or pass --config <FILE>",
    common_error: "Error: {error}",

    // Cluster
    cluster_create_failed: "❌ Failed to create cluster '{name}': {error}",
    cluster_create_starting: "🚀 Creating EVS cluster '{name}' ({size} x {instance_type})...",
    cluster_create_success: "✅ Cluster '{name}' created (id: {cluster_id}, status: {status})",
    cluster_delete_failed: "❌ Failed to delete cluster '{cluster_id}': {error}",
    cluster_delete_starting: "🗑️ Deleting EVS cluster '{cluster_id}'...",
    cluster_delete_success: "✅ Deletion of cluster '{cluster_id}' requested",
    cluster_describe_header: "Cluster '{cluster_id}':",
    cluster_status_empty: "No EVS clusters found in {region}",
    cluster_status_failed: "❌ Failed to list clusters: {error}",
    cluster_status_header: "EVS clusters in {region}:",

    // Metrics
    metrics_empty: "No datapoints for cluster '{name}' in the requested window",
    metrics_failed: "❌ Failed to fetch metrics for '{name}': {error}",
    metrics_header: "{metric} ({namespace}) for cluster '{name}':",

    // vCenter
    vms_empty: "No virtual machines found on {server}",
    vms_failed: "❌ Failed to list virtual machines: {error}",
    vms_header: "Virtual machines on {server}:",

    // Migration
    migrate_failed: "❌ Migration of '{vm}' failed: {error}",
    migrate_migrated_vm: "   Migrated VM id: {vm_id}",
    migrate_rollback_hint: "Roll back the source VM with: vcf-evs rollback --vm {vm} --snapshot-id <SNAPSHOT_ID>",
    migrate_snapshot: "   Pre-migration snapshot: {snapshot_id}",
    migrate_starting: "🚀 Migrating '{vm}' to EVS cluster '{cluster}'...",
    migrate_success: "✅ Migration of '{vm}' to '{cluster}' completed",

    // Rollback
    rollback_failed: "❌ Rollback of '{vm}' to snapshot '{snapshot_id}' failed",
    rollback_starting: "⏪ Reverting '{vm}' to snapshot '{snapshot_id}'...",
    rollback_success: "✅ '{vm}' reverted to snapshot '{snapshot_id}'",
};
