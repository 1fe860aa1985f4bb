//! Update mode.
//!
//! An update descriptor is accepted and acknowledged; no in-place upgrade
//! is performed yet.

use super::input::UpdateDescriptor;

/// Acknowledge an update request without touching the system.
pub fn acknowledge(update: &UpdateDescriptor) {
    println!("Update requested for {}", update.old_agent_path);
    if let Some(operation) = &update.operation_id {
        println!("  operation: {}", operation);
    }
    if let Some(app) = &update.app_id {
        println!("  app: {}", app);
    }
    println!("Nothing to do: in-place updates are not performed by this installer.");
    tracing::info!(
        old_agent_path = %update.old_agent_path,
        operation_id = ?update.operation_id,
        "update mode is a no-op"
    );
}
