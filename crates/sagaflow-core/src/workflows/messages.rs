//! User-facing messages for terminal notifications.

use crate::domain::{AppRef, FailurePhase, MUST_BE_ORG_ADMIN, SagaError};

pub fn deletion_succeeded(app: &AppRef) -> String {
    format!("App '{}' was deleted.", app.app_name)
}

pub fn deletion_failed(app: &AppRef, err: &SagaError) -> String {
    if let SagaError::Cancelled { .. } = err {
        return format!("Deletion of app '{}' was cancelled.", app.app_name);
    }
    match err.store_error().map(|e| e.status) {
        Some(403) => format!("You are not allowed to delete app '{}'.", app.app_name),
        Some(404) => format!("App '{}' no longer exists.", app.app_name),
        _ => format!(
            "Something went wrong deleting app '{}'. Please try again.",
            app.app_name
        ),
    }
}

pub fn transfer_succeeded(app: &AppRef, destination: &str) -> String {
    format!("App '{}' was transferred to '{destination}'.", app.app_name)
}

pub fn transfer_failed(app: &AppRef, destination: &str, err: &SagaError) -> String {
    // Ownership already moved; only the rebuild of CI state failed or was cut short.
    if err.phase() == Some(FailurePhase::PostCommit) {
        return format!(
            "App '{}' was transferred to '{destination}', but its build configuration could not be restored.",
            app.app_name
        );
    }
    if let SagaError::Cancelled { .. } = err {
        return format!("Transfer of app '{}' was cancelled.", app.app_name);
    }
    let Some(store_err) = err.store_error() else {
        return format!("Something went wrong transferring app '{}'.", app.app_name);
    };
    if store_err.has_code(MUST_BE_ORG_ADMIN) {
        return format!(
            "You must be an organization admin to transfer app '{}' to '{destination}'.",
            app.app_name
        );
    }
    match store_err.status {
        403 => format!("You are not allowed to transfer app '{}'.", app.app_name),
        404 => format!("Owner '{destination}' was not found."),
        409 => format!(
            "'{destination}' already has an app named '{}'.",
            app.app_name
        ),
        _ => format!(
            "Something went wrong transferring app '{}'. Please try again.",
            app.app_name
        ),
    }
}
