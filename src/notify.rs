// src/notify.rs

//! Outward notification fan-out collaborator.
//!
//! Staff messages in monitored rooms and server warnings fan out through
//! this seam (push/SMS/etc. live behind it). Two tiers: `notify_all` for
//! the full receiver list and `notify_min` for the minimal test-alert
//! list.

use log::info;

pub trait Notifier: Send + Sync {
    fn notify_all(&self, message: &str);
    fn notify_min(&self, message: &str);
}

/// Default notifier that only logs. Useful for deployments without an
/// external fan-out service and for tests.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_all(&self, message: &str) {
        info!("[Notify] (all) {message}");
    }

    fn notify_min(&self, message: &str) {
        info!("[Notify] (min) {message}");
    }
}
