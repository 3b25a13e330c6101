//! Security-focused logging module to track authentication events

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Types of security events to track
#[derive(Debug, Clone)]
pub enum SecurityEvent {
    // Credential events
    AuthenticationFailed { username: String, reason: String },
    AuthenticationSuccess { user_id: String },
    RegistrationRejected { username: String, error_count: usize },
    UserRegistered { user_id: String },
    ProfileUpdated { user_id: String },

    // Bearer token events
    TokenValidationFailed { reason: String },
    UnauthorizedAccess { user_id: Option<String>, resource: String },

    // System security
    ConfigurationWarning { component: String, warning: String },
}

impl SecurityEvent {
    /// Key used for counters and alert thresholds
    fn key(&self) -> &'static str {
        match self {
            SecurityEvent::AuthenticationFailed { .. } => "auth_failed",
            SecurityEvent::AuthenticationSuccess { .. } => "auth_success",
            SecurityEvent::RegistrationRejected { .. } => "registration_rejected",
            SecurityEvent::UserRegistered { .. } => "user_registered",
            SecurityEvent::ProfileUpdated { .. } => "profile_updated",
            SecurityEvent::TokenValidationFailed { .. } => "token_validation_failed",
            SecurityEvent::UnauthorizedAccess { .. } => "unauthorized_access",
            SecurityEvent::ConfigurationWarning { .. } => "config_warning",
        }
    }
}

/// Security event with timestamp
#[derive(Debug, Clone)]
struct TimestampedEvent {
    event: SecurityEvent,
    timestamp: Instant,
}

/// Records security events, logs them and raises an alert line when a
/// counter crosses its threshold
pub struct SecurityLogger {
    events: RwLock<Vec<TimestampedEvent>>,
    event_counts: RwLock<HashMap<&'static str, usize>>,
    max_events: usize,
    alert_thresholds: HashMap<&'static str, usize>,
}

impl Default for SecurityLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityLogger {
    pub fn new() -> Self {
        let mut alert_thresholds = HashMap::new();
        alert_thresholds.insert("auth_failed", 5);
        alert_thresholds.insert("token_validation_failed", 10);
        alert_thresholds.insert("unauthorized_access", 5);
        alert_thresholds.insert("config_warning", 1);

        Self {
            events: RwLock::new(Vec::new()),
            event_counts: RwLock::new(HashMap::new()),
            max_events: 10000,
            alert_thresholds,
        }
    }

    /// Log a security event
    pub async fn log_event(&self, event: SecurityEvent) {
        let key = event.key();

        {
            let mut events = self.events.write().await;
            events.push(TimestampedEvent {
                event: event.clone(),
                timestamp: Instant::now(),
            });
            if events.len() > self.max_events {
                let overflow = events.len() - self.max_events;
                events.drain(0..overflow);
            }
        }

        {
            let mut counts = self.event_counts.write().await;
            let count = counts.entry(key).or_insert(0);
            *count += 1;

            if let Some(&threshold) = self.alert_thresholds.get(key) {
                if *count % threshold == 0 {
                    log::error!("SECURITY ALERT: {} events of type '{}' detected", count, key);
                    log::error!("Sample event: {:?}", event);
                }
            }
        }

        match event {
            SecurityEvent::AuthenticationFailed { username, reason } => {
                log::warn!("SECURITY: Authentication failed - User: {}, Reason: {}", username, reason);
            }
            SecurityEvent::AuthenticationSuccess { user_id } => {
                log::info!("SECURITY: Authentication success - User: {}", user_id);
            }
            SecurityEvent::RegistrationRejected { username, error_count } => {
                log::info!(
                    "SECURITY: Registration rejected - User: {}, Errors: {}",
                    username,
                    error_count
                );
            }
            SecurityEvent::UserRegistered { user_id } => {
                log::info!("SECURITY: User registered - User: {}", user_id);
            }
            SecurityEvent::ProfileUpdated { user_id } => {
                log::info!("SECURITY: Profile updated - User: {}", user_id);
            }
            SecurityEvent::TokenValidationFailed { reason } => {
                log::warn!("SECURITY: Token validation failed - Reason: {}", reason);
            }
            SecurityEvent::UnauthorizedAccess { user_id, resource } => {
                log::warn!(
                    "SECURITY: Unauthorized access - User: {:?}, Resource: {}",
                    user_id,
                    resource
                );
            }
            SecurityEvent::ConfigurationWarning { component, warning } => {
                log::warn!(
                    "SECURITY: Configuration warning - Component: {}, Warning: {}",
                    component,
                    warning
                );
            }
        }
    }

    /// Get recent security events
    pub async fn get_recent_events(&self, duration: Duration) -> Vec<SecurityEvent> {
        let events = self.events.read().await;
        let now = Instant::now();
        events
            .iter()
            .filter(|e| now.duration_since(e.timestamp) <= duration)
            .map(|e| e.event.clone())
            .collect()
    }

    /// Get event statistics
    pub async fn get_event_stats(&self) -> HashMap<String, usize> {
        let counts = self.event_counts.read().await;
        counts.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    /// Clean up old events
    pub async fn cleanup_old_events(&self, max_age: Duration) {
        let mut events = self.events.write().await;
        let now = Instant::now();
        events.retain(|e| now.duration_since(e.timestamp) <= max_age);
    }

    /// Start periodic cleanup task
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                self.cleanup_old_events(Duration::from_secs(3600 * 24)).await;
            }
        });
    }
}
