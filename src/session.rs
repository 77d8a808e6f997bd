//! Login session capture, the dashboard guard and logout.

use std::future::Future;
use std::time::Duration;

use chrono::{Local, Offset};

use crate::clock::{Clock, SystemClock};
use crate::core::session::{DeviceInfo, Geolocation, LoginRecord};
use crate::error::{LocationError, SessionError, StoreError, ValidationError};
use crate::store::{CURRENT_USER_SLOT, KeyValueStore, LOGIN_DATA_SLOT, Loaded, load_json, save_json};

/// Source of device facts. Always answers.
pub trait DeviceProbe {
    fn device_info(&self) -> DeviceInfo;
}

/// Source of a single position reading.
pub trait LocationProvider {
    fn locate(&self) -> impl Future<Output = Result<Geolocation, LocationError>> + Send;
}

/// Device facts read from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDeviceProbe;

impl DeviceProbe for SystemDeviceProbe {
    fn device_info(&self) -> DeviceInfo {
        collect_device_info(|name| std::env::var(name).ok())
    }
}

fn collect_device_info(var: impl Fn(&str) -> Option<String>) -> DeviceInfo {
    let language = ["LC_ALL", "LC_MESSAGES", "LANG"]
        .into_iter()
        .filter_map(&var)
        .find_map(|v| normalize_locale(&v))
        .unwrap_or_else(|| "en-US".to_string());

    let screen_resolution = match (var("COLUMNS"), var("LINES")) {
        (Some(cols), Some(lines)) if !cols.trim().is_empty() && !lines.trim().is_empty() => {
            format!("{}x{}", cols.trim(), lines.trim())
        }
        _ => "unknown".to_string(),
    };

    let timezone = var("TZ")
        .map(|tz| tz.trim_start_matches(':').to_string())
        .filter(|tz| !tz.is_empty())
        .unwrap_or_else(|| utc_offset_label(Local::now().offset().fix().local_minus_utc()));

    DeviceInfo {
        user_agent: format!(
            "taskflow/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        ),
        platform: std::env::consts::OS.to_string(),
        language,
        screen_resolution,
        timezone,
    }
}

/// `en_US.UTF-8` → `en-US`. The C locale has no language.
fn normalize_locale(raw: &str) -> Option<String> {
    let base = raw.split(['.', '@']).next().unwrap_or("").trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

fn utc_offset_label(offset_secs: i32) -> String {
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let abs = offset_secs.unsigned_abs();
    format!("UTC{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
}

/// The device has no way to tell where it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    async fn locate(&self) -> Result<Geolocation, LocationError> {
        Err(LocationError::Unavailable)
    }
}

/// A position fixed in configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Geolocation);

impl LocationProvider for FixedLocation {
    async fn locate(&self) -> Result<Geolocation, LocationError> {
        Ok(self.0)
    }
}

/// Whether a session is active, as seen when the dashboard loads.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn {
        username: String,
        /// `None` when the marker is set but the record is gone or unreadable.
        record: Option<LoginRecord>,
    },
}

pub struct SessionManager<S, C = SystemClock> {
    store: S,
    clock: C,
    geolocation_timeout: Duration,
}

impl<S: KeyValueStore> SessionManager<S> {
    pub fn new(store: S, geolocation_timeout: Duration) -> Self {
        Self::with_clock(store, SystemClock, geolocation_timeout)
    }
}

impl<S: KeyValueStore, C: Clock> SessionManager<S, C> {
    pub fn with_clock(store: S, clock: C, geolocation_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            geolocation_timeout,
        }
    }

    /// Capture a login record and mark `username` as the current user.
    /// A failed or slow geolocation reading only drops the position.
    pub async fn login<D, L>(
        &self,
        username: &str,
        device: &D,
        location: &L,
    ) -> Result<LoginRecord, SessionError>
    where
        D: DeviceProbe,
        L: LocationProvider,
    {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::EmptyUsername.into());
        }

        let geolocation = match tokio::time::timeout(self.geolocation_timeout, location.locate()).await {
            Ok(Ok(position)) => Some(position),
            Ok(Err(e)) => {
                log::warn!("Logging in without location: {}", e);
                None
            }
            Err(_) => {
                let e = LocationError::TimedOut(self.geolocation_timeout.as_secs());
                log::warn!("Logging in without location: {}", e);
                None
            }
        };

        let record = LoginRecord {
            username: username.to_string(),
            timestamp: self.clock.now(),
            device: device.device_info(),
            geolocation,
        };

        save_json(&self.store, LOGIN_DATA_SLOT, &record)?;
        self.store.set(CURRENT_USER_SLOT, username)?;

        log::info!("User {} logged in", username);
        Ok(record)
    }

    pub fn current_user(&self) -> Result<Option<String>, StoreError> {
        Ok(self.store.get(CURRENT_USER_SLOT)?.filter(|u| !u.is_empty()))
    }

    /// The dashboard guard: no marker means logged out.
    pub fn state(&self) -> Result<SessionState, StoreError> {
        let Some(username) = self.current_user()? else {
            return Ok(SessionState::LoggedOut);
        };

        let record = match load_json::<LoginRecord, _>(&self.store, LOGIN_DATA_SLOT)? {
            Loaded::Value(record) => Some(record),
            Loaded::Absent => {
                log::warn!("Session marker for {} has no login record", username);
                None
            }
            Loaded::Malformed { error, .. } => {
                log::warn!("Login record for {} is unreadable: {}", username, error);
                None
            }
        };

        Ok(SessionState::LoggedIn { username, record })
    }

    pub fn logout(&self) -> Result<(), StoreError> {
        let user = self.current_user()?;
        self.store.remove(CURRENT_USER_SLOT)?;
        self.store.remove(LOGIN_DATA_SLOT)?;
        if let Some(user) = user {
            log::info!("User {} logged out", user);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Arc;

    struct StubDevice;

    impl DeviceProbe for StubDevice {
        fn device_info(&self) -> DeviceInfo {
            DeviceInfo {
                user_agent: "taskflow/test".into(),
                platform: "linux".into(),
                language: "en-US".into(),
                screen_resolution: "80x24".into(),
                timezone: "UTC".into(),
            }
        }
    }

    struct DeniedLocation;

    impl LocationProvider for DeniedLocation {
        async fn locate(&self) -> Result<Geolocation, LocationError> {
            Err(LocationError::Denied)
        }
    }

    struct HangingLocation;

    impl LocationProvider for HangingLocation {
        async fn locate(&self) -> Result<Geolocation, LocationError> {
            std::future::pending().await
        }
    }

    fn manager() -> SessionManager<Arc<MemoryStore>, ManualClock> {
        SessionManager::with_clock(
            Arc::new(MemoryStore::new()),
            ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 12).unwrap()),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn login_with_denied_location() {
        let sessions = manager();
        let record = sessions.login("alice", &StubDevice, &DeniedLocation).await.unwrap();

        assert_eq!(record.username, "alice");
        assert_eq!(record.geolocation, None);
        assert_eq!(record.device, StubDevice.device_info());
        assert_eq!(sessions.current_user().unwrap().as_deref(), Some("alice"));
        assert_eq!(
            sessions.state().unwrap(),
            SessionState::LoggedIn {
                username: "alice".into(),
                record: Some(record),
            }
        );
    }

    #[tokio::test]
    async fn login_with_fixed_location_and_trimmed_name() {
        let sessions = manager();
        let here = Geolocation {
            latitude: 52.52,
            longitude: 13.405,
            accuracy: 25.0,
        };
        let record = sessions
            .login("  bob ", &StubDevice, &FixedLocation(here))
            .await
            .unwrap();
        assert_eq!(record.username, "bob");
        assert_eq!(record.geolocation, Some(here));
        assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2026, 10, 17, 9, 5, 12).unwrap());
        assert_eq!(sessions.current_user().unwrap().as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn empty_username_changes_nothing() {
        let sessions = manager();
        let err = sessions.login("   ", &StubDevice, &NoLocation).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(ValidationError::EmptyUsername)));
        assert_eq!(err.to_string(), "Please enter a username");
        assert_eq!(sessions.current_user().unwrap(), None);
        assert_eq!(sessions.store.get(LOGIN_DATA_SLOT).unwrap(), None);
        assert_eq!(sessions.state().unwrap(), SessionState::LoggedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_location_times_out() {
        let sessions = manager();
        let record = sessions.login("carol", &StubDevice, &HangingLocation).await.unwrap();
        assert_eq!(record.geolocation, None);
        assert_eq!(sessions.current_user().unwrap().as_deref(), Some("carol"));
    }

    #[tokio::test]
    async fn relogin_overwrites_record() {
        let sessions = manager();
        sessions.login("alice", &StubDevice, &NoLocation).await.unwrap();
        sessions.clock.advance(chrono::Duration::hours(1));
        let second = sessions.login("dave", &StubDevice, &NoLocation).await.unwrap();

        match sessions.state().unwrap() {
            SessionState::LoggedIn { username, record } => {
                assert_eq!(username, "dave");
                assert_eq!(record, Some(second));
            }
            SessionState::LoggedOut => panic!("expected a session"),
        }
    }

    #[tokio::test]
    async fn logout_clears_marker_and_record() {
        let sessions = manager();
        sessions.login("alice", &StubDevice, &NoLocation).await.unwrap();
        sessions.logout().unwrap();
        assert_eq!(sessions.state().unwrap(), SessionState::LoggedOut);
        assert_eq!(sessions.store.get(LOGIN_DATA_SLOT).unwrap(), None);
        sessions.logout().unwrap();
    }

    #[test]
    fn marker_without_record_is_still_logged_in() {
        let sessions = manager();
        sessions.store.set(CURRENT_USER_SLOT, "erin").unwrap();
        assert_eq!(
            sessions.state().unwrap(),
            SessionState::LoggedIn {
                username: "erin".into(),
                record: None,
            }
        );

        sessions.store.set(LOGIN_DATA_SLOT, "{\"username\":").unwrap();
        assert!(matches!(
            sessions.state().unwrap(),
            SessionState::LoggedIn { record: None, .. }
        ));
    }

    #[test]
    fn device_info_from_environment() {
        let vars: HashMap<&str, &str> = [
            ("LANG", "de_DE.UTF-8"),
            ("COLUMNS", "120"),
            ("LINES", "40"),
            ("TZ", ":Europe/Berlin"),
        ]
        .into_iter()
        .collect();
        let info = collect_device_info(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(info.language, "de-DE");
        assert_eq!(info.screen_resolution, "120x40");
        assert_eq!(info.timezone, "Europe/Berlin");
        assert_eq!(info.platform, std::env::consts::OS);
        assert!(info.user_agent.starts_with("taskflow/"));
    }

    #[test]
    fn device_info_fallbacks() {
        let info = collect_device_info(|name| (name == "LC_ALL").then(|| "C".to_string()));
        assert_eq!(info.language, "en-US");
        assert_eq!(info.screen_resolution, "unknown");
        assert!(info.timezone.starts_with("UTC"));
    }

    #[test]
    fn offset_labels() {
        assert_eq!(utc_offset_label(0), "UTC+00:00");
        assert_eq!(utc_offset_label(5 * 3600 + 30 * 60), "UTC+05:30");
        assert_eq!(utc_offset_label(-8 * 3600), "UTC-08:00");
    }
}
