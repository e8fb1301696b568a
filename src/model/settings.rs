use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::clock::WallClock;

pub const DEFAULT_LATE_THRESHOLD_MINUTES: u32 = 15;

/// Classification parameters for one tenant, or one branch of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceConfig {
    #[schema(example = false)]
    pub include_weekends: bool,
    #[schema(example = "09:00", value_type = String)]
    pub standard_check_in_time: WallClock,
    #[schema(example = 15)]
    pub late_threshold_minutes: u32,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            include_weekends: false,
            standard_check_in_time: WallClock::NINE_AM,
            late_threshold_minutes: DEFAULT_LATE_THRESHOLD_MINUTES,
        }
    }
}

impl AttendanceConfig {
    /// Last minute-of-day that still counts as on time.
    pub fn on_time_until(&self) -> u32 {
        self.standard_check_in_time.minutes() + self.late_threshold_minutes
    }
}

/// Tenant default plus per-branch overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantSettings {
    pub default: AttendanceConfig,
    pub branches: BTreeMap<u64, AttendanceConfig>,
}

impl TenantSettings {
    pub fn for_branch(&self, branch_id: Option<u64>) -> &AttendanceConfig {
        branch_id
            .and_then(|b| self.branches.get(&b))
            .unwrap_or(&self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_override_wins_over_tenant_default() {
        let mut settings = TenantSettings::default();
        let night_shift = AttendanceConfig {
            include_weekends: true,
            standard_check_in_time: WallClock::new(22, 0).unwrap(),
            late_threshold_minutes: 5,
        };
        settings.branches.insert(4, night_shift);

        assert_eq!(settings.for_branch(Some(4)), &night_shift);
        assert_eq!(settings.for_branch(Some(5)), &AttendanceConfig::default());
        assert_eq!(settings.for_branch(None), &AttendanceConfig::default());
    }

    #[test]
    fn default_is_nine_with_fifteen_minutes_grace() {
        let config = AttendanceConfig::default();
        assert_eq!(config.on_time_until(), 9 * 60 + 15);
        assert!(!config.include_weekends);
    }
}
