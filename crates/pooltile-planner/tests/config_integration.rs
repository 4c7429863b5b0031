//! Capacity models built from planner configuration files and `POOLTILE_*`
//! environment overrides.

use pooltile_common::{ENV_OVERRIDES, PlannerConfig};
use pooltile_planner::{Axis, CapacityModel, Layout, PlanKind, PoolWorkload, WindowParams, plan};
use serial_test::serial;

fn cleared_env() -> Vec<(&'static str, Option<&'static str>)> {
    ENV_OVERRIDES.iter().map(|k| (*k, None)).collect()
}

fn with_env(overrides: &[(&'static str, &'static str)], f: impl FnOnce()) {
    let mut vars = cleared_env();
    for &(key, value) in overrides {
        vars.retain(|(k, _)| *k != key);
        vars.push((key, Some(value)));
    }
    temp_env::with_vars(vars, f);
}

fn workload() -> PoolWorkload {
    PoolWorkload {
        layout: Layout::Nchw,
        direction: Default::default(),
        mode: Default::default(),
        batch: 2,
        channels: 16,
        height: WindowParams::new(32, 3, 1),
        width: WindowParams::new(16, 3, 2),
        data_width: 2,
        index_width: 4,
        ceil_mode: false,
    }
}

#[test]
#[serial(pooltile_env)]
fn lane_override_changes_plan() {
    with_env(&[("POOLTILE_LANE_COUNT", "16")], || {
        let config = PlannerConfig::from_env().unwrap();
        let capacity = CapacityModel::from_config(&config).unwrap();
        assert_eq!(capacity.lane_count(), 16);

        let plan = plan(&workload(), &capacity).unwrap();
        assert_eq!(plan.kind(), PlanKind::HighAxisSplit);
        assert_eq!(plan.inner(Axis::High), 2);
    });
}

#[test]
#[serial(pooltile_env)]
fn toml_budget_drives_capacity() {
    with_env(&[], || {
        let config = PlannerConfig::from_toml(
            r#"
            lane_count = 8
            scratch_bytes = 65536
            reserved_bytes = 1024
            "#,
        )
        .unwrap();
        let capacity = CapacityModel::from_config(&config).unwrap();
        assert_eq!(capacity.buffer_budget_bytes(), 64_512);
        assert_eq!(capacity.alignment_bytes(), 32);

        let plan = plan(&workload(), &capacity).unwrap();
        assert!(plan.footprint().total_bytes <= 64_512);
        assert_eq!(plan.used_lanes(), 8);
    });
}

#[test]
#[serial(pooltile_env)]
fn config_file_round_trip() {
    with_env(&[("POOLTILE_SCRATCH_BYTES", "131072")], || {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.toml");
        std::fs::write(&path, PlannerConfig::default_toml().unwrap()).unwrap();

        let config = PlannerConfig::load(&path).unwrap();
        assert_eq!(config.scratch_bytes, 131_072);
        let capacity = CapacityModel::from_config(&config).unwrap();
        assert_eq!(capacity.buffer_budget_bytes(), 131_072 - 20_480);
    });
}

#[test]
#[serial(pooltile_env)]
fn bad_override_is_rejected() {
    with_env(&[("POOLTILE_ALIGNMENT_BYTES", "24")], || {
        let err = PlannerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("alignment_bytes must be a power of two"));
    });
}

#[test]
#[serial(pooltile_env)]
fn input_cap_override_shrinks_tiles() {
    // one high row moves 32 x 16 = 512 input elements
    with_env(&[("POOLTILE_LANE_COUNT", "4"), ("POOLTILE_MAX_INPUT_ELEMENTS", "1024")], || {
        let config = PlannerConfig::from_env().unwrap();
        let capacity = CapacityModel::from_config(&config).unwrap();
        assert_eq!(capacity.max_input_elements(), 1024);

        let plan = plan(&workload(), &capacity).unwrap();
        assert_eq!(plan.kind(), PlanKind::HighAxisSplit);
        assert_eq!(plan.inner(Axis::High), 2);
        assert_eq!(plan.footprint().input_elements, 1024);
        assert_eq!(plan.used_lanes(), 4);
    });
}

#[test]
fn invalid_config_surfaces_as_planner_error() {
    let config = PlannerConfig { reserved_bytes: 1 << 20, ..PlannerConfig::default() };
    let err = CapacityModel::from_config(&config).unwrap_err();
    assert!(err.to_string().starts_with("config error"));
}
