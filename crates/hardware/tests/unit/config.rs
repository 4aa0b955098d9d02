//! Configuration Unit Tests.
//!
//! Verifies the configuration layer:
//! 1. Defaults mirror the single-CPU pipeline experiment.
//! 2. Partial JSON documents fall back to defaults field by field.
//! 3. Validation rejects machines that cannot be built, before any simulation runs.

use o3sim_core::common::error::{ConfigError, SimError};
use o3sim_core::config::{CacheConfig, Config, MemoryController, ReplacementPolicy};
use o3sim_core::isa::program::Program;
use o3sim_core::Simulator;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

// ══════════════════════════════════════════════════════════
// 1. Defaults
// ══════════════════════════════════════════════════════════

#[test]
fn default_machine_matches_the_pipeline_experiment() {
    let config = Config::default();

    assert_eq!(config.clock, "1GHz");
    assert_eq!(config.clock_period().unwrap(), 1000);
    assert_eq!(config.memory_bytes().unwrap(), 8192 * 1024 * 1024);
    assert_eq!(config.cpu_count, 1);
    assert_eq!(config.threads_per_cpu, 1);
    assert_eq!(config.binary_path, "/bin/echo");
    assert_eq!(config.arguments, vec!["Hello", "gem5", "pipeline"]);

    assert_eq!(config.pipeline.fetch_width, 4);
    assert_eq!(config.pipeline.commit_width, 4);

    assert_eq!(config.l1i.size_bytes().unwrap(), 16 * 1024);
    assert_eq!(config.l1d.size_bytes().unwrap(), 64 * 1024);
    assert_eq!(config.l2.size_bytes().unwrap(), 256 * 1024);
    assert_eq!(config.l1i.mshrs, 4);
    assert_eq!(config.l2.mshrs, 16);
    assert_eq!(config.l2.tag_latency, 10);
    assert_eq!(config.l1d.tgts_per_mshr, 20);
    assert_eq!(config.l1d.policy, ReplacementPolicy::Lru);

    assert_eq!(config.memory.controller, MemoryController::Simple);
    assert_eq!(config.memory.latency, 50);
    assert_eq!(config.limits.deadlock_threshold, 10_000);
    assert!(config.limits.max_ticks.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn empty_json_object_is_the_default_machine() {
    let config: Config = serde_json::from_str("{}").unwrap();
    let default = Config::default();

    assert_eq!(config.clock, default.clock);
    assert_eq!(config.pipeline.rob_entries, default.pipeline.rob_entries);
    assert_eq!(config.l2.assoc, default.l2.assoc);
    assert_eq!(config.limits.deadlock_threshold, default.limits.deadlock_threshold);
}

// ══════════════════════════════════════════════════════════
// 2. JSON layering
// ══════════════════════════════════════════════════════════

#[test]
fn partial_sections_keep_their_other_defaults() {
    let json = r#"{
        "threads_per_cpu": 2,
        "pipeline": { "issue_width": 8, "rob_entries": 64 },
        "memory": { "controller": "Dram", "t_cas": 20 },
        "limits": { "max_ticks": 5000000 }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.threads_per_cpu, 2);
    assert_eq!(config.pipeline.issue_width, 8);
    assert_eq!(config.pipeline.fetch_width, 4);
    assert_eq!(config.pipeline.rob_entries, 64);
    assert_eq!(config.pipeline.iq_entries, 64);
    assert_eq!(config.memory.controller, MemoryController::Dram);
    assert_eq!(config.memory.t_cas, 20);
    assert_eq!(config.memory.t_ras, 14);
    assert_eq!(config.limits.max_ticks, Some(5_000_000));
    assert!(config.validate().is_ok());
}

#[test]
fn unknown_controller_is_a_parse_error() {
    let json = r#"{ "memory": { "controller": "Hbm" } }"#;
    assert!(serde_json::from_str::<Config>(json).is_err());
}

// ══════════════════════════════════════════════════════════
// 3. Validation
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::one_ghz("1GHz", 1000)]
#[case::two_ghz("2GHz", 500)]
#[case::half_ghz("500MHz", 2000)]
#[case::period("250ps", 250)]
fn clock_strings_become_periods(#[case] clock: &str, #[case] period: u64) {
    let config = Config {
        clock: clock.into(),
        ..Config::default()
    };
    assert_eq!(config.clock_period().unwrap(), period);
}

#[rstest]
#[case::garbage("fast")]
#[case::empty("")]
#[case::zero("0GHz")]
fn malformed_clocks_are_rejected(#[case] clock: &str) {
    let config = Config {
        clock: clock.into(),
        ..Config::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::MalformedClock(_))));
}

#[test]
fn zero_stage_width_is_rejected() {
    let mut config = Config::default();
    config.pipeline.rename_width = 0;
    assert_eq!(
        config.validate(),
        Err(ConfigError::ZeroWidth { stage: "rename" })
    );
}

#[test]
fn phys_regs_must_cover_every_thread() {
    let mut config = Config::default();
    config.threads_per_cpu = 8;
    config.pipeline.phys_regs = 256;
    assert_eq!(
        config.validate(),
        Err(ConfigError::TooFewPhysRegs {
            phys: 256,
            arch: 32,
            threads: 8,
        })
    );

    config.pipeline.phys_regs = 257;
    assert!(config.validate().is_ok());
}

#[test]
fn cache_size_must_be_a_power_of_two() {
    let mut config = Config::default();
    config.l1d = CacheConfig::new("48kB", 2, 1, 4, 20);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotPowerOfTwo { value: 49152, .. })
    ));
}

#[test]
fn cache_geometry_must_split_into_whole_sets() {
    let mut config = Config::default();
    config.l1i = CacheConfig::new("16kB", 3, 1, 4, 20);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::BadGeometry { assoc: 3, .. })
    ));
}

#[rstest]
#[case::mshrs(CacheConfig::new("64kB", 2, 1, 0, 20))]
#[case::targets(CacheConfig::new("64kB", 2, 1, 4, 0))]
#[case::assoc(CacheConfig::new("64kB", 0, 1, 4, 20))]
fn zero_cache_resources_are_rejected(#[case] l1d: CacheConfig) {
    let config = Config {
        l1d,
        ..Config::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Zero { .. })));
}

#[test]
fn zero_cpus_are_rejected() {
    let config = Config {
        cpu_count: 0,
        ..Config::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Zero { .. })));
}

#[test]
fn invalid_config_fails_before_building_anything() {
    let config = Config {
        memory_size: "lots".into(),
        ..Config::default()
    };
    let err = Simulator::with_workload(config, Arc::new(Program::echo(&[]))).unwrap_err();
    assert!(matches!(
        err,
        SimError::Config(ConfigError::MalformedSize(_))
    ));
}
