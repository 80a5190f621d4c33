//! Pipeline integration tests
//!
//! Runs the full synthesis pipeline against fake generator and build
//! driver ports inside a temporary projects root.

mod fixtures;

use std::fs;

use fixtures::*;
use slcp_defines::{InjectError, TemplateEnv};
use slcp_synth::descriptor::ProjectDescriptor;
use slcp_synth::manifest::{ManifestError, Override};
use slcp_synth::pipeline::{Pipeline, PipelineConfig, PipelineError};
use slcp_synth::toolchain::{BuildSystem, ToolError};

fn env() -> TemplateEnv {
    TemplateEnv::with_revision("abc12345")
}

fn with_overrides(config: PipelineConfig, overrides: &[&str]) -> PipelineConfig {
    config.with_overrides(
        overrides
            .iter()
            .map(|o| o.parse::<Override>().unwrap())
            .collect(),
    )
}

// =============================================================================
// Happy paths
// =============================================================================

#[test]
fn test_cmake_end_to_end() {
    let ws = Workspace::new();
    let generator = FakeGenerator::new();
    let driver = FakeDriver::new(BuildSystem::Cmake);

    let summary = Pipeline::new(ws.config(), &generator, &driver, env())
        .run()
        .unwrap();

    assert_eq!(summary.project, BASE_PROJECT);
    assert_eq!(summary.artifact, ws.output);
    assert_eq!(fs::read_to_string(&ws.output).unwrap(), "GBL");
    assert_eq!(summary.patched_headers.len(), 2);

    // Synthesized descriptor
    let descriptor = ProjectDescriptor::load(&ws.build.join("zwave_app.slcp")).unwrap();
    let ids: Vec<&str> = descriptor.component.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["zw_core", "EFR32ZG23B020F512IM48", "zw_region_us"]);
    let config: Vec<(&str, &str)> = descriptor
        .configuration
        .iter()
        .map(|c| (c.name.as_str(), c.value.as_str()))
        .collect();
    assert_eq!(config, vec![("SL_TX_POWER", "14"), ("SL_RETRIES", "3")]);
    assert_eq!(descriptor.define[0].value, "1");
    assert_eq!(descriptor.toolchain_settings.len(), 2);
    assert_eq!(
        descriptor.extra.get("project_name").and_then(|v| v.as_str()),
        Some("zwave_app")
    );

    // Metadata side file
    let metadata: serde_yaml::Value =
        serde_yaml::from_str(&ws.read_build("gbl_metadata.yaml")).unwrap();
    assert_eq!(metadata["fw_type"].as_str(), Some("ncp"));
    assert_eq!(metadata["version"].as_str(), Some("1.2.3"));

    // Copy pruning and stale headers
    assert!(!ws.build.join(".git").exists());
    assert!(!ws.build.join("autogen/sl_stale.h").exists());
    assert!(!ws.build.join("config/sl_rail_util_pti_config.h").exists());
    assert!(!ws.build.join("config/sl_memory_config.h").exists());
    assert!(ws.build.join("config/app_settings.h").exists());
    assert!(ws.build.join("app.c").exists());

    // Injected defines
    assert_eq!(
        ws.read_build("autogen/sl_version.h"),
        "#pragma once\n#define BUILD_REV  \"rev-abc12345\""
    );
    assert_eq!(
        ws.read_build("config/app_config.h"),
        "#ifndef APP_CONFIG_H\n#define APP_CONFIG_H\n\n#if 1\n#define APP_FLAG                1\n#endif\n\n#endif"
    );
    let rev = summary
        .bindings
        .iter()
        .find(|b| b.name == "BUILD_REV")
        .unwrap();
    assert_eq!(rev.value.as_deref(), Some("\"rev-abc12345\""));
    assert_eq!(rev.consumption_count(), 1);

    // Rewritten cmake config
    let cmake = ws.read_build("zwave_app_cmake/zwave_app.cmake");
    assert!(cmake.starts_with("add_compile_options(\n"));
    assert!(cmake.contains(&format!(
        "\"-ffile-prefix-map={}=/gecko_sdk\"",
        ws.sdk.display()
    )));
    assert!(cmake.contains(&format!("\"-ffile-prefix-map={}=/src\"", ws.build.display())));
    assert!(cmake.contains(&format!(
        "\"-ffile-prefix-map={}=/toolchain\"",
        ws.toolchain.display()
    )));
    assert!(cmake.contains("\"$<$<COMPILE_LANGUAGE:C>:SHELL:-imacros sl_gcc_preinclude.h>\""));

    // Generator contract
    let calls = generator.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].descriptor, ws.build.join("zwave_app.slcp"));
    assert!(calls[0].destination.is_absolute());
    assert_eq!(calls[0].sdk, ws.sdk);
    assert_eq!(calls[0].toolchain, "toolchain_gcc");
    assert_eq!(calls[0].build_system, BuildSystem::Cmake);
    assert_eq!(driver.builds.borrow().len(), 1);
}

#[test]
fn test_makefile_end_to_end() {
    let ws = Workspace::new();
    let generator = FakeGenerator::new();
    let driver = FakeDriver::new(BuildSystem::Makefile);

    Pipeline::new(ws.config(), &generator, &driver, env())
        .run()
        .unwrap();

    let makefile = ws.read_build("zwave_app.Makefile");
    assert!(makefile.starts_with("all:\n\t@echo build\n\npost-build:\n"));
    assert!(makefile.contains("\t-/opt/tools/create_gbl.py postbuild "));
    assert!(makefile.contains(&format!(
        "\"{}\"",
        ws.build.join("zwave_app.slpb").display()
    )));
    assert!(makefile.contains(&format!("sdk_dir:\"{}\"", ws.sdk.display())));
    assert!(!ws.build.join("zwave_app_cmake").exists());

    assert_eq!(generator.calls.borrow()[0].build_system, BuildSystem::Makefile);
    assert_eq!(fs::read_to_string(&ws.output).unwrap(), "GBL");
}

#[test]
fn test_rerun_into_existing_build_dir() {
    let ws = Workspace::new();
    let driver = FakeDriver::new(BuildSystem::Cmake);

    for _ in 0..2 {
        let generator = FakeGenerator::new();
        Pipeline::new(ws.config(), &generator, &driver, env())
            .run()
            .unwrap();
    }

    // The previous cmake tree is removed, so the prefix map appears once
    let cmake = ws.read_build("zwave_app_cmake/zwave_app.cmake");
    assert_eq!(cmake.matches("add_compile_options(").count(), 1);
}

// =============================================================================
// Overrides
// =============================================================================

#[test]
fn test_override_last_wins() {
    let ws = Workspace::new();
    let generator = FakeGenerator::new();
    let driver = FakeDriver::new(BuildSystem::Cmake);
    let config = with_overrides(
        ws.config(),
        &[
            r#"device="EFR32ZG23A010F512GM40""#,
            r#"device="EFR32ZG28B312F1024IM68""#,
        ],
    );

    let prepared = Pipeline::new(config, &generator, &driver, env())
        .prepare()
        .unwrap();

    let ids: Vec<&str> = prepared
        .synthesized
        .descriptor
        .component
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert!(ids.contains(&"EFR32ZG28B312F1024IM68"));
    assert!(!ids.contains(&"EFR32ZG23A010F512GM40"));
    assert_eq!(generator.call_count(), 0);
}

#[test]
fn test_override_base_project_outside_root() {
    let ws = Workspace::new();
    let generator = FakeGenerator::new();
    let driver = FakeDriver::new(BuildSystem::Cmake);
    let config = with_overrides(ws.config(), &[r#"base_project="../elsewhere""#]);

    let err = Pipeline::new(config, &generator, &driver, env())
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Manifest(ManifestError::BaseProjectOutsideRoot(_))
    ));
    assert_eq!(err.exit_code(), 2);
}

// =============================================================================
// Define consistency
// =============================================================================

#[test]
fn test_unused_define_aborts_without_writing() {
    let ws = Workspace::new();
    let generator = FakeGenerator::new();
    let driver = FakeDriver::new(BuildSystem::Cmake);
    let config = with_overrides(
        ws.config(),
        &[r#"c_defines={"BUILD_REV": "1", "APP_FLAG": 1, "NOPE": "x"}"#],
    );

    let err = Pipeline::new(config, &generator, &driver, env())
        .run()
        .unwrap_err();

    match &err {
        PipelineError::Inject(InjectError::Inconsistent {
            double_consumed,
            unused,
        }) => {
            assert!(double_consumed.is_empty());
            assert_eq!(unused, &vec!["NOPE".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("NOPE"));

    // Consistent headers were not patched either
    assert_eq!(ws.read_build("config/app_config.h"), APP_CONFIG_H);
    assert_eq!(ws.read_build("autogen/sl_version.h"), VERSION_H);
    assert!(driver.builds.borrow().is_empty());
    assert!(!ws.output.exists());
}

#[test]
fn test_double_consumption_aborts() {
    let ws = Workspace::new();
    let generator = FakeGenerator::with_headers(&[
        ("autogen/sl_version.h", VERSION_H),
        ("config/a_config.h", "#define APP_FLAG 0"),
        ("config/b_config.h", "#define APP_FLAG 0"),
    ]);
    let driver = FakeDriver::new(BuildSystem::Cmake);

    let err = Pipeline::new(ws.config(), &generator, &driver, env())
        .run()
        .unwrap_err();

    match &err {
        PipelineError::Inject(InjectError::Inconsistent {
            double_consumed,
            unused,
        }) => {
            assert_eq!(double_consumed, &vec!["APP_FLAG".to_string()]);
            assert!(unused.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ws.read_build("config/a_config.h"), "#define APP_FLAG 0");
}

#[test]
fn test_guard_conflicts_with_descriptor_define() {
    let ws = Workspace::new();
    let generator = FakeGenerator::with_headers(&[(
        "config/zw_config.h",
        "#ifndef ZW_BETA\n#define ZW_BETA 0\n#endif",
    )]);
    let driver = FakeDriver::new(BuildSystem::Cmake);
    let config = with_overrides(ws.config(), &[r#"c_defines={"ZW_BETA": 2}"#]);

    let err = Pipeline::new(config, &generator, &driver, env())
        .run()
        .unwrap_err();

    assert!(matches!(
        &err,
        PipelineError::Inject(InjectError::GuardConflict { define, .. }) if define == "ZW_BETA"
    ));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_unknown_template_variable() {
    let ws = Workspace::new();
    let generator = FakeGenerator::new();
    let driver = FakeDriver::new(BuildSystem::Cmake);
    let config = with_overrides(
        ws.config(),
        &[r#"c_defines={"BUILD_REV": "{branch}", "APP_FLAG": 1}"#],
    );

    let err = Pipeline::new(config, &generator, &driver, env())
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Inject(InjectError::Template { .. })
    ));
    assert_eq!(err.exit_code(), 2);
}

// =============================================================================
// External tools
// =============================================================================

#[test]
fn test_missing_sdk_extension() {
    let ws = Workspace::new();
    fs::remove_dir(ws.sdk.join("extension/zwave_extension")).unwrap();
    let generator = FakeGenerator::new();
    let driver = FakeDriver::new(BuildSystem::Cmake);

    let err = Pipeline::new(ws.config(), &generator, &driver, env())
        .run()
        .unwrap_err();

    match &err {
        PipelineError::Tool(ToolError::MissingExtension(path)) => {
            assert!(path.ends_with("extension/zwave_extension"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 4);
    assert_eq!(generator.call_count(), 0);
}

#[test]
fn test_generator_failure() {
    let ws = Workspace::new();
    let driver = FakeDriver::new(BuildSystem::Cmake);

    let err = Pipeline::new(ws.config(), &FailingGenerator, &driver, env())
        .run()
        .unwrap_err();

    assert!(matches!(err, PipelineError::Tool(ToolError::Failed { .. })));
    assert_eq!(err.exit_code(), 4);
    assert!(driver.builds.borrow().is_empty());
}
