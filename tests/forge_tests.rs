//! End-to-end packager tests against a mock agent checkout.

mod helpers;

use agent_forge::forge::{prune_runtimes, Forge, StagingTree};
use agent_forge::platform::Platform;
use agent_forge::process::Cmd;
use agent_forge::release::ReleaseDescriptor;
use helpers::{
    assert_absent, assert_file_contains, create_mock_agent_repo, dir_names, require, write, TestEnv,
    INSTALLER_BODY,
};
use std::fs;

#[test]
fn test_forge_rpm_release() {
    require("tar");
    let env = TestEnv::new();
    create_mock_agent_repo(&env.repo);

    let release = ReleaseDescriptor::parse("2.2.8", "rpm").unwrap();
    let output = Forge::new(env.forge_config()).build(&release).unwrap();

    assert_eq!(output.artifact.path, env.output.join("VFAgent_2_2_8-rpm5_64.tar.gz"));
    assert!(output.artifact.path.is_file());

    // Unpack and inspect what actually shipped.
    let unpacked = env.output.join("unpacked");
    fs::create_dir_all(&unpacked).unwrap();
    Cmd::new("tar")
        .arg("-xzf")
        .arg_path(&output.artifact.path)
        .arg("-C")
        .arg_path(&unpacked)
        .run()
        .unwrap();

    assert_eq!(dir_names(&unpacked), ["VFAgent_2_2_8"]);
    let package = unpacked.join("VFAgent_2_2_8");
    assert_eq!(dir_names(&package), ["agent", "install"]);
    assert_file_contains(&package.join("agent/agent.config"), "version = 2.2.8");
    assert_eq!(dir_names(&package.join("agent/deps")), ["rpm"]);
    assert_eq!(
        fs::read_to_string(package.join("install")).unwrap(),
        format!("#!agent/deps/rpm/Python-2.7.5/bin/python\n{}", INSTALLER_BODY)
    );
    assert!(package.join("agent/bin/agentd").is_file());
    assert!(package.join("agent/agent_utils").is_file());
}

#[test]
fn test_every_tarball_platform_ships_one_runtime() {
    require("tar");
    let env = TestEnv::new();
    create_mock_agent_repo(&env.repo);
    let forge = Forge::new(env.forge_config());

    for platform in Platform::ALL.into_iter().filter(|p| *p != Platform::Mac) {
        let release = ReleaseDescriptor::parse("1.0.0", platform.as_str()).unwrap();
        let output = forge.build(&release).unwrap();

        let bundle = platform.profile().bundle_dir.trim_start_matches("deps/");
        assert_eq!(dir_names(&output.package_dir.join("agent/deps")), [bundle], "{}", platform);
        assert!(output
            .package_dir
            .join("agent")
            .join(platform.profile().runtime_exe())
            .is_file());
    }
}

#[test]
fn test_mac_staging_keeps_only_mac_runtime() {
    let env = TestEnv::new();
    create_mock_agent_repo(&env.repo);
    let agent = env.output.join("VFAgent_1_0_0/agent");
    fs::create_dir_all(&agent).unwrap();

    let config = env.forge_config();
    let mut tree = StagingTree::new(&agent);
    for entry in config.source_roots() {
        tree.stage(&config.source_dir, entry).unwrap();
    }
    prune_runtimes(&agent, Platform::Mac).unwrap();

    assert_eq!(dir_names(&agent.join("deps")), ["mac"]);
}

#[test]
fn test_rebuild_replaces_previous_package() {
    require("tar");
    let env = TestEnv::new();
    create_mock_agent_repo(&env.repo);
    let stale = env.output.join("VFAgent_2_2_8/agent/stale.py");
    write(&stale, "left over from an aborted run\n");

    let release = ReleaseDescriptor::parse("2.2.8", "deb").unwrap();
    Forge::new(env.forge_config()).build(&release).unwrap();

    assert_absent(&stale);
    assert_eq!(
        fs::read_to_string(env.output.join("VFAgent_2_2_8/install")).unwrap(),
        format!("#!/usr/bin/python\n{}", INSTALLER_BODY)
    );
}

#[test]
fn test_invalid_release_is_rejected() {
    for (version, platform) in [("2.2", "rpm"), ("2.2.8.1", "rpm"), ("2..8", "deb"), ("2.2.8", "win")] {
        assert!(
            ReleaseDescriptor::parse(version, platform).is_err(),
            "{} {}",
            version,
            platform
        );
    }
}

#[test]
fn test_missing_source_fails_before_touching_output() {
    let env = TestEnv::new();
    create_mock_agent_repo(&env.repo);
    fs::remove_dir_all(env.repo.join("plugins")).unwrap();

    let release = ReleaseDescriptor::parse("2.2.8", "rpm").unwrap();
    let err = Forge::new(env.forge_config()).build(&release).unwrap_err();

    assert!(format!("{:#}", err).contains("Preflight failed"));
    assert!(dir_names(&env.output).is_empty());
}

#[test]
fn test_missing_version_line_is_not_fatal() {
    require("tar");
    let env = TestEnv::new();
    create_mock_agent_repo(&env.repo);
    write(&env.repo.join("agent.config"), "[agentInfo]\nname = agent\n");

    let release = ReleaseDescriptor::parse("3.0.0", "rpm6").unwrap();
    let output = Forge::new(env.forge_config()).build(&release).unwrap();

    assert_eq!(
        fs::read_to_string(output.package_dir.join("agent/agent.config")).unwrap(),
        "[agentInfo]\nname = agent\n"
    );
}
