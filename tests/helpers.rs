//! Shared test utilities for agent-forge tests.

#![allow(dead_code)]

use agent_forge::config::ForgeConfig;
use agent_forge::installer::ServiceSupervisor;
use agent_forge::platform::Platform;
use std::cell::RefCell;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

pub const CONFIG_TEMPLATE: &str = "\
[appSettings]
serverhostname =
serverport = 443

[agentInfo]
name = agent
version = 0.0.0
description = TopPatch agent
";

pub const INSTALLER_BODY: &str = "import sys\n\nsys.exit(main())\n";

/// Temporary agent checkout plus output and host-root directories.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Agent repository root
    pub repo: PathBuf,
    /// `repo/devtools`, where forge runs
    pub devtools: PathBuf,
    /// Where packages and artifacts are written
    pub output: PathBuf,
    /// Simulated `/` for installs
    pub host_root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let repo = base.join("agent");
        let devtools = repo.join("devtools");
        let output = base.join("output");
        let host_root = base.join("host");
        for dir in [&devtools, &output, &host_root] {
            fs::create_dir_all(dir).expect("Failed to create test dir");
        }

        Self {
            _temp_dir: temp_dir,
            repo,
            devtools,
            output,
            host_root,
        }
    }

    /// Packager configuration pointed at this environment.
    pub fn forge_config(&self) -> ForgeConfig {
        let mut config = ForgeConfig::new(&self.devtools);
        config.output_dir = self.output.clone();
        config
    }
}

/// Create an agent checkout with every source root and every runtime bundle.
pub fn create_mock_agent_repo(repo: &Path) {
    create_executable(&repo.join("bin/agentd"), "#!/bin/sh\nexec python agent.py\n");
    write(&repo.join("daemon/mac/com.toppatch.agent.plist"), "<plist/>\n");
    write(&repo.join("daemon/linux/tpagentd.service"), "[Service]\nExecStart=/opt/TopPatch/agent/bin/agentd\n");
    write(&repo.join("plugins/rv/rvplugin.py"), "class RvPlugin: pass\n");
    write(&repo.join("src/core.py"), "VERSION = None\n");
    write(&repo.join("agent.py"), "import core\n");
    write(&repo.join("watcher_mac.py"), "import os\n");
    write(&repo.join("agent.config"), CONFIG_TEMPLATE);
    create_executable(
        &repo.join("devtools/agent_utils"),
        &format!("#!/usr/bin/env python\n{}", INSTALLER_BODY),
    );

    for platform in Platform::ALL {
        let profile = platform.profile();
        create_executable(&repo.join(profile.runtime_exe()), "#!/bin/sh\n");
        write(&repo.join(profile.runtime_dir).join("lib/os.py"), "");
    }
}

/// Create an installable payload carrying only `platform`'s runtime.
pub fn create_mock_payload(payload: &Path, platform: Platform) {
    create_executable(&payload.join("bin/agentd"), "#!/bin/sh\n");
    write(&payload.join("daemon/mac/com.toppatch.agent.plist"), "<plist/>\n");
    write(&payload.join("daemon/linux/tpagentd.service"), "[Service]\n");
    write(&payload.join("agent.config"), CONFIG_TEMPLATE.replace("0.0.0", "2.2.8"));
    create_executable(&payload.join(platform.profile().runtime_exe()), "#!/bin/sh\n");
}

pub fn write(path: &Path, content: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}

pub fn create_executable(path: &Path, content: &str) {
    write(path, content);
    let mut perms = fs::metadata(path).expect("Failed to get metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("Failed to set permissions");
}

/// Names of the entries directly under `dir`, sorted.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", dir.display(), e))
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Supervisor that records requests instead of running launchctl/systemctl.
#[derive(Default)]
pub struct FakeSupervisor {
    pub calls: RefCell<Vec<String>>,
    pub fail_load: bool,
    pub fail_unload: bool,
}

impl FakeSupervisor {
    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ServiceSupervisor for FakeSupervisor {
    fn name(&self) -> &str {
        "fake"
    }

    fn load(&self, descriptor: &Path) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(format!("load {}", descriptor.display()));
        if self.fail_load {
            anyhow::bail!("load refused");
        }
        Ok(())
    }

    fn unload(&self, descriptor: &Path) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(format!("unload {}", descriptor.display()));
        if self.fail_unload {
            anyhow::bail!("not loaded");
        }
        Ok(())
    }
}

/// Answer one HTTP request with `status`. Returns the base URL.
pub fn serve_once(status: u16) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let base = format!("http://{}", listener.local_addr().unwrap());

    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut content_length = 0usize;
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        loop {
            line.clear();
            reader.read_line(&mut line).unwrap();
            if line.trim().is_empty() {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();

        let mut stream = stream;
        let _ = write!(
            stream,
            "HTTP/1.1 {} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            status
        );
    });

    base
}

/// Assert that a symlink exists and points to the expected target.
pub fn assert_symlink(path: &Path, expected_target: &Path) {
    assert!(
        path.is_symlink(),
        "Expected symlink at {}, but it's not a symlink",
        path.display()
    );
    let target = fs::read_link(path).expect("Failed to read symlink");
    assert_eq!(
        target,
        expected_target,
        "Symlink {} points to {:?}, expected {:?}",
        path.display(),
        target,
        expected_target
    );
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}

/// Assert that nothing exists at a path (not even a dangling symlink).
pub fn assert_absent(path: &Path) {
    assert!(
        !path.exists() && !path.is_symlink(),
        "Expected nothing at {}",
        path.display()
    );
}

/// Fail the test unless `tool` is on PATH.
pub fn require(tool: &str) {
    assert!(
        agent_forge::process::exists(tool),
        "{} must be installed to run this test",
        tool
    );
}
