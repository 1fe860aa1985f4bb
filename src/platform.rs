//! Supported target platforms and their static packaging profiles.

use std::fmt;
use std::str::FromStr;

/// Name of the bundled interpreter directory inside each runtime bundle.
pub const RUNTIME_NAME: &str = "Python-2.7.5";

/// Target platform for a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Mac,
    Deb,
    Rpm,
    Rpm6,
    Rpm32,
    Rpm632,
}

/// How the staged package directory is turned into a shippable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Mountable disk image named `<package dir>.dmg`.
    DiskImage,
    /// Gzipped tarball named `<package dir><suffix>.tar.gz`.
    Tarball { suffix: &'static str },
}

/// Static packaging facts for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Interpreter line written at the top of the installer entry script.
    pub shebang: &'static str,
    /// Whether the installer entry script needs its shebang rewritten.
    pub rewrites_shebang: bool,
    /// Runtime bundle directory, relative to the agent directory.
    pub bundle_dir: &'static str,
    /// Bundled interpreter tree, relative to the agent directory.
    pub runtime_dir: &'static str,
    /// Archive format produced for this platform.
    pub archive: ArchiveKind,
}

impl PlatformProfile {
    /// Interpreter executable, relative to the agent directory.
    pub fn runtime_exe(&self) -> String {
        format!("{}/bin/python", self.runtime_dir)
    }
}

impl Platform {
    /// Every supported platform, in CLI listing order.
    pub const ALL: [Platform; 6] = [
        Platform::Mac,
        Platform::Deb,
        Platform::Rpm,
        Platform::Rpm6,
        Platform::Rpm32,
        Platform::Rpm632,
    ];

    /// Canonical CLI name.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Mac => "mac",
            Platform::Deb => "deb",
            Platform::Rpm => "rpm",
            Platform::Rpm6 => "rpm6",
            Platform::Rpm32 => "rpm-32",
            Platform::Rpm632 => "rpm6-32",
        }
    }

    /// The packaging profile for this platform.
    pub fn profile(self) -> PlatformProfile {
        match self {
            Platform::Mac => PlatformProfile {
                shebang: "#!agent/deps/mac/Python-2.7.5/bin/python",
                rewrites_shebang: false,
                bundle_dir: "deps/mac",
                runtime_dir: "deps/mac/Python-2.7.5",
                archive: ArchiveKind::DiskImage,
            },
            Platform::Deb => PlatformProfile {
                shebang: "#!/usr/bin/python",
                rewrites_shebang: true,
                bundle_dir: "deps/deb",
                runtime_dir: "deps/deb/Python-2.7.5",
                archive: ArchiveKind::Tarball { suffix: "-deb" },
            },
            Platform::Rpm => PlatformProfile {
                shebang: "#!agent/deps/rpm/Python-2.7.5/bin/python",
                rewrites_shebang: true,
                bundle_dir: "deps/rpm",
                runtime_dir: "deps/rpm/Python-2.7.5",
                archive: ArchiveKind::Tarball { suffix: "-rpm5_64" },
            },
            Platform::Rpm6 => PlatformProfile {
                shebang: "#!agent/deps/rpm6/Python-2.7.5/bin/python",
                rewrites_shebang: true,
                bundle_dir: "deps/rpm6",
                runtime_dir: "deps/rpm6/Python-2.7.5",
                archive: ArchiveKind::Tarball { suffix: "-rpm6_64" },
            },
            Platform::Rpm32 => PlatformProfile {
                shebang: "#!agent/deps/rpm-32/Python-2.7.5/bin/python",
                rewrites_shebang: true,
                bundle_dir: "deps/rpm-32",
                runtime_dir: "deps/rpm-32/Python-2.7.5",
                archive: ArchiveKind::Tarball { suffix: "-rpm5_32" },
            },
            Platform::Rpm632 => PlatformProfile {
                shebang: "#!agent/deps/rpm6-32/Python-2.7.5/bin/python",
                rewrites_shebang: true,
                bundle_dir: "deps/rpm6-32",
                runtime_dir: "deps/rpm6-32/Python-2.7.5",
                archive: ArchiveKind::Tarball { suffix: "-rpm6_32" },
            },
        }
    }

    /// Comma-separated list of supported names, for diagnostics.
    pub fn supported_list() -> String {
        Platform::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Platform '{}' isn't supported. Supported platforms: {}",
                    s,
                    Platform::supported_list()
                )
            })
    }
}
