use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::data::geonames::is_zip;
use crate::data::import::error::ImportError;
use crate::data::import::Purge;
use crate::fixtures::error::FixtureError;
use crate::fixtures::{Fixture, GeonamesPostalCodeData};

/// Layout of a fixture configuration file:
///
/// ```toml
/// [[fixture]]
/// name = "PuertoRicoGeonamesPostalCodeData"
/// country = "PR"
/// source = "geonames/PR.txt"
/// groups = ["geo_test"]
///
/// [[directory]]
/// path = "geonames"
/// groups = ["caribbean"]
/// ```
///
/// Every geonames file found in a `[[directory]]` is registered the way
/// `FixtureRegistry::from_directory` does, with the settings of the entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryConfig {
    #[serde(default, rename = "fixture")]
    fixtures: Vec<FixtureConfig>,
    #[serde(default, rename = "directory")]
    directories: Vec<DirectoryConfig>
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectoryConfig {
    path: PathBuf,
    #[serde(default)]
    groups: Vec<String>,
    batch_size: Option<usize>,
    #[serde(default)]
    purge: Purge
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureConfig {
    name: String,
    source: PathBuf,
    country: Option<String>,
    #[serde(default)]
    groups: Vec<String>,
    batch_size: Option<usize>,
    #[serde(default)]
    purge: Purge
}

impl FixtureConfig {
    fn into_fixture(self, base_dir: &Path) -> GeonamesPostalCodeData {
        let mut fixture = GeonamesPostalCodeData::new(self.name, base_dir.join(self.source))
            .with_groups(self.groups)
            .with_purge(self.purge);
        if let Some(country) = self.country {
            fixture = fixture.with_country(country);
        }
        if let Some(batch_size) = self.batch_size {
            fixture = fixture.with_batch_size(batch_size);
        }
        fixture
    }
}

/// Fixtures in registration order. Names are unique.
#[derive(Debug, Default)]
pub struct FixtureRegistry {
    fixtures: Vec<Box<dyn Fixture>>
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F: Fixture + 'static>(&mut self, fixture: F) -> Result<(), FixtureError> {
        self.register_boxed(Box::new(fixture))
    }

    fn register_boxed(&mut self, fixture: Box<dyn Fixture>) -> Result<(), FixtureError> {
        if self.get(fixture.name()).is_some() {
            return Err(FixtureError::DuplicateFixture(fixture.name().to_string()));
        }
        debug!("Registered fixture {}", fixture.name());
        self.fixtures.push(fixture);
        Ok(())
    }

    /// Moves every fixture of `other` into this registry.
    pub fn merge(&mut self, other: FixtureRegistry) -> Result<(), FixtureError> {
        for fixture in other.fixtures {
            self.register_boxed(fixture)?;
        }
        Ok(())
    }

    /// Sources are resolved relative to the directory of the file.
    pub fn from_config_file(path: &Path) -> Result<Self, FixtureError> {
        let content = fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => FixtureError::Import(ImportError::FileNotFound(path.to_path_buf())),
            _ => FixtureError::Io(err),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        Self::from_config_str(&content, base_dir).map_err(|err| match err {
            FixtureError::Config { source, .. } => FixtureError::Config { path: path.to_path_buf(), source },
            other => other,
        })
    }

    pub fn from_config_str(content: &str, base_dir: &Path) -> Result<Self, FixtureError> {
        let config: RegistryConfig = toml::from_str(content).map_err(|source| FixtureError::Config {
            path: PathBuf::new(),
            source
        })?;

        let mut registry = FixtureRegistry::new();
        for fixture_config in config.fixtures {
            registry.register(fixture_config.into_fixture(base_dir))?;
        }
        for directory in config.directories {
            for fixture in discover(&base_dir.join(&directory.path))? {
                let mut fixture = fixture
                    .with_groups(directory.groups.clone())
                    .with_purge(directory.purge);
                if let Some(batch_size) = directory.batch_size {
                    fixture = fixture.with_batch_size(batch_size);
                }
                registry.register(fixture)?;
            }
        }
        Ok(registry)
    }

    /// One fixture per geonames file (`*.txt`, `*.zip`) directly inside
    /// `dir`, named after the file. A two letter name is taken as the
    /// country of the file.
    pub fn from_directory(dir: &Path) -> Result<Self, FixtureError> {
        let mut registry = FixtureRegistry::new();
        for fixture in discover(dir)? {
            registry.register(fixture)?;
        }
        Ok(registry)
    }

    /// Accepts a directory, a single geonames file or a `.toml`
    /// configuration file.
    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        if path.is_dir() {
            return Self::from_directory(path);
        }
        if !path.exists() {
            return Err(FixtureError::Import(ImportError::FileNotFound(path.to_path_buf())));
        }
        if has_extension(path, "toml") {
            return Self::from_config_file(path);
        }

        let mut registry = FixtureRegistry::new();
        registry.register(fixture_for_file(path))?;
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Fixture> {
        self.fixtures
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }

    pub fn fixtures(&self) -> Vec<&dyn Fixture> {
        self.fixtures.iter().map(|f| f.as_ref()).collect()
    }

    /// Fixtures belonging to any of `groups`, in registration order. Every
    /// fixture is implicitly part of the group named after itself.
    pub fn by_groups(&self, groups: &[String]) -> Result<Vec<&dyn Fixture>, FixtureError> {
        if let Some(unknown) = groups
            .iter()
            .find(|group| !self.fixtures.iter().any(|f| f.in_group(group)))
        {
            return Err(FixtureError::UnknownGroup(unknown.clone()));
        }

        Ok(self.fixtures
            .iter()
            .filter(|f| groups.iter().any(|group| f.in_group(group)))
            .map(|f| f.as_ref())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

/// Geonames files directly inside `dir`, sorted by path.
fn discover(dir: &Path) -> Result<Vec<GeonamesPostalCodeData>, FixtureError> {
    let mut paths = fs::read_dir(dir)
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => FixtureError::Import(ImportError::FileNotFound(dir.to_path_buf())),
            _ => FixtureError::Io(err),
        })?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<PathBuf>, std::io::Error>>()?;
    paths.sort();

    let fixtures = paths
        .iter()
        .filter(|p| p.is_file() && is_data_source(p))
        .map(|p| fixture_for_file(p))
        .collect::<Vec<GeonamesPostalCodeData>>();

    if fixtures.is_empty() {
        return Err(FixtureError::NoFixtures(dir.to_path_buf()));
    }
    info!("Found {} fixtures in {}", fixtures.len(), dir.display());
    Ok(fixtures)
}

fn fixture_for_file(path: &Path) -> GeonamesPostalCodeData {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let fixture = GeonamesPostalCodeData::new(name.clone(), path);

    if name.len() == 2 && name.chars().all(|c| c.is_ascii_alphabetic()) {
        fixture.with_country(name)
    } else {
        fixture
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

fn is_data_source(path: &Path) -> bool {
    let is_readme = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.eq_ignore_ascii_case("readme"))
        .unwrap_or(false);

    !is_readme && (has_extension(path, "txt") || is_zip(path))
}
