//! Named parameter presets per script, with usage statistics.
//!
//! Every mutating call writes the whole document before it returns. The new
//! document is built on a copy and only replaces the in-memory one once it
//! has been persisted, so a failed write leaves the store unchanged.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::file_handling::{read_yaml, write_yaml};
use crate::values::{from_strings, to_strings, ParameterValues};

const FILE_DESCRIPTION: &str = "presets";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ConfigPreset {
    /// Filled from the document key on load.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub params: IndexMap<String, String>,
    #[serde(default)]
    pub usage_count: u64,
    pub last_used: DateTime<Utc>,
}

impl ConfigPreset {
    pub fn values(&self) -> ParameterValues {
        from_strings(&self.params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresetOrder {
    /// Most recently used first.
    #[default]
    Recency,
    /// Most used first, then most recently used.
    Popularity,
}

impl FromStr for PresetOrder {
    type Err = String;

    fn from_str(order: &str) -> std::result::Result<Self, Self::Err> {
        match order.to_ascii_lowercase().as_str() {
            "recent" | "recency" => Ok(PresetOrder::Recency),
            "popular" | "popularity" => Ok(PresetOrder::Popularity),
            other => Err(format!("unknown preset order `{other}`, expected recent or popular")),
        }
    }
}

type PresetDocument = BTreeMap<String, BTreeMap<String, ConfigPreset>>;

#[derive(Debug, Clone)]
pub struct PresetStore {
    path: String,
    presets: PresetDocument,
}

impl PresetStore {
    /// Opens the preset file at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &str) -> Result<Self> {
        let mut presets: PresetDocument = read_yaml(FILE_DESCRIPTION, path)?.unwrap_or_default();
        for script_presets in presets.values_mut() {
            for (name, preset) in script_presets.iter_mut() {
                preset.name.clone_from(name);
            }
        }

        info!(
            "Loaded {} presets from {}",
            presets.values().map(BTreeMap::len).sum::<usize>(),
            path
        );
        Ok(Self {
            path: path.to_string(),
            presets,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Looks a preset up by name, ignoring surrounding whitespace as saving
    /// does.
    pub fn get(&self, script: &str, name: &str) -> Option<&ConfigPreset> {
        self.presets
            .get(script)
            .and_then(|presets| presets.get(name.trim()))
    }

    fn require(&self, script: &str, name: &str) -> Result<&ConfigPreset> {
        self.get(script, name).ok_or_else(|| Error::PresetNotFound {
            script: script.to_string(),
            name: name.to_string(),
        })
    }

    fn commit(&mut self, presets: PresetDocument) -> Result<()> {
        write_yaml(FILE_DESCRIPTION, &self.path, &presets)?;
        self.presets = presets;
        Ok(())
    }

    /// Saves `values` under `name`. If the name is taken, `confirm_overwrite`
    /// decides; an overwrite keeps the existing usage statistics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PresetConflict`] if the overwrite is declined, or an
    /// error if the name is blank or the file cannot be written.
    pub fn save<F>(
        &mut self,
        script: &str,
        name: &str,
        values: &ParameterValues,
        confirm_overwrite: F,
    ) -> Result<()>
    where
        F: FnOnce(&ConfigPreset) -> bool,
    {
        let name = check_name(name)?;
        let params = to_strings(values);

        let preset = match self.get(script, name) {
            Some(existing) => {
                if !confirm_overwrite(existing) {
                    return Err(conflict(script, name));
                }
                ConfigPreset {
                    params,
                    ..existing.clone()
                }
            }
            None => ConfigPreset {
                name: name.to_string(),
                params,
                usage_count: 0,
                last_used: Utc::now(),
            },
        };

        let mut presets = self.presets.clone();
        presets
            .entry(script.to_string())
            .or_default()
            .insert(name.to_string(), preset);
        self.commit(presets)?;

        info!("Saved preset `{name}` for {script}");
        Ok(())
    }

    /// Returns the values of a preset, optionally counting it as used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PresetNotFound`] if there is no such preset.
    pub fn load(&mut self, script: &str, name: &str, update_stats: bool) -> Result<ParameterValues> {
        let values = self.require(script, name)?.values();
        if update_stats {
            self.record_use(script, name)?;
        }
        Ok(values)
    }

    /// Increments the usage count and moves `last_used` forward to now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PresetNotFound`] if there is no such preset.
    pub fn record_use(&mut self, script: &str, name: &str) -> Result<()> {
        let name = name.trim();
        let mut preset = self.require(script, name)?.clone();
        preset.usage_count += 1;
        preset.last_used = preset.last_used.max(Utc::now());

        let mut presets = self.presets.clone();
        presets
            .entry(script.to_string())
            .or_default()
            .insert(name.to_string(), preset);
        self.commit(presets)?;

        debug!("Recorded use of preset `{name}` for {script}");
        Ok(())
    }

    /// Renames a preset, keeping its statistics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PresetNotFound`] if `old` does not exist and
    /// [`Error::PresetConflict`] if `new` exists and the overwrite is declined.
    pub fn rename<F>(&mut self, script: &str, old: &str, new: &str, confirm_overwrite: F) -> Result<()>
    where
        F: FnOnce(&ConfigPreset) -> bool,
    {
        let new = check_name(new)?;
        let old = old.trim();
        let mut preset = self.require(script, old)?.clone();
        if old == new {
            return Ok(());
        }

        if let Some(existing) = self.get(script, new) {
            if !confirm_overwrite(existing) {
                return Err(conflict(script, new));
            }
        }

        let mut presets = self.presets.clone();
        let script_presets = presets.entry(script.to_string()).or_default();
        script_presets.remove(old);
        preset.name = new.to_string();
        script_presets.insert(new.to_string(), preset);
        self.commit(presets)?;

        info!("Renamed preset `{old}` to `{new}` for {script}");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::PresetNotFound`] if there is no such preset.
    pub fn delete(&mut self, script: &str, name: &str) -> Result<()> {
        let name = name.trim();
        self.require(script, name)?;

        let mut presets = self.presets.clone();
        if let Some(script_presets) = presets.get_mut(script) {
            script_presets.remove(name);
            if script_presets.is_empty() {
                presets.remove(script);
            }
        }
        self.commit(presets)?;

        info!("Deleted preset `{name}` for {script}");
        Ok(())
    }

    /// The presets of a script in the requested order. Remaining ties are
    /// broken by name.
    pub fn list(&self, script: &str, order: PresetOrder) -> Vec<&ConfigPreset> {
        let mut presets: Vec<&ConfigPreset> = self
            .presets
            .get(script)
            .map(|presets| presets.values().collect())
            .unwrap_or_default();

        presets.sort_by(|a, b| {
            let by_order = match order {
                PresetOrder::Recency => b.last_used.cmp(&a.last_used),
                PresetOrder::Popularity => b
                    .usage_count
                    .cmp(&a.usage_count)
                    .then_with(|| b.last_used.cmp(&a.last_used)),
            };
            by_order.then_with(|| a.name.cmp(&b.name))
        });

        presets
    }

    /// The preset to pre-select for a script: its most popular one.
    pub fn default_for(&self, script: &str) -> Option<&ConfigPreset> {
        self.list(script, PresetOrder::Popularity).into_iter().next()
    }
}

fn check_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidPresetName(name.to_string()));
    }
    Ok(trimmed)
}

fn conflict(script: &str, name: &str) -> Error {
    Error::PresetConflict {
        script: script.to_string(),
        name: name.to_string(),
    }
}
