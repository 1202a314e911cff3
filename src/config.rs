//! Application-level configuration loading: formation catalogue, presets, and seed data.

use std::{collections::HashSet, env, fs, io::ErrorKind, path::PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use time::macros::date;
use tracing::{info, warn};

use crate::dao::models::{MatchEntity, PlayerEntity, Side};
use crate::squad::{Formation, PlayerId, Position, Preset, Slot, SlotKey, SlotPosition};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SQUAD_SHEET_BACK_CONFIG_PATH";
/// Formation used for fresh drafts when the configuration does not name one.
const DEFAULT_FORMATION: &str = "3-2-1";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    formations: Vec<Formation>,
    presets: IndexMap<String, Preset>,
    default_formation: String,
    seed_players: Vec<PlayerEntity>,
    seed_matches: Vec<MatchEntity>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in club setup.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        formations = app_config.formations.len(),
                        presets = app_config.presets.len(),
                        players = app_config.seed_players.len(),
                        "loaded club configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Sections left out keep their built-in value.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Formation catalogue, in display order.
    pub fn formations(&self) -> &[Formation] {
        &self.formations
    }

    pub fn formation(&self, name: &str) -> Option<&Formation> {
        self.formations.iter().find(|formation| formation.name == name)
    }

    pub fn presets(&self) -> &IndexMap<String, Preset> {
        &self.presets
    }

    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// Formation proposed for a fresh draft.
    pub fn default_formation(&self) -> &str {
        &self.default_formation
    }

    /// Roster installed in an empty store.
    pub fn seed_players(&self) -> &[PlayerEntity] {
        &self.seed_players
    }

    /// Fixtures installed in an empty store.
    pub fn seed_matches(&self) -> &[MatchEntity] {
        &self.seed_matches
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            formations: default_formations(),
            presets: default_presets(),
            default_formation: DEFAULT_FORMATION.to_owned(),
            seed_players: default_players(),
            seed_matches: default_matches(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    formations: Option<IndexMap<String, Vec<Slot>>>,
    #[serde(default)]
    presets: Option<IndexMap<String, RawPreset>>,
    #[serde(default)]
    default_formation: Option<String>,
    #[serde(default)]
    players: Option<Vec<PlayerEntity>>,
    #[serde(default)]
    matches: Option<Vec<MatchEntity>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
/// A preset as written by hand: a bare list of ids, or an object.
enum RawPreset {
    Ordered(Vec<PlayerId>),
    Selection {
        starters: IndexMap<SlotKey, PlayerId>,
        #[serde(default)]
        absent: Vec<PlayerId>,
    },
}

impl From<RawPreset> for Preset {
    fn from(value: RawPreset) -> Self {
        match value {
            RawPreset::Ordered(players) => Preset::Ordered { players },
            RawPreset::Selection { starters, absent } => Preset::Selection { starters, absent },
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();

        let formations = match value.formations {
            Some(raw) => raw
                .into_iter()
                .filter_map(|(name, slots)| checked_formation(name, slots))
                .collect::<Vec<_>>(),
            None => defaults.formations,
        };
        let formations = if formations.is_empty() {
            warn!("config declares no usable formation; using built-in catalogue");
            default_formations()
        } else {
            formations
        };

        let presets = value
            .presets
            .map(|raw| raw.into_iter().map(|(name, preset)| (name, preset.into())).collect())
            .unwrap_or(defaults.presets);

        let requested = value
            .default_formation
            .unwrap_or(defaults.default_formation);
        let default_formation = if formations.iter().any(|formation| formation.name == requested) {
            requested
        } else {
            let fallback = formations
                .first()
                .map(|formation| formation.name.clone())
                .unwrap_or_else(|| DEFAULT_FORMATION.to_owned());
            warn!(
                requested = %requested,
                fallback = %fallback,
                "default formation is not in the catalogue"
            );
            fallback
        };

        Self {
            formations,
            presets,
            default_formation,
            seed_players: value.players.unwrap_or(defaults.seed_players),
            seed_matches: value.matches.unwrap_or(defaults.seed_matches),
        }
    }
}

/// Reject formations with no slot or with a repeated slot key.
fn checked_formation(name: String, slots: Vec<Slot>) -> Option<Formation> {
    let mut seen = HashSet::new();
    if slots.is_empty() || !slots.iter().all(|slot| seen.insert(slot.key.clone())) {
        warn!(formation = %name, "ignoring formation with no slots or duplicate slot keys");
        return None;
    }
    Some(Formation { name, slots })
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn slot(key: &str, x: u8, y: u8, position: SlotPosition) -> Slot {
    Slot {
        key: SlotKey::from(key),
        x,
        y,
        position,
    }
}

/// Built-in 7-a-side formation catalogue.
fn default_formations() -> Vec<Formation> {
    use SlotPosition::{Def, Fwd, Gk, Mid};

    let formation = |name: &str, slots: Vec<Slot>| Formation {
        name: name.to_owned(),
        slots,
    };
    vec![
        formation(
            "3-2-1",
            vec![
                slot("GK", 50, 88, Gk),
                slot("CB-L", 25, 66, Def),
                slot("CB-C", 50, 66, Def),
                slot("CB-R", 75, 66, Def),
                slot("CM-L", 35, 44, Mid),
                slot("CM-R", 65, 44, Mid),
                slot("ST", 50, 24, Fwd),
            ],
        ),
        formation(
            "2-3-1",
            vec![
                slot("GK", 50, 90, Gk),
                slot("CB-L", 33, 68, Def),
                slot("CB-R", 67, 68, Def),
                slot("CM-L", 24, 46, Mid),
                slot("CM-C", 50, 40, Mid),
                slot("CM-R", 76, 46, Mid),
                slot("ST", 50, 14, Fwd),
            ],
        ),
        formation(
            "4-2",
            vec![
                slot("GK", 50, 88, Gk),
                slot("LB", 20, 56, Def),
                slot("CB-L", 38, 70, Def),
                slot("CB-R", 62, 70, Def),
                slot("RB", 80, 56, Def),
                slot("ST-L", 38, 24, Fwd),
                slot("ST-R", 62, 24, Fwd),
            ],
        ),
        formation(
            "3-3",
            vec![
                slot("GK", 50, 88, Gk),
                slot("CB-L", 22, 68, Def),
                slot("CB-C", 50, 68, Def),
                slot("CB-R", 78, 68, Def),
                slot("CM-L", 22, 44, Mid),
                slot("CM-C", 50, 38, Mid),
                slot("CM-R", 78, 44, Mid),
            ],
        ),
        formation(
            "1-4-1",
            vec![
                slot("GK", 50, 88, Gk),
                slot("LB", 28, 76, Def),
                slot("CB-L", 40, 70, Def),
                slot("CB-R", 60, 70, Def),
                slot("RB", 72, 76, Def),
                slot("DM", 50, 46, Mid),
                slot("ST", 50, 14, Fwd),
            ],
        ),
    ]
}

fn default_presets() -> IndexMap<String, Preset> {
    let ordered = |ids: [&str; 7]| Preset::Ordered {
        players: ids.into_iter().map(PlayerId::from).collect(),
    };
    IndexMap::from([
        (
            "TOP_TEAM".to_owned(),
            ordered(["pGK", "pD1", "pD2", "pD3", "pM1", "pM2", "pF1"]),
        ),
        (
            "ROTATION".to_owned(),
            ordered(["pGK", "pD1", "pD2", "pD3", "pM2", "pM3", "pF2"]),
        ),
    ])
}

/// `[rating, pace, shooting, passing, dribbling, defense, physical]`.
type Attributes = [u8; 7];

fn seed_player(
    id: &str,
    name: &str,
    position: Position,
    attributes: Attributes,
    side: Option<Side>,
) -> PlayerEntity {
    let [rating, pace, shooting, passing, dribbling, defense, physical] = attributes;
    PlayerEntity {
        id: id.into(),
        name: name.to_owned(),
        position,
        rating,
        pace,
        shooting,
        passing,
        dribbling,
        defense,
        physical,
        jersey: None,
        side,
        photo: None,
    }
}

/// Demo squad used when no database is configured.
fn default_players() -> Vec<PlayerEntity> {
    use Position::{Def, Fwd, Gk, Mid};

    vec![
        seed_player("pGK", "Alex Keeper", Gk, [84, 45, 32, 70, 54, 50, 76], None),
        seed_player("pD1", "Leo Rock", Def, [82, 72, 40, 66, 64, 84, 82], Some(Side::L)),
        seed_player("pD2", "Max Steel", Def, [81, 70, 42, 68, 62, 82, 83], Some(Side::C)),
        seed_player("pD3", "Ilan Wall", Def, [79, 74, 38, 64, 60, 80, 80], Some(Side::R)),
        seed_player("pM1", "Nico Brain", Mid, [85, 78, 74, 86, 84, 70, 76], None),
        seed_player("pM2", "Sam Link", Mid, [83, 79, 72, 84, 82, 68, 78], None),
        seed_player("pM3", "Yanis Box", Mid, [80, 76, 70, 80, 79, 72, 77], None),
        seed_player("pF1", "Red Horse", Fwd, [86, 88, 86, 72, 86, 42, 82], None),
        seed_player("pF2", "Tomi Dash", Fwd, [81, 86, 80, 70, 82, 45, 76], None),
    ]
}

fn default_matches() -> Vec<MatchEntity> {
    let fixture = |id: &str, day, kick_off: &str, opponent: &str, home, location: &str, competition: &str| {
        MatchEntity {
            id: id.into(),
            date: day,
            time: Some(kick_off.to_owned()),
            opponent: opponent.to_owned(),
            home,
            location: location.to_owned(),
            competition: Some(competition.to_owned()),
        }
    };
    vec![
        fixture("m1", date!(2025 - 09 - 07), "19:30", "FC Lynx", true, "Parc des Sports 1", "Ligue 7v7"),
        fixture("m2", date!(2025 - 09 - 14), "20:15", "US Raptors", false, "Stade Municipal 3", "Ligue 7v7"),
        fixture("m3", date!(2025 - 09 - 21), "18:00", "AS Orion", true, "Parc des Sports 1", "Coupe"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_catalogue_has_seven_slots_per_formation() {
        let config = AppConfig::default();
        let names: Vec<&str> = config.formations().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["3-2-1", "2-3-1", "4-2", "3-3", "1-4-1"]);
        assert!(config.formations().iter().all(|f| f.slots.len() == 7));
        assert_eq!(config.default_formation(), "3-2-1");

        for formation in config.formations() {
            let blank = formation.empty_lineup();
            assert_eq!(blank.len(), 7);
            assert!(blank.has_no_starters());
        }
    }

    #[test]
    fn presets_accept_lists_and_objects() {
        let config = AppConfig::from_json(
            r#"{
                "presets": {
                    "LIST": ["pGK", "pD1"],
                    "PICK": { "starters": { "GK": "pGK" }, "absent": ["pF2"] }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.preset("LIST"),
            Some(&Preset::Ordered {
                players: vec!["pGK".into(), "pD1".into()]
            })
        );
        let Some(Preset::Selection { starters, absent }) = config.preset("PICK") else {
            panic!("object preset should become a selection");
        };
        assert_eq!(starters.get(&SlotKey::from("GK")), Some(&PlayerId::from("pGK")));
        assert_eq!(absent, &vec![PlayerId::from("pF2")]);
        // Sections left out keep their defaults.
        assert_eq!(config.formations().len(), 5);
        assert_eq!(config.seed_players().len(), 9);
    }

    #[test]
    fn unknown_default_formation_falls_back_to_first() {
        let config = AppConfig::from_json(
            r#"{
                "formations": {
                    "2-2": [
                        { "key": "GK", "x": 50, "y": 90, "position": "GK" },
                        { "key": "A", "x": 30, "y": 50, "position": "ANY" }
                    ],
                    "broken": [
                        { "key": "GK", "x": 50, "y": 90, "position": "GK" },
                        { "key": "GK", "x": 50, "y": 50, "position": "DEF" }
                    ]
                },
                "default_formation": "5-5"
            }"#,
        )
        .unwrap();

        assert_eq!(config.formations().len(), 1);
        assert_eq!(config.default_formation(), "2-2");
        assert!(config.formation("broken").is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(AppConfig::from_json("{ not json").is_err());
    }
}
