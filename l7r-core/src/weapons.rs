//! Weapons and their damage dice.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A weapon's base damage, rolled and kept dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub rolled: i32,
    pub kept: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    Katana,
    Wakizashi,
    Yari,
    Tanto,
    Club,
    Unarmed,
    Gongfu,
}

impl WeaponKind {
    pub fn name(&self) -> &'static str {
        match self {
            WeaponKind::Katana => "katana",
            WeaponKind::Wakizashi => "wakizashi",
            WeaponKind::Yari => "yari",
            WeaponKind::Tanto => "tanto",
            WeaponKind::Club => "club",
            WeaponKind::Unarmed => "unarmed",
            WeaponKind::Gongfu => "gongfu",
        }
    }

    pub fn weapon(self) -> Weapon {
        let (rolled, kept) = match self {
            WeaponKind::Katana => (4, 2),
            WeaponKind::Wakizashi | WeaponKind::Yari => (3, 2),
            WeaponKind::Tanto | WeaponKind::Club => (2, 2),
            WeaponKind::Unarmed => (0, 2),
            WeaponKind::Gongfu => (0, 3),
        };
        Weapon {
            kind: self,
            rolled,
            kept,
        }
    }
}

impl Weapon {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

impl Default for Weapon {
    fn default() -> Self {
        WeaponKind::Katana.weapon()
    }
}

impl FromStr for Weapon {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_lowercase().as_str() {
            "katana" => WeaponKind::Katana,
            "wakizashi" => WeaponKind::Wakizashi,
            "yari" => WeaponKind::Yari,
            "tanto" => WeaponKind::Tanto,
            "club" => WeaponKind::Club,
            "unarmed" => WeaponKind::Unarmed,
            "gongfu" => WeaponKind::Gongfu,
            _ => return Err(ConfigError::UnknownWeapon(s.to_string())),
        };
        Ok(kind.weapon())
    }
}
