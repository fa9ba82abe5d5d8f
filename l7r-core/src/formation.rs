//! Who stands next to whom.
//!
//! A formation records which enemies each combatant is engaged with (and so
//! may attack) and which allies stand adjacent (and so may parry for it).
//! Both relations are symmetric.

use crate::character::CharacterId;
use crate::error::ConfigError;
use crate::groups::Group;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormationKind {
    /// Everyone engages every enemy and stands by every ally.
    #[default]
    Open,
    /// Two facing lines. Each combatant engages the enemy opposite and the
    /// enemies diagonal to it.
    Line,
    /// The smaller group in a ring, the larger one around it.
    Surround,
}

impl FormationKind {
    pub fn name(&self) -> &'static str {
        match self {
            FormationKind::Open => "open",
            FormationKind::Line => "line",
            FormationKind::Surround => "surround",
        }
    }
}

impl fmt::Display for FormationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(FormationKind::Open),
            "line" => Ok(FormationKind::Line),
            "surround" => Ok(FormationKind::Surround),
            _ => Err(ConfigError::UnknownFormation(s.to_string())),
        }
    }
}

type Relation = BTreeMap<CharacterId, BTreeSet<CharacterId>>;

fn link(relation: &mut Relation, a: CharacterId, b: CharacterId) {
    if a == b {
        return;
    }
    relation.entry(a).or_default().insert(b);
    relation.entry(b).or_default().insert(a);
}

fn unlink_all(relation: &mut Relation, corpse: CharacterId) -> BTreeSet<CharacterId> {
    let linked = relation.remove(&corpse).unwrap_or_default();
    for other in &linked {
        if let Some(set) = relation.get_mut(other) {
            set.remove(&corpse);
        }
    }
    linked
}

/// Positions of the combatants still standing, and the engagement and
/// adjacency between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formation {
    kind: FormationKind,
    /// Members of each group in position order.
    ranks: Vec<Vec<CharacterId>>,
    engaged: Relation,
    adjacent: Relation,
}

impl Formation {
    pub fn new(kind: FormationKind, groups: &[Group]) -> Result<Self, ConfigError> {
        if kind != FormationKind::Open && groups.len() != 2 {
            return Err(ConfigError::FormationGroups {
                formation: kind.name(),
                groups: groups.len(),
            });
        }
        let mut formation = Self {
            kind,
            ranks: groups.iter().map(|g| g.members().to_vec()).collect(),
            engaged: Relation::new(),
            adjacent: Relation::new(),
        };
        for id in formation.ranks.iter().flatten() {
            formation.engaged.entry(*id).or_default();
            formation.adjacent.entry(*id).or_default();
        }
        match kind {
            FormationKind::Open => formation.deploy_open(),
            FormationKind::Line => formation.deploy_line(),
            FormationKind::Surround => formation.deploy_surround(),
        }
        formation.engage_idle();
        Ok(formation)
    }

    fn deploy_open(&mut self) {
        for (i, rank) in self.ranks.iter().enumerate() {
            for (a_pos, a) in rank.iter().enumerate() {
                for b in &rank[a_pos + 1..] {
                    link(&mut self.adjacent, *a, *b);
                }
                for other in self.ranks.iter().skip(i + 1) {
                    for b in other {
                        link(&mut self.engaged, *a, *b);
                    }
                }
            }
        }
    }

    fn deploy_line(&mut self) {
        for rank in &self.ranks {
            for pair in rank.windows(2) {
                link(&mut self.adjacent, pair[0], pair[1]);
            }
        }
        let (front, back) = (&self.ranks[0], &self.ranks[1]);
        for (i, a) in front.iter().enumerate() {
            for (j, b) in back.iter().enumerate() {
                if i.abs_diff(j) <= 1 {
                    link(&mut self.engaged, *a, *b);
                }
            }
        }
    }

    fn deploy_surround(&mut self) {
        let (inner, outer) = if self.ranks[0].len() <= self.ranks[1].len() {
            (self.ranks[0].clone(), self.ranks[1].clone())
        } else {
            (self.ranks[1].clone(), self.ranks[0].clone())
        };
        if inner.len() == 1 {
            for (j, b) in outer.iter().enumerate() {
                link(&mut self.engaged, inner[0], *b);
                link(&mut self.adjacent, *b, outer[(j + 1) % outer.len()]);
            }
            return;
        }

        for (i, a) in inner.iter().enumerate() {
            link(&mut self.adjacent, *a, inner[(i + 1) % inner.len()]);
        }
        let pairs: Vec<(CharacterId, CharacterId)> = if inner.len() == 2 {
            vec![(inner[0], inner[1])]
        } else {
            (0..inner.len())
                .map(|i| (inner[i], inner[(i + 1) % inner.len()]))
                .collect()
        };
        let mut stations: Vec<Vec<CharacterId>> = vec![Vec::new(); pairs.len()];
        for (j, b) in outer.iter().enumerate() {
            let station = j % pairs.len();
            let (left, right) = pairs[station];
            link(&mut self.engaged, left, *b);
            link(&mut self.engaged, right, *b);
            stations[station].push(*b);
        }
        // outer fighters stand by those at their own and the next station
        for (s, station) in stations.iter().enumerate() {
            for pair in station.windows(2) {
                link(&mut self.adjacent, pair[0], pair[1]);
            }
            let next = &stations[(s + 1) % stations.len()];
            if let (Some(last), Some(first)) = (station.last(), next.first()) {
                link(&mut self.adjacent, *last, *first);
            }
        }
    }

    fn group_index(&self, character: CharacterId) -> Option<usize> {
        self.ranks.iter().position(|rank| rank.contains(&character))
    }

    fn engagement(&self, character: CharacterId) -> usize {
        self.engaged.get(&character).map_or(0, |set| set.len())
    }

    /// Give everyone without an opponent the least engaged enemy.
    fn engage_idle(&mut self) {
        let everyone: Vec<CharacterId> = self.ranks.iter().flatten().copied().collect();
        for id in everyone {
            if self.engagement(id) > 0 {
                continue;
            }
            let Some(side) = self.group_index(id) else {
                continue;
            };
            let enemy = self
                .ranks
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != side)
                .flat_map(|(_, rank)| rank.iter().copied())
                .min_by_key(|enemy| self.engagement(*enemy));
            if let Some(enemy) = enemy {
                tracing::debug!(%id, %enemy, formation = %self.kind, "re-engaging");
                link(&mut self.engaged, id, enemy);
            }
        }
    }

    pub fn kind(&self) -> FormationKind {
        self.kind
    }

    pub fn contains(&self, character: CharacterId) -> bool {
        self.engaged.contains_key(&character)
    }

    pub fn can_attack(&self, attacker: CharacterId, target: CharacterId) -> bool {
        self.engaged
            .get(&attacker)
            .is_some_and(|set| set.contains(&target))
    }

    /// Enemies `character` is engaged with.
    pub fn attackable(&self, character: CharacterId) -> Vec<CharacterId> {
        self.engaged
            .get(&character)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn adjacent_allies(&self, character: CharacterId) -> Vec<CharacterId> {
        self.adjacent
            .get(&character)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether `parrier` stands close enough to parry for `target`.
    pub fn can_parry_for(&self, parrier: CharacterId, target: CharacterId) -> bool {
        parrier == target
            || self
                .adjacent
                .get(&target)
                .is_some_and(|set| set.contains(&parrier))
    }

    /// Take a defeated combatant out of the formation.
    ///
    /// Its neighbours in line close the gap, and anyone left without an
    /// opponent engages the least engaged enemy.
    pub fn remove(&mut self, corpse: CharacterId) {
        let Some(side) = self.group_index(corpse) else {
            return;
        };
        let neighbours = unlink_all(&mut self.adjacent, corpse);
        if self.kind != FormationKind::Open {
            let rank = &self.ranks[side];
            if let Some(pos) = rank.iter().position(|id| *id == corpse) {
                let left = pos.checked_sub(1).map(|p| rank[p]);
                let right = rank.get(pos + 1).copied();
                if let (Some(left), Some(right)) = (left, right) {
                    if neighbours.contains(&left) && neighbours.contains(&right) {
                        link(&mut self.adjacent, left, right);
                    }
                }
            }
        }
        unlink_all(&mut self.engaged, corpse);
        self.ranks[side].retain(|id| *id != corpse);
        self.engage_idle();
    }
}
