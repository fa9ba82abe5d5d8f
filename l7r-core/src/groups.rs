//! Sides of a fight.

use crate::character::CharacterId;
use crate::context::Context;
use crate::skills::Skill;
use crate::strategies::can_act;

/// Index of the control group.
pub const CONTROL_GROUP: usize = 0;
/// Index of the test group.
pub const TEST_GROUP: usize = 1;

/// Characters fighting on the same side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    members: Vec<CharacterId>,
}

impl Group {
    pub fn new(members: Vec<CharacterId>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[CharacterId] {
        &self.members
    }

    pub fn contains(&self, character: CharacterId) -> bool {
        self.members.contains(&character)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members who are fighting and could still parry this phase.
    pub fn friends_with_actions(&self, ctx: &Context) -> Vec<CharacterId> {
        let phase = ctx.phase();
        self.members
            .iter()
            .copied()
            .filter(|id| {
                ctx.character(*id)
                    .is_ok_and(|c| c.is_fighting() && can_act(c, Skill::Parry, phase))
            })
            .collect()
    }

    /// Members one serious wound or less from defeat.
    pub fn friends_near_defeat(&self, ctx: &Context) -> Vec<CharacterId> {
        self.members
            .iter()
            .copied()
            .filter(|id| {
                ctx.character(*id)
                    .is_ok_and(|c| c.is_fighting() && c.sw_remaining() < 2)
            })
            .collect()
    }

    /// Whether anyone in the group is still fighting.
    pub fn is_fighting(&self, ctx: &Context) -> bool {
        self.members
            .iter()
            .any(|id| ctx.character(*id).is_ok_and(|c| c.is_fighting()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::testing::TestHarness;

    fn trio() -> TestHarness {
        let a = Character::new("Ready");
        let b = Character::new("Idle");
        let c = Character::new("Hurt");
        let enemy = Character::new("Enemy");
        TestHarness::new(vec![vec![a, b, c], vec![enemy]])
    }

    #[test]
    fn test_friends_with_actions() {
        let mut harness = trio();
        let ready = harness.id("Ready");
        let hurt = harness.id("Hurt");
        harness.set_phase(4);
        harness.set_actions(ready, vec![3]);
        harness.set_actions(hurt, vec![8, 9]);
        let group = &harness.context().groups()[CONTROL_GROUP];
        let friends = group.friends_with_actions(harness.context());
        // hurt has no die yet but can interrupt with two
        assert_eq!(friends, vec![ready, hurt]);
    }

    #[test]
    fn test_friends_near_defeat() {
        let mut harness = trio();
        let hurt = harness.id("Hurt");
        harness.context_mut().character_mut(hurt).unwrap().take_sw(3);
        let group = &harness.context().groups()[CONTROL_GROUP];
        assert_eq!(group.friends_near_defeat(harness.context()), vec![hurt]);
        assert!(group.is_fighting(harness.context()));
        assert!(group.contains(hurt));
        assert!(!group.contains(harness.id("Enemy")));
    }
}
