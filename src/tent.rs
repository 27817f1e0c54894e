// tent.rs -- temp-entity payload catalogue.
//
// `TeKind`'s variants and wire values are the classic Quake 2 `TE_*`
// table; the field-subset table below is grounded on
// original_source/src/q2proto_internal_common.c's
// `q2proto_common_client_read_temp_entity` (each `TE_*` case reads a
// different combination, and in a different order, of
// position/offset/direction/count/color/entity/time) and the
// mirror-image write side implied by myq2-server. Only the historical
// vanilla/R1Q2/Q2PRO range is covered here; rerelease-only additions
// above this range are left for a future table once their field
// layout is available from the pack.

/// Which of the temp-entity payload's optional fields a given
/// `TeKind` carries, and the two orderings the wire format actually
/// uses: most kinds read position data before `entity1`/`entity2`/
/// `count`, but several read one or both of those first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TentFields {
    pub position1: bool,
    pub position2: bool,
    pub offset: bool,
    pub direction: bool,
    pub count: bool,
    pub color: bool,
    pub entity1: bool,
    pub entity2: bool,
    pub time: bool,
    /// `entity1`/`entity2` are read before the position fields rather
    /// than after them.
    pub entities_lead: bool,
    /// `count` is read before the position fields rather than after
    /// `direction`.
    pub count_leads: bool,
}

macro_rules! fields {
    ($($f:ident),*) => {{
        let mut t = TentFields::default();
        $(t.$f = true;)*
        t
    }};
}

/// A temp-entity effect kind, tagged with its historical `TE_*` wire
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TeKind {
    Gunshot = 0,
    Blood = 1,
    Blaster = 2,
    RailTrail = 3,
    Shotgun = 4,
    Explosion1 = 5,
    Explosion2 = 6,
    RocketExplosion = 7,
    GrenadeExplosion = 8,
    Sparks = 9,
    Splash = 10,
    BubbleTrail = 11,
    ScreenSparks = 12,
    ShieldSparks = 13,
    BulletSparks = 14,
    LaserSparks = 15,
    ParasiteAttack = 16,
    RocketExplosionWater = 17,
    GrenadeExplosionWater = 18,
    MedicCableAttack = 19,
    BfgExplosion = 20,
    BfgBigExplosion = 21,
    BossTport = 22,
    BfgLaser = 23,
    GrappleCable = 24,
    WeldingSparks = 25,
    GreenBlood = 26,
    BlueHyperblaster = 27,
    PlasmaExplosion = 28,
    TunnelSparks = 29,
    Blaster2 = 30,
    RailTrail2 = 31,
    Flame = 32,
    Lightning = 33,
    DebugTrail = 34,
    PlainExplosion = 35,
    Flashlight = 36,
    ForceWall = 37,
    Heatbeam = 38,
    MonsterHeatbeam = 39,
    Steam = 40,
    BubbleTrail2 = 41,
    MoreBlood = 42,
    HeatbeamSparks = 43,
    HeatbeamSteam = 44,
    ChainfistSmoke = 45,
    ElectricSparks = 46,
    TrackerExplosion = 47,
    TeleportEffect = 48,
    DballGoal = 49,
    WidowBeamOut = 50,
    NukeBlast = 51,
    WidowSplash = 52,
    Explosion1Big = 53,
    Explosion1Np = 54,
    Flechette = 55,
}

impl TeKind {
    pub fn from_wire(v: u8) -> Option<TeKind> {
        use TeKind::*;
        const ALL: &[TeKind] = &[
            Gunshot, Blood, Blaster, RailTrail, Shotgun, Explosion1, Explosion2,
            RocketExplosion, GrenadeExplosion, Sparks, Splash, BubbleTrail, ScreenSparks,
            ShieldSparks, BulletSparks, LaserSparks, ParasiteAttack, RocketExplosionWater,
            GrenadeExplosionWater, MedicCableAttack, BfgExplosion, BfgBigExplosion, BossTport,
            BfgLaser, GrappleCable, WeldingSparks, GreenBlood, BlueHyperblaster,
            PlasmaExplosion, TunnelSparks, Blaster2, RailTrail2, Flame, Lightning, DebugTrail,
            PlainExplosion, Flashlight, ForceWall, Heatbeam, MonsterHeatbeam, Steam,
            BubbleTrail2, MoreBlood, HeatbeamSparks, HeatbeamSteam, ChainfistSmoke,
            ElectricSparks, TrackerExplosion, TeleportEffect, DballGoal, WidowBeamOut,
            NukeBlast, WidowSplash, Explosion1Big, Explosion1Np, Flechette,
        ];
        ALL.iter().copied().find(|k| *k as u8 == v)
    }

    /// Which payload fields this kind carries on the wire, mirroring
    /// the per-`TE_*` case groups of the original temp-entity reader.
    pub fn fields(self) -> TentFields {
        use TeKind::*;
        match self {
            Gunshot | Blood | Sparks | BulletSparks | ScreenSparks | ShieldSparks | Shotgun
            | Blaster | GreenBlood | Blaster2 | Flechette | HeatbeamSparks | HeatbeamSteam
            | MoreBlood | ElectricSparks => fields!(position1, direction),

            Splash | LaserSparks | WeldingSparks | TunnelSparks => {
                fields!(count, position1, direction, color, count_leads)
            }

            BlueHyperblaster | RailTrail | RailTrail2 | BubbleTrail | DebugTrail
            | BubbleTrail2 | BfgLaser => fields!(position1, position2),

            GrenadeExplosion | GrenadeExplosionWater | Explosion2 | PlasmaExplosion
            | RocketExplosion | RocketExplosionWater | Explosion1 | Explosion1Np
            | Explosion1Big | BfgExplosion | BfgBigExplosion | BossTport | PlainExplosion
            | ChainfistSmoke | TrackerExplosion | TeleportEffect | DballGoal | WidowSplash
            | NukeBlast => fields!(position1),

            ParasiteAttack | MedicCableAttack | Heatbeam | MonsterHeatbeam => {
                fields!(entity1, position1, position2, entities_lead)
            }

            GrappleCable => fields!(entity1, position1, position2, offset, entities_lead),

            Lightning => fields!(entity1, entity2, position1, position2, entities_lead),

            Flashlight => fields!(position1, entity1),

            WidowBeamOut => fields!(position1, entity1, entities_lead),

            ForceWall => fields!(position1, position2, color),

            // The source carries an entity1/count/position1/direction/
            // color/entity2 payload plus a `time` field gated on
            // `entity1 != -1`; this table has no way to make a field
            // conditional on another field's value, so `time` is
            // modelled as always present.
            Steam => fields!(entity1, count, position1, direction, color, entity2, time),

            // No case in the filtered source ever reads a payload for
            // this kind; kept as a conservative position-only guess.
            Flame => fields!(position1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_value_roundtrip() {
        for v in 0..=55u8 {
            let k = TeKind::from_wire(v).expect("known TE_* value");
            assert_eq!(k as u8, v);
        }
    }

    #[test]
    fn unknown_wire_value_is_none() {
        assert!(TeKind::from_wire(200).is_none());
    }

    #[test]
    fn sparks_style_kinds_carry_direction_but_no_count() {
        let f = TeKind::Sparks.fields();
        assert!(f.position1 && f.direction);
        assert!(!f.count && !f.position2 && !f.entity1);
    }

    #[test]
    fn splash_style_kinds_carry_count_and_color() {
        let f = TeKind::Splash.fields();
        assert!(f.position1 && f.direction && f.count && f.color);
        assert!(f.count_leads);
    }

    #[test]
    fn parasite_attack_reads_its_entity_before_the_positions() {
        let f = TeKind::ParasiteAttack.fields();
        assert!(f.entities_lead);
        assert!(!TeKind::Flashlight.fields().entities_lead);
    }

    #[test]
    fn railtrail_carries_both_positions_no_count() {
        let f = TeKind::RailTrail.fields();
        assert!(f.position1 && f.position2);
        assert!(!f.count);
    }

    #[test]
    fn blaster_carries_no_owning_entity() {
        let f = TeKind::Blaster.fields();
        assert!(!f.entity1);
        assert!(f.position1 && f.direction);
    }

    #[test]
    fn blue_hyperblaster_carries_both_positions_not_an_entity() {
        let f = TeKind::BlueHyperblaster.fields();
        assert!(f.position1 && f.position2);
        assert!(!f.entity1);
    }

    #[test]
    fn lightning_carries_both_entities_and_both_positions() {
        let f = TeKind::Lightning.fields();
        assert!(f.entity1 && f.entity2 && f.position1 && f.position2);
    }

    #[test]
    fn grapple_cable_carries_an_offset() {
        let f = TeKind::GrappleCable.fields();
        assert!(f.entity1 && f.position1 && f.position2 && f.offset);
    }

    #[test]
    fn widow_beam_out_carries_its_entity() {
        let f = TeKind::WidowBeamOut.fields();
        assert!(f.position1 && f.entity1);
    }
}
