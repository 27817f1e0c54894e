// protocol.rs -- supported dialects and the network version numbers they map to.
//
// Mirrors q2proto_protocol_t from the original q2proto library
// (inc/q2proto/q2proto_protocol.h), extended with the two additional
// Q2PRO extended-demo flavors and Q2rePRO that the C headers split
// across separate small enums in later revisions.

/// One of the seven wire dialects this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Protocol 26, used by original release demos.
    OldDemo,
    /// Vanilla 3.20 protocol, protocol number 34.
    Vanilla,
    /// R1Q2, protocol number 35.
    R1Q2,
    /// Q2PRO, protocol number 36.
    Q2Pro,
    /// Q2PRO extended demo format (file-only, protocol number 1018).
    Q2ProExtendedDemo,
    /// Q2PRO extended v2 demo format (file-only, protocol number 1024).
    Q2ProExtendedV2Demo,
    /// Q2PRO extended demo with playerfog (file-only, protocol number 1026).
    Q2ProExtendedDemoPlayerFog,
    /// Q2rePRO (rerelease) protocol, protocol number 1027.
    Q2rePro,
}

pub const PROTOCOL_OLD_DEMO: i32 = 26;
pub const PROTOCOL_VANILLA: i32 = 34;
pub const PROTOCOL_R1Q2: i32 = 35;
pub const PROTOCOL_Q2PRO: i32 = 36;
pub const PROTOCOL_Q2PRO_EXTENDED_DEMO: i32 = 1018;
pub const PROTOCOL_Q2PRO_EXTENDED_V2_DEMO: i32 = 1024;
pub const PROTOCOL_Q2PRO_EXTENDED_DEMO_PLAYERFOG: i32 = 1026;
pub const PROTOCOL_Q2REPRO: i32 = 1027;

impl Protocol {
    /// Map to the protocol version number communicated over the wire
    /// (or stored in a demo file).
    pub fn netver(self) -> i32 {
        match self {
            Protocol::OldDemo => PROTOCOL_OLD_DEMO,
            Protocol::Vanilla => PROTOCOL_VANILLA,
            Protocol::R1Q2 => PROTOCOL_R1Q2,
            Protocol::Q2Pro => PROTOCOL_Q2PRO,
            Protocol::Q2ProExtendedDemo => PROTOCOL_Q2PRO_EXTENDED_DEMO,
            Protocol::Q2ProExtendedV2Demo => PROTOCOL_Q2PRO_EXTENDED_V2_DEMO,
            Protocol::Q2ProExtendedDemoPlayerFog => PROTOCOL_Q2PRO_EXTENDED_DEMO_PLAYERFOG,
            Protocol::Q2rePro => PROTOCOL_Q2REPRO,
        }
    }

    /// Map a wire/demo protocol version number back to a `Protocol`.
    pub fn from_netver(version: i32) -> Option<Protocol> {
        match version {
            PROTOCOL_OLD_DEMO => Some(Protocol::OldDemo),
            PROTOCOL_VANILLA => Some(Protocol::Vanilla),
            PROTOCOL_R1Q2 => Some(Protocol::R1Q2),
            PROTOCOL_Q2PRO => Some(Protocol::Q2Pro),
            PROTOCOL_Q2PRO_EXTENDED_DEMO => Some(Protocol::Q2ProExtendedDemo),
            PROTOCOL_Q2PRO_EXTENDED_V2_DEMO => Some(Protocol::Q2ProExtendedV2Demo),
            PROTOCOL_Q2PRO_EXTENDED_DEMO_PLAYERFOG => Some(Protocol::Q2ProExtendedDemoPlayerFog),
            PROTOCOL_Q2REPRO => Some(Protocol::Q2rePro),
            _ => None,
        }
    }

    /// True for dialects only ever played back from a demo file, never
    /// negotiated live over the wire.
    pub fn is_demo_only(self) -> bool {
        matches!(
            self,
            Protocol::Q2ProExtendedDemo
                | Protocol::Q2ProExtendedV2Demo
                | Protocol::Q2ProExtendedDemoPlayerFog
        )
    }
}

/// Default priority order for protocols a client or server will accept,
/// newest/richest dialect first.
pub const DEFAULT_ACCEPTED_PROTOCOLS: &[Protocol] = &[
    Protocol::Q2rePro,
    Protocol::Q2Pro,
    Protocol::R1Q2,
    Protocol::Vanilla,
];

/// Game server variant, used to restrict which protocols a handshake
/// may accept (spec §4.7's acceptable-protocol filtering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameType {
    /// Plain/vanilla-rules game: any protocol is acceptable.
    Vanilla,
    /// Q2PRO "extended" game: only Q2PRO is acceptable.
    Q2ProExtended,
    /// Q2PRO "extended v2" game: only Q2PRO is acceptable.
    Q2ProExtendedV2,
    /// Rerelease game: only Q2rePRO is acceptable.
    Rerelease,
}

impl GameType {
    /// Restrict `protocols` to the subset this game type supports,
    /// preserving relative order (i.e. caller-supplied priority).
    pub fn filter_acceptable<'a>(self, protocols: &'a [Protocol]) -> Vec<Protocol> {
        protocols
            .iter()
            .copied()
            .filter(|p| self.accepts(*p))
            .collect()
    }

    fn accepts(self, protocol: Protocol) -> bool {
        match self {
            GameType::Vanilla => true,
            GameType::Q2ProExtended | GameType::Q2ProExtendedV2 => matches!(protocol, Protocol::Q2Pro),
            GameType::Rerelease => matches!(protocol, Protocol::Q2rePro),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netver_roundtrip() {
        for &p in &[
            Protocol::OldDemo,
            Protocol::Vanilla,
            Protocol::R1Q2,
            Protocol::Q2Pro,
            Protocol::Q2ProExtendedDemo,
            Protocol::Q2ProExtendedV2Demo,
            Protocol::Q2ProExtendedDemoPlayerFog,
            Protocol::Q2rePro,
        ] {
            assert_eq!(Protocol::from_netver(p.netver()), Some(p));
        }
    }

    #[test]
    fn unknown_netver() {
        assert_eq!(Protocol::from_netver(9999), None);
    }

    #[test]
    fn vanilla_game_accepts_everything() {
        let filtered = GameType::Vanilla.filter_acceptable(DEFAULT_ACCEPTED_PROTOCOLS);
        assert_eq!(filtered, DEFAULT_ACCEPTED_PROTOCOLS.to_vec());
    }

    #[test]
    fn rerelease_game_only_accepts_q2repro() {
        let filtered = GameType::Rerelease.filter_acceptable(DEFAULT_ACCEPTED_PROTOCOLS);
        assert_eq!(filtered, vec![Protocol::Q2rePro]);
    }

    #[test]
    fn extended_game_only_accepts_q2pro() {
        let filtered = GameType::Q2ProExtended.filter_acceptable(DEFAULT_ACCEPTED_PROTOCOLS);
        assert_eq!(filtered, vec![Protocol::Q2Pro]);
    }

    #[test]
    fn demo_only_protocols() {
        assert!(Protocol::Q2ProExtendedDemo.is_demo_only());
        assert!(!Protocol::Q2Pro.is_demo_only());
    }
}
