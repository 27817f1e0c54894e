// dialect/q2repro.rs -- Q2rePRO (protocol 1027).
//
// Grounded on spec §4.4's "Q2rePRO" paragraph: rerelease-game
// superset of Q2PRO's extended mode, adding 16-bit viewoffset/
// gunoffset/gunangles encodings, damage_blend, and rerelease
// player-state extras (viewheight, gunskin, fog). Entity/solid wire
// shape matches Q2PRO's extended-game form.

use super::Dialect;
use crate::entity_wire::EntityWireOptions;
use crate::message::ServerData;
use crate::player_wire::PlayerWireOptions;
use crate::protocol::Protocol;

pub struct Q2rePro {
    pub damage_blend: bool,
}

impl Q2rePro {
    pub fn new() -> Self {
        Q2rePro { damage_blend: true }
    }
}

impl Default for Q2rePro {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for Q2rePro {
    fn protocol(&self) -> Protocol {
        Protocol::Q2rePro
    }

    fn entity_wire_options(&self) -> EntityWireOptions {
        EntityWireOptions {
            effects64: true,
            long_solid: true,
            i23_coords: false,
        }
    }

    fn fill_serverdata(
        &self,
        server_count: i32,
        attract_loop: bool,
        game_dir: &str,
        client_num: i16,
        level_name: &str,
    ) -> ServerData {
        ServerData {
            protocol: self.protocol(),
            server_count,
            attract_loop,
            game_dir: game_dir.to_owned(),
            client_num,
            level_name: level_name.to_owned(),
            r1q2: None,
            q2pro: None,
        }
    }

    fn supports_deflate(&self) -> bool {
        true
    }

    fn player_wire_options(&self) -> PlayerWireOptions {
        PlayerWireOptions {
            small16: true,
            damage_blend: self.damage_blend,
            clientnum_in_playerstate: true,
            rerelease_extras: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_64_bit_effects_and_long_solid() {
        let d = Q2rePro::new();
        let opts = d.entity_wire_options();
        assert!(opts.effects64);
        assert!(opts.long_solid);
    }

    #[test]
    fn reports_q2repro_protocol() {
        assert_eq!(Q2rePro::new().protocol(), Protocol::Q2rePro);
    }

    #[test]
    fn player_wire_options_enable_small16_and_rerelease_extras() {
        let d = Q2rePro::new();
        let opts = d.player_wire_options();
        assert!(opts.small16);
        assert!(opts.rerelease_extras);
        assert!(opts.clientnum_in_playerstate);
        assert!(opts.damage_blend);
    }
}
