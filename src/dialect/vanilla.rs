// dialect/vanilla.rs -- vanilla 3.20 (protocol 34) / OLD_DEMO (26).
//
// Narrowest dialect: 16-bit solid, no extended effects, 8-bit model
// indices with optional 16-bit frame promotion, no player-state
// clientnum field. Grounded on spec §4.4's "Vanilla and OLD_DEMO"
// paragraph.

use super::Dialect;
use crate::entity_wire::EntityWireOptions;
use crate::message::ServerData;
use crate::protocol::Protocol;

pub struct Vanilla {
    pub old_demo: bool,
}

impl Vanilla {
    pub fn new() -> Self {
        Vanilla { old_demo: false }
    }

    pub fn old_demo() -> Self {
        Vanilla { old_demo: true }
    }
}

impl Default for Vanilla {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for Vanilla {
    fn protocol(&self) -> Protocol {
        if self.old_demo {
            Protocol::OldDemo
        } else {
            Protocol::Vanilla
        }
    }

    fn entity_wire_options(&self) -> EntityWireOptions {
        EntityWireOptions {
            effects64: false,
            long_solid: false,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_plain_serverdata() {
        let d = Vanilla::new();
        let sd = d.fill_serverdata(1, false, "baseq2", 0, "q2dm1");
        assert_eq!(sd.protocol, Protocol::Vanilla);
        assert!(sd.r1q2.is_none());
        assert!(sd.q2pro.is_none());
    }

    #[test]
    fn old_demo_variant_reports_old_demo_protocol() {
        let d = Vanilla::old_demo();
        assert_eq!(d.protocol(), Protocol::OldDemo);
    }

    #[test]
    fn uses_16_bit_solid() {
        let d = Vanilla::new();
        assert!(!d.entity_wire_options().long_solid);
    }
}
