// server.rs -- server-side connection context.
//
// Grounded on original_source/inc/q2proto/q2proto_server.h's
// `q2proto_server_info`/`q2proto_svc_write_*` surface and
// myq2-server/src/sv_main.rs's `svc_get_challenge`/`svc_direct_connect`
// (challenge issuance, protocol negotiation from a connect string,
// feature flags derived from the negotiated minor).

use crate::dialect::q2pro::Q2Pro;
use crate::dialect::q2repro::Q2rePro;
use crate::dialect::r1q2::R1Q2;
use crate::dialect::vanilla::Vanilla;
use crate::dialect::Dialect;
use crate::download::{CompressMode, DownloadState};
use crate::entity::EntityStateDelta;
use crate::error::Result;
use crate::gamestate::GamestateCursor;
use crate::handshake::{parse_connect, Connect};
use crate::io::IoWrite;
use crate::message::{Frame, ServerData, ServerMessage};
use crate::message_wire::{write_common_server_message, write_frame as wire_write_frame};
use crate::protocol::{GameType, Protocol};

/// Feature flags a server-side context derives from the negotiated
/// dialect/minor, read by the packet writer to decide how to encode
/// entities/downloads (spec §4.4/§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerFeatures {
    pub long_solid: bool,
    pub effects64: bool,
    pub clientnum_short: bool,
    pub deflate: bool,
}

/// Server-side context for one connected client.
pub struct ServerContext {
    dialect: Box<dyn Dialect>,
    pub features: ServerFeatures,
    pub gamestate_cursor: GamestateCursor,
    pub download: Option<DownloadState>,
}

impl ServerContext {
    /// Negotiate a dialect from a parsed `connect` request, restricted
    /// to protocols `game_type` permits.
    pub fn from_connect(connect: &Connect, game_type: GameType) -> Result<Self> {
        let protocol = Protocol::from_netver(connect.protocol)
            .filter(|p| game_type.filter_acceptable(&[*p]).contains(p))
            .ok_or(crate::error::Error::NoAcceptableProtocol)?;

        let dialect: Box<dyn Dialect> = match protocol {
            Protocol::OldDemo => Box::new(Vanilla::old_demo()),
            Protocol::Vanilla => Box::new(Vanilla::new()),
            Protocol::R1Q2 => Box::new(R1Q2::new(connect.extra.minor.unwrap_or(crate::dialect::r1q2::MINOR_CURRENT))),
            Protocol::Q2Pro
            | Protocol::Q2ProExtendedDemo
            | Protocol::Q2ProExtendedV2Demo
            | Protocol::Q2ProExtendedDemoPlayerFog => Box::new(Q2Pro::new(
                connect.extra.minor.unwrap_or(crate::dialect::q2pro::MINOR_CURRENT),
            )),
            Protocol::Q2rePro => Box::new(Q2rePro::new()),
        };

        let opts = dialect.entity_wire_options();
        let features = ServerFeatures {
            long_solid: opts.long_solid,
            effects64: opts.effects64,
            clientnum_short: dialect.clientnum_short(),
            deflate: dialect.supports_deflate() && connect.extra.deflate.unwrap_or(false),
        };

        Ok(ServerContext {
            dialect,
            features,
            gamestate_cursor: GamestateCursor::new(),
            download: None,
        })
    }

    /// Convenience entry point taking the raw connect-string body
    /// (`args` of the out-of-band `connect` command).
    pub fn from_connect_string(args: &str, game_type: GameType) -> Result<Self> {
        let connect = parse_connect(args)?;
        Self::from_connect(&connect, game_type)
    }

    pub fn protocol(&self) -> Protocol {
        self.dialect.protocol()
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn write_serverdata(
        &self,
        w: &mut dyn IoWrite,
        server_count: i32,
        attract_loop: bool,
        game_dir: &str,
        client_num: i16,
        level_name: &str,
    ) -> Result<()> {
        let sd: ServerData = self
            .dialect
            .fill_serverdata(server_count, attract_loop, game_dir, client_num, level_name);
        write_common_server_message(w, &ServerMessage::ServerData(sd)).map(|_| ())
    }

    /// Begin streaming a download to this client; `mode` is the
    /// policy requested by the caller, narrowed by this dialect's
    /// actual deflate support.
    pub fn begin_download(&mut self, data: Vec<u8>, mode: CompressMode) {
        self.download = Some(DownloadState::new(data, mode, self.features.deflate));
    }

    /// Write one `svc_frame`: header, player-state delta, clientnum at
    /// this dialect's negotiated width, then the entity-delta
    /// sub-stream (spec §4.8).
    pub fn write_frame(&self, w: &mut dyn IoWrite, frame: &Frame, entities: &[EntityStateDelta]) -> Result<()> {
        wire_write_frame(
            w,
            frame,
            entities,
            self.features.clientnum_short,
            self.dialect.entity_wire_options(),
            self.dialect.player_wire_options(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ByteBuf;

    fn sample_connect(protocol: i32) -> String {
        format!(r#"{protocol} 12 555 "\name\Player""#)
    }

    #[test]
    fn negotiates_vanilla_from_connect_string() {
        let ctx = ServerContext::from_connect_string(&sample_connect(34), GameType::Vanilla).unwrap();
        assert_eq!(ctx.protocol(), Protocol::Vanilla);
        assert!(!ctx.features.long_solid);
    }

    #[test]
    fn negotiates_q2pro_with_extended_limits() {
        let args = r#"36 12 555 "\name\Player" 1390 1 1 1024"#;
        let ctx = ServerContext::from_connect_string(args, GameType::Vanilla).unwrap();
        assert_eq!(ctx.protocol(), Protocol::Q2Pro);
        assert!(ctx.features.long_solid);
    }

    #[test]
    fn rejects_protocol_not_allowed_by_game_type() {
        let err = ServerContext::from_connect_string(&sample_connect(34), GameType::Rerelease).unwrap_err();
        assert_eq!(err, crate::error::Error::NoAcceptableProtocol);
    }

    #[test]
    fn write_serverdata_emits_a_message() {
        let ctx = ServerContext::from_connect_string(&sample_connect(34), GameType::Vanilla).unwrap();
        let mut buf = ByteBuf::new();
        ctx.write_serverdata(&mut buf, 1, false, "baseq2", 0, "q2dm1").unwrap();
        assert!(!buf.bytes().is_empty());
    }

    #[test]
    fn begin_download_creates_active_state() {
        let mut ctx = ServerContext::from_connect_string(&sample_connect(34), GameType::Vanilla).unwrap();
        ctx.begin_download(vec![1, 2, 3], CompressMode::Never);
        assert!(ctx.download.is_some());
    }

    #[test]
    fn write_frame_emits_header_and_sentinel() {
        let ctx = ServerContext::from_connect_string(&sample_connect(34), GameType::Vanilla).unwrap();
        let frame = Frame {
            server_frame: 1,
            delta_frame: -1,
            suppress_count: 0,
            player_state: crate::playerstate::make_delta(
                &crate::playerstate::PackedPlayerState::default(),
                &crate::playerstate::PackedPlayerState::default(),
            ),
            clientnum: 0,
        };
        let mut buf = ByteBuf::new();
        ctx.write_frame(&mut buf, &frame, &[]).unwrap();
        assert!(!buf.bytes().is_empty());
    }
}
