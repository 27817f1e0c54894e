// handshake.rs -- out-of-band `challenge`/`connect` string parsing
// and formatting.
//
// Grounded on myq2-server/src/sv_main.rs's `svc_get_challenge`
// (reply format `"challenge {} p={}"`) and `svc_direct_connect`
// (connect-string field order, userinfo quoting/truncation), and
// original_source/inc/q2proto/q2proto_client.h's
// `q2proto_parse_challenge`.

use crate::error::{Error, Result};
use crate::protocol::{GameType, Protocol};

/// A parsed challenge reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub challenge: i32,
    /// The server's advertised protocol list, in its preference
    /// order. Empty when no `p=` clause was present (spec §4.7:
    /// absence is defined as "vanilla").
    pub protocols: Vec<i32>,
}

/// Parse a challenge reply of the form `"<int> [p=<csv>] ..."`.
pub fn parse_challenge(args: &str) -> Result<Challenge> {
    let mut tokens = args.split_whitespace();
    let challenge = tokens
        .next()
        .ok_or_else(|| Error::BadData("empty challenge reply".into()))?
        .parse::<i32>()
        .map_err(|_| Error::BadData("challenge token is not an integer".into()))?;

    let mut protocols = Vec::new();
    for tok in tokens {
        if let Some(csv) = tok.strip_prefix("p=") {
            for part in csv.split(',') {
                if let Ok(v) = part.parse::<i32>() {
                    protocols.push(v);
                }
            }
        }
    }

    Ok(Challenge {
        challenge,
        protocols,
    })
}

/// Format a challenge reply, advertising `accepted` in preference
/// order.
pub fn format_challenge(challenge: i32, accepted: &[Protocol]) -> String {
    if accepted.is_empty() {
        return challenge.to_string();
    }
    let csv = accepted
        .iter()
        .map(|p| p.netver().to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("challenge {challenge} p={csv}")
}

/// Pick the best (first, in `accepted`'s preference order) protocol
/// common to both the challenge's advertised list and the caller's
/// accepted list. An empty advertised list is treated as "the server
/// only speaks vanilla".
pub fn select_protocol(challenge: &Challenge, accepted: &[Protocol], game_type: GameType) -> Result<Protocol> {
    let filtered = game_type.filter_acceptable(accepted);

    if challenge.protocols.is_empty() {
        return filtered
            .iter()
            .copied()
            .find(|p| *p == Protocol::Vanilla)
            .ok_or(Error::NoAcceptableProtocol);
    }

    filtered
        .into_iter()
        .find(|p| challenge.protocols.contains(&p.netver()))
        .ok_or(Error::NoAcceptableProtocol)
}

/// R1Q2/Q2PRO-specific extra fields appended to a connect string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectExtra {
    pub max_packet_length: Option<u16>,
    /// Q2PRO netchan type; 1 = NEW (the default).
    pub netchan_type: Option<u8>,
    pub deflate: Option<bool>,
    pub minor: Option<u16>,
}

/// A parsed connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    pub protocol: i32,
    pub qport: i32,
    pub challenge: i32,
    pub userinfo: String,
    pub extra: ConnectExtra,
}

/// Parse a connect request of the form
/// `<protocol> <qport> <challenge> "<userinfo>" [<maxpacketlength>
/// [<trailer>]]`, where `<trailer>` is protocol-specific: R1Q2 appends
/// a single minor version (`has_zlib` is implicitly true for R1Q2, per
/// spec §4.7); Q2PRO appends `<nctype> <has_zlib> <minor>`. Minor
/// versions are clamped to each dialect's `[MINOR_MIN, MINOR_CURRENT]`
/// range; Q2PRO additionally skips its reserved minor (spec §4.7).
pub fn parse_connect(args: &str) -> Result<Connect> {
    let mut rest = args.trim();

    let (protocol, r) = take_int(rest)?;
    rest = r;
    let (qport, r) = take_int(rest)?;
    rest = r;
    let (challenge, r) = take_int(rest)?;
    rest = r;
    let (userinfo, r) = take_quoted(rest)?;
    rest = r.trim();

    let mut extra = ConnectExtra::default();
    if !rest.is_empty() {
        let (max_len, r) = take_int(rest)?;
        extra.max_packet_length = Some(max_len as u16);
        rest = r.trim();

        if !rest.is_empty() {
            match Protocol::from_netver(protocol) {
                Some(Protocol::R1Q2) => {
                    let (minor, r) = take_int(rest)?;
                    extra.deflate = Some(true);
                    extra.minor = Some(clamp_minor_r1q2(minor as u16));
                    rest = r;
                }
                _ => {
                    let (nctype, r) = take_int(rest)?;
                    let (has_zlib, r) = take_int(r.trim())?;
                    let (minor, r) = take_int(r.trim())?;
                    extra.netchan_type = Some(nctype as u8);
                    extra.deflate = Some(has_zlib != 0);
                    extra.minor = Some(clamp_minor_q2pro(minor as u16));
                    rest = r;
                }
            }
        }
    }
    let _ = rest;

    Ok(Connect {
        protocol,
        qport,
        challenge,
        userinfo,
        extra,
    })
}

fn clamp_minor_r1q2(minor: u16) -> u16 {
    minor.clamp(crate::dialect::r1q2::MINOR_MIN, crate::dialect::r1q2::MINOR_CURRENT)
}

fn clamp_minor_q2pro(minor: u16) -> u16 {
    let clamped = minor.clamp(crate::dialect::q2pro::MINOR_MIN, crate::dialect::q2pro::MINOR_CURRENT);
    if clamped == crate::dialect::q2pro::MINOR_RESERVED {
        clamped - 1
    } else {
        clamped
    }
}

/// Format a connect request. `extra` fields are only emitted for
/// dialects that define them (caller decides which fields to
/// populate); R1Q2 (no `netchan_type`) emits a bare minor, Q2PRO emits
/// the full `<nctype> <has_zlib> <minor>` triple.
pub fn format_connect(protocol: i32, qport: i32, challenge: i32, userinfo: &str, extra: &ConnectExtra) -> String {
    let mut out = format!("{protocol} {qport} {challenge} \"{userinfo}\"");
    if let Some(max_len) = extra.max_packet_length {
        out.push_str(&format!(" {max_len}"));
        if let (Some(nctype), Some(deflate), Some(minor)) = (extra.netchan_type, extra.deflate, extra.minor) {
            out.push_str(&format!(" {nctype} {} {minor}", deflate as u8));
        } else if let Some(minor) = extra.minor {
            out.push_str(&format!(" {minor}"));
        }
    }
    out
}

fn take_int(s: &str) -> Result<(i32, &str)> {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    let (tok, rest) = s.split_at(end);
    let v = tok
        .parse::<i32>()
        .map_err(|_| Error::BadData(format!("expected integer, got {tok:?}")))?;
    Ok((v, rest))
}

fn take_quoted(s: &str) -> Result<(String, &str)> {
    let s = s.trim_start();
    if !s.starts_with('"') {
        return Err(Error::BadData("expected quoted userinfo".into()));
    }
    let rest = &s[1..];
    let end = rest
        .find('"')
        .ok_or_else(|| Error::BadData("unterminated userinfo string".into()))?;
    Ok((rest[..end].to_owned(), &rest[end + 1..]))
}
